#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Schema error: missing required columns {missing:?}")]
    Schema { missing: Vec<String> },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Blocked: {0} rows failed critical validation")]
    Blocked(usize),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
