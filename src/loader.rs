use crate::error::{AnalyticsError, Result};
use crate::model::{RawRecord, RawTable};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::debug;

/// `Order ID` -> `order_id`, `Sub-Category` -> `sub_category`.
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn check_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidArgument(format!(
            "invalid table name: {}",
            name
        )))
    }
}

fn as_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Read a whole ledger table as text, NULLs preserved, for validation.
pub fn load_table(db_path: &str, table: &str) -> Result<RawTable> {
    check_identifier(table)?;
    let conn = Connection::open(db_path)?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(normalize_column)
        .collect();

    let rows = stmt.query_map([], |row| {
        let mut record = RawRecord::default();
        for (i, column) in columns.iter().enumerate() {
            record.set(column, as_text(row.get_ref(i)?));
        }
        Ok(record)
    })?;
    let rows = rows.collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(db_path, table, rows = rows.len(), "loaded ledger table");
    Ok(RawTable::new(columns, rows))
}
