use chrono::NaiveDate;
use clap::Parser;
use sales_analytics::{
    loader, report, validator, AnalysisParams, Baseline, Dimension, Direction, EntityKind,
    Granularity, Metric, Result,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Analyse a sales ledger stored in SQLite and print the report as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database
    db: String,

    /// Ledger table name
    #[arg(short, long, default_value = "orders")]
    table: String,

    /// Table holding the prior period, for regional growth
    #[arg(long)]
    prior_table: Option<String>,

    /// JSON file with analysis parameters; flags below override it
    #[arg(short, long)]
    params: Option<String>,

    /// Recency reference date (YYYY-MM-DD)
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// Profitability dimensions, e.g. category,sub_category
    #[arg(long, value_delimiter = ',')]
    group_by: Option<Vec<Dimension>>,

    #[arg(long)]
    entity: Option<EntityKind>,

    #[arg(long)]
    metric: Option<Metric>,

    #[arg(long)]
    direction: Option<Direction>,

    /// Keep only the first N ranked entities
    #[arg(long)]
    top: Option<usize>,

    /// day, week, month, quarter or year
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// max, mean or region:<name>
    #[arg(long)]
    baseline: Option<Baseline>,

    #[arg(long)]
    moving_average: Option<usize>,

    /// Fail when validation finds critical rows
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn params(&self) -> Result<AnalysisParams> {
        let mut params = match &self.params {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => AnalysisParams::default(),
        };

        if self.reference_date.is_some() {
            params.reference_date = self.reference_date;
        }
        if let Some(dims) = &self.group_by {
            params.group_by = dims.clone();
        }
        if let Some(entity) = self.entity {
            params.rank_entity = entity;
        }
        if let Some(metric) = self.metric {
            params.rank_metric = metric;
        }
        if let Some(direction) = self.direction {
            params.rank_direction = direction;
        }
        if self.top.is_some() {
            params.top_n = self.top;
        }
        if let Some(granularity) = self.granularity {
            params.granularity = granularity;
        }
        if let Some(baseline) = &self.baseline {
            params.baseline = baseline.clone();
        }
        if self.moving_average.is_some() {
            params.moving_average_window = self.moving_average;
        }
        params.strict |= self.strict;
        Ok(params)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let params = args.params()?;

    let table = loader::load_table(&args.db, &args.table)?;
    info!(rows = table.rows.len(), table = %args.table, "ledger loaded");

    let prior = match &args.prior_table {
        Some(name) => {
            let (dataset, quality) = validator::prepare(&loader::load_table(&args.db, name)?)?;
            info!(rows = dataset.len(), critical = quality.critical, "prior period loaded");
            Some(dataset)
        }
        None => None,
    };

    let report = report::analyze(&table, prior.as_ref(), &params)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
