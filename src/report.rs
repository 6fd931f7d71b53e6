use crate::error::{AnalyticsError, Result};
use crate::model::{
    CustomerProfile, Dataset, ProfitabilityRecord, QualityReport, RankedEntity, RawTable,
    RegionalMetric, TrendPoint,
};
use crate::profitability::{self, Dimension};
use crate::ranking::{self, Direction, EntityKind, Metric};
use crate::regional::{self, Baseline};
use crate::segmentation::{self, SegmentSummary, QUINTILES};
use crate::stats::{self, Summary};
use crate::trends::{self, Granularity};
use crate::validator;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Recency anchor; defaults to the day after the latest order.
    pub reference_date: Option<NaiveDate>,
    pub group_by: Vec<Dimension>,
    pub rank_entity: EntityKind,
    pub rank_metric: Metric,
    pub rank_direction: Direction,
    pub top_n: Option<usize>,
    pub granularity: Granularity,
    pub baseline: Baseline,
    pub moving_average_window: Option<usize>,
    /// Refuse to analyse when validation found critical rows.
    pub strict: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            reference_date: None,
            group_by: vec![Dimension::Category, Dimension::SubCategory],
            rank_entity: EntityKind::Product,
            rank_metric: Metric::Revenue,
            rank_direction: Direction::Descending,
            top_n: None,
            granularity: Granularity::Month,
            baseline: Baseline::TopProfit,
            moving_average_window: None,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AnalysisWarning {
    EmptyDataset,
    FewCustomers { customers: usize },
    ZeroRevenueGroup { key: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub transactions: usize,
    pub first_order: Option<NaiveDate>,
    pub last_order: Option<NaiveDate>,
    pub sales: Summary,
    pub profit: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub quality: QualityReport,
    pub params: AnalysisParams,
    pub reference_date: Option<NaiveDate>,
    pub summary: LedgerSummary,
    pub customers: Vec<CustomerProfile>,
    pub segments: Vec<SegmentSummary>,
    pub profitability: Vec<ProfitabilityRecord>,
    pub rankings: Vec<RankedEntity>,
    pub regions: Vec<RegionalMetric>,
    pub trends: Vec<TrendPoint>,
    pub moving_average: Option<Vec<Option<f64>>>,
    pub warnings: Vec<AnalysisWarning>,
}

fn summarize(dataset: &Dataset) -> LedgerSummary {
    let sales: Vec<f64> = dataset.iter().map(|t| t.sales).collect();
    let profit: Vec<f64> = dataset.iter().map(|t| t.profit).collect();
    let range = dataset.date_range();
    LedgerSummary {
        transactions: dataset.len(),
        first_order: range.map(|r| r.0),
        last_order: range.map(|r| r.1),
        sales: stats::describe(&sales),
        profit: stats::describe(&profit),
    }
}

fn collect_warnings(
    dataset: &Dataset,
    customers: &[CustomerProfile],
    profitability: &[ProfitabilityRecord],
) -> Vec<AnalysisWarning> {
    let mut warnings = Vec::new();
    if dataset.is_empty() {
        warnings.push(AnalysisWarning::EmptyDataset);
    }
    if !customers.is_empty() && customers.len() < QUINTILES {
        warnings.push(AnalysisWarning::FewCustomers {
            customers: customers.len(),
        });
    }
    for r in profitability.iter().filter(|r| r.revenue == 0.0) {
        warnings.push(AnalysisWarning::ZeroRevenueGroup { key: r.key.clone() });
    }
    warnings
}

/// Run every analytical stage over an already validated dataset. The stages
/// share the dataset read-only and execute on the rayon pool.
pub fn run(
    dataset: &Dataset,
    quality: QualityReport,
    prior: Option<&Dataset>,
    params: &AnalysisParams,
) -> Result<AnalyticsReport> {
    let reference_date = params
        .reference_date
        .or_else(|| segmentation::default_reference_date(dataset));

    let ((customers, profitability), ((rankings, regions), trends)) = rayon::join(
        || {
            rayon::join(
                || match reference_date {
                    Some(date) => segmentation::score(dataset, date),
                    None => Vec::new(),
                },
                || profitability::aggregate(dataset, &params.group_by),
            )
        },
        || {
            rayon::join(
                || {
                    rayon::join(
                        || {
                            let entities = ranking::entity_metrics(dataset, params.rank_entity);
                            let ranked = ranking::rank(
                                &entities,
                                params.rank_metric,
                                params.rank_direction,
                            );
                            match params.top_n {
                                Some(n) => ranking::top_n(ranked, n),
                                None => ranked,
                            }
                        },
                        || regional::compare(dataset, prior, &params.baseline),
                    )
                },
                || trends::bucket(dataset, params.granularity),
            )
        },
    );

    let moving_average = params
        .moving_average_window
        .map(|w| trends::moving_average(&trends, w))
        .transpose()?;

    let warnings = collect_warnings(dataset, &customers, &profitability);
    for w in &warnings {
        warn!(warning = ?w, "degenerate input");
    }

    info!(
        customers = customers.len(),
        groups = profitability.len(),
        ranked = rankings.len(),
        regions = regions.len(),
        periods = trends.len(),
        "analysis complete"
    );

    Ok(AnalyticsReport {
        quality,
        params: params.clone(),
        reference_date,
        summary: summarize(dataset),
        segments: segmentation::segment_summary(&customers),
        customers,
        profitability,
        rankings,
        regions,
        trends,
        moving_average,
        warnings,
    })
}

/// Validate a raw table and, unless gated by `strict`, analyse the rows that
/// passed critical checks.
pub fn analyze(
    table: &RawTable,
    prior: Option<&Dataset>,
    params: &AnalysisParams,
) -> Result<AnalyticsReport> {
    let (dataset, quality) = validator::prepare(table)?;
    if params.strict && quality.critical {
        return Err(AnalyticsError::Blocked(quality.critical_rows.len()));
    }
    run(&dataset, quality, prior, params)
}
