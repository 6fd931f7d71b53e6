//! Sales ledger analytics: validation, RFM segmentation, profitability,
//! ranking, regional comparison and trends.

pub mod error;
pub mod loader;
pub mod model;
pub mod profitability;
pub mod ranking;
pub mod regional;
pub mod report;
pub mod segmentation;
pub mod stats;
pub mod trends;
pub mod validator;

pub use error::{AnalyticsError, Result};
pub use model::{
    CustomerProfile, Dataset, ProfitabilityRecord, QualityReport, RankedEntity, RawRecord,
    RawTable, RegionalMetric, Transaction, TrendPoint,
};
pub use profitability::Dimension;
pub use ranking::{Direction, EntityKind, Metric};
pub use regional::Baseline;
pub use report::{AnalysisParams, AnalyticsReport};
pub use trends::Granularity;
