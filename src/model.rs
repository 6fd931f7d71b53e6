use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REQUIRED_COLUMNS: [&str; 12] = [
    "order_id",
    "customer_id",
    "order_date",
    "product_id",
    "category",
    "sub_category",
    "region",
    "segment",
    "sales",
    "discount",
    "profit",
    "quantity",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: NaiveDate,
    pub product_id: String,
    pub category: String,
    pub sub_category: String,
    pub region: String,
    pub segment: String,
    pub sales: f64,
    pub discount: f64,
    pub profit: f64,
    pub quantity: i64,
}

/// Validated, immutable ledger handed to every analytical stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    transactions: Vec<Transaction>,
}

impl Dataset {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Dataset { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn total_sales(&self) -> f64 {
        self.transactions.iter().map(|t| t.sales).sum()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.transactions.iter().map(|t| t.order_date).min()?;
        let last = self.transactions.iter().map(|t| t.order_date).max()?;
        Some((first, last))
    }

    /// Transactions with `start <= order_date <= end`, original order kept.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Dataset {
        Dataset::new(
            self.transactions
                .iter()
                .filter(|t| t.order_date >= start && t.order_date <= end)
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<Transaction> for Dataset {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

// Untyped row as delivered by the data-access side. Every field is text so
// that nulls and unparseable values survive until validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub order_date: Option<String>,
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub region: Option<String>,
    pub segment: Option<String>,
    pub sales: Option<String>,
    pub discount: Option<String>,
    pub profit: Option<String>,
    pub quantity: Option<String>,
}

impl RawRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        let field = match column {
            "order_id" => &self.order_id,
            "customer_id" => &self.customer_id,
            "order_date" => &self.order_date,
            "product_id" => &self.product_id,
            "category" => &self.category,
            "sub_category" => &self.sub_category,
            "region" => &self.region,
            "segment" => &self.segment,
            "sales" => &self.sales,
            "discount" => &self.discount,
            "profit" => &self.profit,
            "quantity" => &self.quantity,
            _ => return None,
        };
        field.as_deref()
    }

    pub fn set(&mut self, column: &str, value: Option<String>) {
        let field = match column {
            "order_id" => &mut self.order_id,
            "customer_id" => &mut self.customer_id,
            "order_date" => &mut self.order_date,
            "product_id" => &mut self.product_id,
            "category" => &mut self.category,
            "sub_category" => &mut self.sub_category,
            "region" => &mut self.region,
            "segment" => &mut self.segment,
            "sales" => &mut self.sales,
            "discount" => &mut self.discount,
            "profit" => &mut self.profit,
            "quantity" => &mut self.quantity,
            _ => return,
        };
        *field = value;
    }
}

impl From<&Transaction> for RawRecord {
    fn from(t: &Transaction) -> Self {
        RawRecord {
            order_id: Some(t.order_id.clone()),
            customer_id: Some(t.customer_id.clone()),
            order_date: Some(t.order_date.format("%Y-%m-%d").to_string()),
            product_id: Some(t.product_id.clone()),
            category: Some(t.category.clone()),
            sub_category: Some(t.sub_category.clone()),
            region: Some(t.region.clone()),
            segment: Some(t.segment.clone()),
            sales: Some(t.sales.to_string()),
            discount: Some(t.discount.to_string()),
            profit: Some(t.profit.to_string()),
            quantity: Some(t.quantity.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        RawTable { columns, rows }
    }

    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        RawTable {
            columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: transactions.iter().map(RawRecord::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Advisory,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Completeness,
    Format,
    Range,
    Uniqueness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Unparseable,
    OutOfRange,
    DuplicateKey,
}

impl IssueKind {
    pub fn category(self) -> CheckCategory {
        match self {
            IssueKind::Missing => CheckCategory::Completeness,
            IssueKind::Unparseable => CheckCategory::Format,
            IssueKind::OutOfRange => CheckCategory::Range,
            IssueKind::DuplicateKey => CheckCategory::Uniqueness,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            IssueKind::Missing | IssueKind::Unparseable => Severity::Critical,
            IssueKind::OutOfRange | IssueKind::DuplicateKey => Severity::Advisory,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub row: usize,
    pub column: String,
    pub kind: IssueKind,
    pub severity: Severity,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullCount {
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub category: CheckCategory,
    pub issues: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_records: usize,
    pub nulls: BTreeMap<String, NullCount>,
    pub duplicate_rows: usize,
    pub duplicate_keys: usize,
    pub out_of_range: usize,
    pub unparseable: usize,
    pub critical_rows: Vec<usize>,
    pub checks: Vec<CheckResult>,
    pub issues: Vec<Issue>,
    pub critical: bool,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn check(&self, category: CheckCategory) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.category == category)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfmSegment {
    Champions,
    Loyal,
    PotentialLoyalist,
    NewCustomers,
    AtRisk,
    CannotLoseThem,
    Hibernating,
    Lost,
    Others,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: f64,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub rfm_code: String,
    pub segment: RfmSegment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitabilityRecord {
    pub key: Vec<String>,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin_pct: f64,
    pub quantity: i64,
    pub order_count: usize,
    pub avg_discount: f64,
    pub loss_making: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub revenue: f64,
    pub profit: f64,
    pub units: i64,
    pub orders: usize,
    pub margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub id: String,
    pub value: f64,
    pub rank: usize,
    pub metrics: EntityMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalMetric {
    pub region: String,
    pub revenue: f64,
    pub profit: f64,
    pub margin_pct: f64,
    pub revenue_share: f64,
    pub growth_pct: Option<f64>,
    pub relative_performance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub period_start: NaiveDate,
    pub revenue: f64,
    pub profit: f64,
    pub order_count: usize,
    pub distinct_customers: usize,
    pub delta_pct: Option<f64>,
}

/// `profit / revenue`, zero when there is no revenue.
pub fn margin(profit: f64, revenue: f64) -> f64 {
    if revenue == 0.0 {
        0.0
    } else {
        profit / revenue
    }
}
