use crate::error::AnalyticsError;
use crate::model::{Dataset, EntityMetrics, RankedEntity};
use crate::profitability::{self, Dimension};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    Customer,
    Category,
    SubCategory,
    Region,
    Segment,
}

impl EntityKind {
    fn dimension(self) -> Dimension {
        match self {
            EntityKind::Product => Dimension::ProductId,
            EntityKind::Customer => Dimension::CustomerId,
            EntityKind::Category => Dimension::Category,
            EntityKind::SubCategory => Dimension::SubCategory,
            EntityKind::Region => Dimension::Region,
            EntityKind::Segment => Dimension::Segment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Profit,
    Units,
    Orders,
    Margin,
}

impl Metric {
    pub fn of(self, m: &EntityMetrics) -> f64 {
        match self {
            Metric::Revenue => m.revenue,
            Metric::Profit => m.profit,
            Metric::Units => m.units as f64,
            Metric::Orders => m.orders as f64,
            Metric::Margin => m.margin_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Highest first.
    Descending,
    /// Lowest first, for spotting loss leaders.
    Ascending,
}

fn invalid(kind: &str, value: &str) -> AnalyticsError {
    AnalyticsError::InvalidArgument(format!("unknown {}: {}", kind, value))
}

impl FromStr for EntityKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "product" | "product_id" => Ok(EntityKind::Product),
            "customer" | "customer_id" => Ok(EntityKind::Customer),
            "category" => Ok(EntityKind::Category),
            "sub_category" | "subcategory" => Ok(EntityKind::SubCategory),
            "region" => Ok(EntityKind::Region),
            "segment" => Ok(EntityKind::Segment),
            other => Err(invalid("entity", other)),
        }
    }
}

impl FromStr for Metric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "revenue" | "sales" => Ok(Metric::Revenue),
            "profit" => Ok(Metric::Profit),
            "units" | "quantity" => Ok(Metric::Units),
            "orders" => Ok(Metric::Orders),
            "margin" | "margin_pct" => Ok(Metric::Margin),
            other => Err(invalid("metric", other)),
        }
    }
}

impl FromStr for Direction {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desc" | "descending" => Ok(Direction::Descending),
            "asc" | "ascending" => Ok(Direction::Ascending),
            other => Err(invalid("direction", other)),
        }
    }
}

/// Per-entity metric bundles, ordered by entity id.
pub fn entity_metrics(dataset: &Dataset, kind: EntityKind) -> Vec<(String, EntityMetrics)> {
    profitability::aggregate(dataset, &[kind.dimension()])
        .into_iter()
        .filter_map(|r| {
            let id = r.key.into_iter().next()?;
            Some((
                id,
                EntityMetrics {
                    revenue: r.revenue,
                    profit: r.profit,
                    units: r.quantity,
                    orders: r.order_count,
                    margin_pct: r.margin_pct,
                },
            ))
        })
        .collect()
}

/// Dense ranking: equal values share a rank and the next distinct value
/// gets the following integer. Ties are listed by id ascending.
pub fn rank(
    entities: &[(String, EntityMetrics)],
    metric: Metric,
    direction: Direction,
) -> Vec<RankedEntity> {
    debug!(entities = entities.len(), ?metric, ?direction, "ranking");

    let mut ordered: Vec<(&String, &EntityMetrics, f64)> = entities
        .iter()
        .map(|(id, m)| (id, m, metric.of(m)))
        .collect();

    ordered.sort_by(|a, b| {
        let by_value = match direction {
            Direction::Descending => b.2.total_cmp(&a.2),
            Direction::Ascending => a.2.total_cmp(&b.2),
        };
        match by_value {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        }
    });

    let mut out: Vec<RankedEntity> = Vec::with_capacity(ordered.len());
    let mut current = 0;
    let mut prev: Option<f64> = None;

    for (id, metrics, value) in ordered {
        if prev != Some(value) {
            current += 1;
            prev = Some(value);
        }
        out.push(RankedEntity {
            id: id.clone(),
            value,
            rank: current,
            metrics: metrics.clone(),
        });
    }
    out
}

pub fn top_n(mut ranked: Vec<RankedEntity>, n: usize) -> Vec<RankedEntity> {
    ranked.truncate(n);
    ranked
}
