use crate::error::AnalyticsError;
use crate::model::{margin, Dataset, ProfitabilityRecord, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    SubCategory,
    Region,
    Segment,
    ProductId,
    CustomerId,
    DiscountBand,
}

// Upper bounds are exclusive except for the last band.
const DISCOUNT_BANDS: [(f64, f64, &str); 5] = [
    (0.0, 0.1, "0.00-0.10"),
    (0.1, 0.2, "0.10-0.20"),
    (0.2, 0.3, "0.20-0.30"),
    (0.3, 0.5, "0.30-0.50"),
    (0.5, 1.0, "0.50-1.00"),
];

pub fn discount_band(discount: f64) -> &'static str {
    for (lo, hi, label) in DISCOUNT_BANDS {
        if discount >= lo && discount < hi {
            return label;
        }
    }
    if discount < 0.0 {
        DISCOUNT_BANDS[0].2
    } else {
        DISCOUNT_BANDS[DISCOUNT_BANDS.len() - 1].2
    }
}

impl Dimension {
    pub fn value<'a>(self, t: &'a Transaction) -> &'a str {
        match self {
            Dimension::Category => &t.category,
            Dimension::SubCategory => &t.sub_category,
            Dimension::Region => &t.region,
            Dimension::Segment => &t.segment,
            Dimension::ProductId => &t.product_id,
            Dimension::CustomerId => &t.customer_id,
            Dimension::DiscountBand => discount_band(t.discount),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::SubCategory => "sub_category",
            Dimension::Region => "region",
            Dimension::Segment => "segment",
            Dimension::ProductId => "product_id",
            Dimension::CustomerId => "customer_id",
            Dimension::DiscountBand => "discount_band",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "category" => Ok(Dimension::Category),
            "sub_category" | "subcategory" => Ok(Dimension::SubCategory),
            "region" => Ok(Dimension::Region),
            "segment" => Ok(Dimension::Segment),
            "product_id" | "product" => Ok(Dimension::ProductId),
            "customer_id" | "customer" => Ok(Dimension::CustomerId),
            "discount_band" | "discount" => Ok(Dimension::DiscountBand),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "unknown dimension: {}",
                other
            ))),
        }
    }
}

#[derive(Default)]
struct GroupAcc<'a> {
    revenue: f64,
    profit: f64,
    quantity: i64,
    discount_sum: f64,
    lines: usize,
    orders: BTreeSet<&'a str>,
}

/// One record per combination of `group_by` values present in the data,
/// ordered by those values ascending. Repeated dimensions are ignored.
pub fn aggregate(dataset: &Dataset, group_by: &[Dimension]) -> Vec<ProfitabilityRecord> {
    let mut dims: Vec<Dimension> = Vec::with_capacity(group_by.len());
    for d in group_by {
        if !dims.contains(d) {
            dims.push(*d);
        }
    }
    debug!(rows = dataset.len(), group_by = ?dims, "aggregating profitability");

    let mut groups: BTreeMap<Vec<&str>, GroupAcc> = BTreeMap::new();
    for t in dataset.iter() {
        let key: Vec<&str> = dims.iter().map(|d| d.value(t)).collect();
        let acc = groups.entry(key).or_default();
        acc.revenue += t.sales;
        acc.profit += t.profit;
        acc.quantity += t.quantity;
        acc.discount_sum += t.discount;
        acc.lines += 1;
        acc.orders.insert(t.order_id.as_str());
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            if acc.revenue == 0.0 {
                warn!(key = ?key, "group has zero revenue, margin set to 0");
            }
            ProfitabilityRecord {
                key: key.into_iter().map(String::from).collect(),
                revenue: acc.revenue,
                cost: acc.revenue - acc.profit,
                profit: acc.profit,
                margin_pct: margin(acc.profit, acc.revenue),
                quantity: acc.quantity,
                order_count: acc.orders.len(),
                avg_discount: acc.discount_sum / acc.lines as f64,
                loss_making: acc.profit < 0.0 && acc.revenue > 0.0,
            }
        })
        .collect()
}

/// Groups losing money despite positive revenue, worst first.
pub fn loss_leaders(records: &[ProfitabilityRecord]) -> Vec<&ProfitabilityRecord> {
    let mut out: Vec<&ProfitabilityRecord> = records.iter().filter(|r| r.loss_making).collect();
    out.sort_by(|a, b| a.profit.total_cmp(&b.profit).then_with(|| a.key.cmp(&b.key)));
    out
}
