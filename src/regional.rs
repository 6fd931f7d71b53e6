use crate::error::AnalyticsError;
use crate::model::{Dataset, RegionalMetric};
use crate::profitability::{self, Dimension};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

/// Profit figure each region is measured against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    #[default]
    TopProfit,
    Mean,
    Region(String),
}

impl FromStr for Baseline {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(region) = s.strip_prefix("region:") {
            return Ok(Baseline::Region(region.trim().to_string()));
        }
        match s.to_lowercase().as_str() {
            "max" | "top" | "top_profit" => Ok(Baseline::TopProfit),
            "mean" | "average" => Ok(Baseline::Mean),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "unknown baseline: {}",
                other
            ))),
        }
    }
}

fn baseline_profit(baseline: &Baseline, profits: &BTreeMap<String, f64>) -> Option<f64> {
    match baseline {
        Baseline::TopProfit => profits.values().copied().reduce(f64::max),
        Baseline::Mean => {
            let values: Vec<f64> = profits.values().copied().collect();
            (!values.is_empty()).then(|| stats::mean(&values))
        }
        Baseline::Region(name) => profits.get(name).copied(),
    }
}

/// Per-region metrics in region order. `growth_pct` compares revenue against
/// `prior` and is `None` without a usable prior figure.
pub fn compare(
    dataset: &Dataset,
    prior: Option<&Dataset>,
    baseline: &Baseline,
) -> Vec<RegionalMetric> {
    let current = profitability::aggregate(dataset, &[Dimension::Region]);
    let prior_revenue: Option<BTreeMap<String, f64>> = prior.map(|p| {
        profitability::aggregate(p, &[Dimension::Region])
            .into_iter()
            .map(|r| (r.key.concat(), r.revenue))
            .collect()
    });

    let profits: BTreeMap<String, f64> = current
        .iter()
        .map(|r| (r.key.concat(), r.profit))
        .collect();
    let base = baseline_profit(baseline, &profits).filter(|b| *b != 0.0);
    let total_revenue: f64 = current.iter().map(|r| r.revenue).sum();

    debug!(regions = current.len(), ?baseline, has_prior = prior.is_some(), "comparing regions");

    current
        .into_iter()
        .map(|r| {
            let region = r.key.concat();
            let growth_pct = prior_revenue
                .as_ref()
                .and_then(|p| p.get(&region))
                .and_then(|prev| stats::pct_change(r.revenue, *prev));
            RegionalMetric {
                growth_pct,
                relative_performance: base.map(|b| r.profit / b),
                revenue_share: if total_revenue == 0.0 {
                    0.0
                } else {
                    r.revenue / total_revenue
                },
                revenue: r.revenue,
                profit: r.profit,
                margin_pct: r.margin_pct,
                region,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;
    use chrono::NaiveDate;

    fn tx(region: &str, sales: f64, profit: f64) -> Transaction {
        Transaction {
            order_id: format!("O-{}-{}", region, sales),
            customer_id: "C".to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
            product_id: "P".to_string(),
            category: "Technology".to_string(),
            sub_category: "Machines".to_string(),
            region: region.to_string(),
            segment: "Home Office".to_string(),
            sales,
            discount: 0.0,
            profit,
            quantity: 1,
        }
    }

    #[test]
    fn test_relative_performance_against_leader() {
        let ds = Dataset::new(vec![tx("West", 400.0, 100.0), tx("South", 300.0, 50.0)]);
        let regions = compare(&ds, None, &Baseline::TopProfit);
        let perf: Vec<(&str, Option<f64>)> = regions
            .iter()
            .map(|r| (r.region.as_str(), r.relative_performance))
            .collect();
        assert_eq!(perf, vec![("South", Some(0.5)), ("West", Some(1.0))]);
        assert!(regions.iter().all(|r| r.growth_pct.is_none()));
    }

    #[test]
    fn test_growth_against_prior_period() {
        let ds = Dataset::new(vec![tx("East", 120.0, 12.0), tx("West", 50.0, 5.0)]);
        let prior = Dataset::new(vec![tx("East", 100.0, 10.0), tx("Central", 80.0, 8.0)]);
        let regions = compare(&ds, Some(&prior), &Baseline::TopProfit);

        let east = regions.iter().find(|r| r.region == "East").unwrap();
        assert!((east.growth_pct.unwrap() - 0.2).abs() < 1e-9);
        let west = regions.iter().find(|r| r.region == "West").unwrap();
        assert_eq!(west.growth_pct, None);
        assert!(regions.iter().all(|r| r.region != "Central"));
    }

    #[test]
    fn test_other_baselines_and_share() {
        let ds = Dataset::new(vec![tx("West", 300.0, 90.0), tx("East", 100.0, 30.0)]);

        let mean = compare(&ds, None, &Baseline::Mean);
        assert!((mean[0].relative_performance.unwrap() - 0.5).abs() < 1e-9);
        assert!((mean[0].revenue_share - 0.25).abs() < 1e-9);

        let named = compare(&ds, None, &Baseline::Region("East".to_string()));
        assert!((named[1].relative_performance.unwrap() - 3.0).abs() < 1e-9);

        let missing = compare(&ds, None, &Baseline::Region("North".to_string()));
        assert!(missing.iter().all(|r| r.relative_performance.is_none()));
    }

    #[test]
    fn test_zero_baseline_is_unavailable() {
        let ds = Dataset::new(vec![tx("West", 100.0, 0.0), tx("East", 50.0, 0.0)]);
        let regions = compare(&ds, None, &Baseline::TopProfit);
        assert!(regions.iter().all(|r| r.relative_performance.is_none()));
    }

    #[test]
    fn test_baseline_from_str() {
        assert_eq!("max".parse::<Baseline>().unwrap(), Baseline::TopProfit);
        assert_eq!(
            "region:West".parse::<Baseline>().unwrap(),
            Baseline::Region("West".to_string())
        );
        assert!("median".parse::<Baseline>().is_err());
    }
}
