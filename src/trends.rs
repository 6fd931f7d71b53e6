use crate::error::{AnalyticsError, Result};
use crate::model::{Dataset, TrendPoint};
use crate::stats;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl FromStr for Granularity {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" | "d" => Ok(Granularity::Day),
            "week" | "weekly" | "w" => Ok(Granularity::Week),
            "month" | "monthly" | "m" => Ok(Granularity::Month),
            "quarter" | "quarterly" | "q" => Ok(Granularity::Quarter),
            "year" | "yearly" | "y" => Ok(Granularity::Year),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "unknown granularity: {}",
                other
            ))),
        }
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

impl Granularity {
    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                let back = Days::new(date.weekday().num_days_from_monday() as u64);
                date.checked_sub_days(back).unwrap_or(NaiveDate::MIN)
            }
            Granularity::Month => month_start(date),
            Granularity::Quarter => month_start(date)
                .with_month(date.month0() / 3 * 3 + 1)
                .unwrap_or(date),
            Granularity::Year => date.with_ordinal(1).unwrap_or(date),
        }
    }

    /// Start of the period following the one beginning at `start`, `None`
    /// past the last representable date.
    pub fn next_start(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => start.succ_opt(),
            Granularity::Week => start.checked_add_days(Days::new(7)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
            Granularity::Quarter => start.checked_add_months(Months::new(3)),
            Granularity::Year => start.checked_add_months(Months::new(12)),
        }
    }

    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Granularity::Day => start.format("%Y-%m-%d").to_string(),
            Granularity::Week => {
                let iso = start.iso_week();
                format!("{}-W{:02}", iso.year(), iso.week())
            }
            Granularity::Month => start.format("%Y-%m").to_string(),
            Granularity::Quarter => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
            Granularity::Year => start.format("%Y").to_string(),
        }
    }
}

#[derive(Default)]
struct BucketAcc<'a> {
    revenue: f64,
    profit: f64,
    orders: BTreeSet<&'a str>,
    customers: BTreeSet<&'a str>,
}

/// Chronological buckets from the first to the last observed period, with
/// empty periods in between emitted as zero-valued points.
pub fn bucket(dataset: &Dataset, granularity: Granularity) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, BucketAcc> = BTreeMap::new();
    for t in dataset.iter() {
        let acc = buckets.entry(granularity.period_start(t.order_date)).or_default();
        acc.revenue += t.sales;
        acc.profit += t.profit;
        acc.orders.insert(t.order_id.as_str());
        acc.customers.insert(t.customer_id.as_str());
    }

    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };
    debug!(?granularity, %first, %last, observed = buckets.len(), "bucketing trend");

    let mut points: Vec<TrendPoint> = Vec::new();
    let mut start = first;
    let mut previous: Option<f64> = None;

    while start <= last {
        let point = match buckets.get(&start) {
            Some(acc) => TrendPoint {
                period: granularity.label(start),
                period_start: start,
                revenue: acc.revenue,
                profit: acc.profit,
                order_count: acc.orders.len(),
                distinct_customers: acc.customers.len(),
                delta_pct: None,
            },
            None => TrendPoint {
                period: granularity.label(start),
                period_start: start,
                revenue: 0.0,
                profit: 0.0,
                order_count: 0,
                distinct_customers: 0,
                delta_pct: None,
            },
        };
        let delta_pct = previous.and_then(|prev| stats::pct_change(point.revenue, prev));
        previous = Some(point.revenue);
        points.push(TrendPoint { delta_pct, ..point });
        match granularity.next_start(start) {
            Some(next) => start = next,
            None => break,
        }
    }
    points
}

/// Trailing mean of revenue over `window` points, `None` until the window fills.
pub fn moving_average(points: &[TrendPoint], window: usize) -> Result<Vec<Option<f64>>> {
    if window == 0 {
        return Err(AnalyticsError::InvalidArgument(
            "moving average window must be positive".to_string(),
        ));
    }
    let revenue: Vec<f64> = points.iter().map(|p| p.revenue).collect();
    Ok((0..revenue.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                Some(stats::mean(&revenue[i + 1 - window..=i]))
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Transaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(order: &str, customer: &str, day: NaiveDate, sales: f64) -> Transaction {
        Transaction {
            order_id: order.to_string(),
            customer_id: customer.to_string(),
            order_date: day,
            product_id: "P".to_string(),
            category: "Furniture".to_string(),
            sub_category: "Bookcases".to_string(),
            region: "South".to_string(),
            segment: "Consumer".to_string(),
            sales,
            discount: 0.0,
            profit: 0.0,
            quantity: 1,
        }
    }

    #[test]
    fn test_monthly_delta() {
        let ds = Dataset::new(vec![
            tx("O1", "C1", date(2024, 1, 5), 100_000.0),
            tx("O2", "C2", date(2024, 1, 20), 50_000.0),
            tx("O3", "C1", date(2024, 2, 3), 145_000.0),
        ]);
        let points = bucket(&ds, Granularity::Month);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].period, "2024-01");
        assert_eq!(points[0].delta_pct, None);
        assert_eq!(points[0].order_count, 2);
        assert_eq!(points[0].distinct_customers, 2);
        let delta = points[1].delta_pct.unwrap();
        assert!((delta - (-5_000.0 / 150_000.0)).abs() < 1e-12);
    }

    #[test]
    fn test_gaps_are_zero_filled() {
        let ds = Dataset::new(vec![
            tx("O1", "C1", date(2023, 11, 15), 10.0),
            tx("O2", "C1", date(2024, 2, 1), 30.0),
        ]);
        let points = bucket(&ds, Granularity::Month);
        let labels: Vec<&str> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(points[1].revenue, 0.0);
        assert_eq!(points[1].order_count, 0);
        assert!((points[1].delta_pct.unwrap() + 1.0).abs() < 1e-12);
        // no change can be computed from an empty month
        assert_eq!(points[2].delta_pct, None);
        assert_eq!(points[3].delta_pct, None);
    }

    #[test]
    fn test_period_starts_and_labels() {
        let d = date(2024, 8, 15);
        assert_eq!(Granularity::Week.period_start(d), date(2024, 8, 12));
        assert_eq!(Granularity::Quarter.period_start(d), date(2024, 7, 1));
        assert_eq!(Granularity::Year.period_start(d), date(2024, 1, 1));
        assert_eq!(Granularity::Quarter.label(date(2024, 7, 1)), "2024-Q3");
        assert_eq!(Granularity::Week.label(date(2024, 12, 30)), "2025-W01");
        assert_eq!(Granularity::Quarter.next_start(date(2024, 10, 1)), Some(date(2025, 1, 1)));
        assert_eq!(Granularity::Month.next_start(date(2024, 1, 1)), Some(date(2024, 2, 1)));
        assert_eq!(Granularity::Year.next_start(date(2024, 1, 1)), Some(date(2025, 1, 1)));
        assert_eq!(Granularity::Day.next_start(NaiveDate::MAX), None);
        assert_eq!(Granularity::Week.period_start(NaiveDate::MIN), NaiveDate::MIN);
    }

    #[test]
    fn test_revenue_is_conserved() {
        let ds = Dataset::new(
            (0..40u64)
                .map(|i| {
                    let day = date(2024, 1, 1) + Days::new(i * 9);
                    tx(&format!("O{}", i), "C", day, 1.5 * i as f64)
                })
                .collect(),
        );
        let all = [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Quarter,
            Granularity::Year,
        ];
        for g in all {
            let total: f64 = bucket(&ds, g).iter().map(|p| p.revenue).sum();
            assert!((total - ds.total_sales()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_series_ends_at_last_representable_day() {
        let before = NaiveDate::MAX.pred_opt().unwrap();
        let ds = Dataset::new(vec![
            tx("O1", "C1", before, 5.0),
            tx("O2", "C2", NaiveDate::MAX, 7.0),
        ]);
        assert_eq!(bucket(&ds, Granularity::Day).len(), 2);
        for g in [Granularity::Week, Granularity::Month, Granularity::Quarter, Granularity::Year] {
            let points = bucket(&ds, g);
            assert!(points.len() <= 2);
            assert_eq!(points.last().unwrap().period_start, g.period_start(NaiveDate::MAX));
            assert_eq!(points.iter().map(|p| p.revenue).sum::<f64>(), 12.0);
        }
    }

    #[test]
    fn test_empty_dataset() {
        assert!(bucket(&Dataset::default(), Granularity::Day).is_empty());
    }

    #[test]
    fn test_moving_average() {
        let ds = Dataset::new(vec![
            tx("O1", "C", date(2024, 1, 1), 10.0),
            tx("O2", "C", date(2024, 1, 2), 20.0),
            tx("O3", "C", date(2024, 1, 3), 60.0),
        ]);
        let points = bucket(&ds, Granularity::Day);
        let ma = moving_average(&points, 2).unwrap();
        assert_eq!(ma, vec![None, Some(15.0), Some(40.0)]);
        assert!(moving_average(&points, 0).is_err());
    }
}
