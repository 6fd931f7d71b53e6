// Quintiles are cut from the worst end; leftover customers score low.

use crate::model::{CustomerProfile, Dataset, RfmSegment};
use crate::stats;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

pub const QUINTILES: usize = 5;

struct CustomerAcc<'a> {
    last_order: NaiveDate,
    orders: BTreeSet<&'a str>,
    monetary: f64,
}

struct RawRfm {
    customer_id: String,
    recency_days: i64,
    frequency: usize,
    monetary: f64,
}

/// Day after the latest order in the dataset.
pub fn default_reference_date(dataset: &Dataset) -> Option<NaiveDate> {
    dataset
        .date_range()
        .map(|(_, last)| last.succ_opt().unwrap_or(last))
}

pub fn score(dataset: &Dataset, reference_date: NaiveDate) -> Vec<CustomerProfile> {
    let mut by_customer: BTreeMap<&str, CustomerAcc> = BTreeMap::new();

    for t in dataset.iter() {
        let acc = by_customer
            .entry(t.customer_id.as_str())
            .or_insert_with(|| CustomerAcc {
                last_order: t.order_date,
                orders: BTreeSet::new(),
                monetary: 0.0,
            });
        acc.last_order = acc.last_order.max(t.order_date);
        acc.orders.insert(t.order_id.as_str());
        acc.monetary += t.sales;
    }

    let base: Vec<RawRfm> = by_customer
        .into_iter()
        .map(|(id, acc)| RawRfm {
            customer_id: id.to_string(),
            recency_days: (reference_date - acc.last_order).num_days(),
            frequency: acc.orders.len(),
            monetary: acc.monetary,
        })
        .collect();

    debug!(customers = base.len(), %reference_date, "scoring RFM");
    if !base.is_empty() && base.len() < QUINTILES {
        warn!(customers = base.len(), "fewer customers than quintiles, scores degenerate");
    }

    // `base` is already sorted by customer_id, so a stable sort keeps the tie-break
    let recency = quintile_scores(&base, |a, b| a.recency_days.cmp(&b.recency_days));
    let frequency = quintile_scores(&base, |a, b| b.frequency.cmp(&a.frequency));
    let monetary = quintile_scores(&base, |a, b| b.monetary.total_cmp(&a.monetary));

    base.into_iter()
        .enumerate()
        .map(|(i, c)| {
            let (r, f, m) = (recency[i], frequency[i], monetary[i]);
            CustomerProfile {
                customer_id: c.customer_id,
                recency_days: c.recency_days,
                frequency: c.frequency,
                monetary: c.monetary,
                recency_score: r,
                frequency_score: f,
                monetary_score: m,
                rfm_code: format!("{}{}{}", r, f, m),
                segment: classify(r, f, m),
            }
        })
        .collect()
}

/// Bucket sizes for `n` items, remainder assigned to the lowest scores.
pub fn bucket_sizes(n: usize) -> [usize; QUINTILES] {
    let base = n / QUINTILES;
    let rem = n % QUINTILES;
    let mut sizes = [base; QUINTILES];
    for size in sizes.iter_mut().take(rem) {
        *size += 1;
    }
    sizes
}

// `best_first` orders two customers so the better one comes first.
fn quintile_scores<F>(base: &[RawRfm], best_first: F) -> Vec<u8>
where
    F: Fn(&RawRfm, &RawRfm) -> Ordering,
{
    let mut order: Vec<usize> = (0..base.len()).collect();
    order.sort_by(|&a, &b| best_first(&base[a], &base[b]));

    let sizes = bucket_sizes(base.len());
    let mut scores = vec![0u8; base.len()];
    let mut worst_first = order.iter().rev();

    for (bucket, size) in sizes.iter().enumerate() {
        for &idx in worst_first.by_ref().take(*size) {
            scores[idx] = bucket as u8 + 1;
        }
    }
    scores
}

pub fn classify(r: u8, f: u8, m: u8) -> RfmSegment {
    match (r, f, m) {
        (4..=5, 4..=5, 4..=5) => RfmSegment::Champions,
        (1..=2, 4..=5, 4..=5) => RfmSegment::CannotLoseThem,
        (3..=5, 4..=5, _) => RfmSegment::Loyal,
        (1..=2, 3..=5, _) => RfmSegment::AtRisk,
        (4..=5, 1, _) => RfmSegment::NewCustomers,
        (4..=5, _, _) => RfmSegment::PotentialLoyalist,
        (2, _, _) => RfmSegment::Hibernating,
        (1, _, _) => RfmSegment::Lost,
        _ => RfmSegment::Others,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment: RfmSegment,
    pub customers: usize,
    pub share: f64,
    pub mean_monetary: f64,
    pub mean_recency_days: f64,
}

pub fn segment_summary(profiles: &[CustomerProfile]) -> Vec<SegmentSummary> {
    let mut groups: BTreeMap<RfmSegment, Vec<&CustomerProfile>> = BTreeMap::new();
    for p in profiles {
        groups.entry(p.segment).or_default().push(p);
    }

    let total = profiles.len() as f64;
    groups
        .into_iter()
        .map(|(segment, members)| {
            let monetary: Vec<f64> = members.iter().map(|p| p.monetary).collect();
            let recency: Vec<f64> = members.iter().map(|p| p.recency_days as f64).collect();
            SegmentSummary {
                segment,
                customers: members.len(),
                share: members.len() as f64 / total,
                mean_monetary: stats::mean(&monetary),
                mean_recency_days: stats::mean(&recency),
            }
        })
        .collect()
}
