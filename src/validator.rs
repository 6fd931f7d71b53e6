use crate::error::{AnalyticsError, Result};
use crate::model::{
    CheckCategory, CheckResult, Dataset, Issue, IssueKind, NullCount, QualityReport, RawRecord,
    RawTable, Severity, Transaction, REQUIRED_COLUMNS,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

const BUSINESS_KEY: [&str; 5] = ["order_id", "product_id", "customer_id", "order_date", "sales"];

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

enum FieldCheck {
    Ok,
    Unparseable,
    OutOfRange,
}

fn check_field(column: &str, value: &str) -> FieldCheck {
    match column {
        "order_date" => match parse_date(value) {
            Some(_) => FieldCheck::Ok,
            None => FieldCheck::Unparseable,
        },
        "sales" => match parse_number(value) {
            Some(v) if v < 0.0 => FieldCheck::OutOfRange,
            Some(_) => FieldCheck::Ok,
            None => FieldCheck::Unparseable,
        },
        "discount" => match parse_number(value) {
            Some(v) if !(0.0..=1.0).contains(&v) => FieldCheck::OutOfRange,
            Some(_) => FieldCheck::Ok,
            None => FieldCheck::Unparseable,
        },
        "profit" => match parse_number(value) {
            Some(_) => FieldCheck::Ok,
            None => FieldCheck::Unparseable,
        },
        "quantity" => match parse_integer(value) {
            Some(q) if q <= 0 => FieldCheck::OutOfRange,
            Some(_) => FieldCheck::Ok,
            None => FieldCheck::Unparseable,
        },
        _ => FieldCheck::Ok,
    }
}

// Parsed values in one textual form, so `01/01/2024` equals `2024-01-01`
// and `10.00` equals `10`. Unparseable text is compared as-is.
fn canonical(column: &str, value: &str) -> String {
    let parsed = match column {
        "order_date" => parse_date(value).map(|d| d.format("%Y-%m-%d").to_string()),
        "sales" | "discount" | "profit" => parse_number(value).map(|v| v.to_string()),
        "quantity" => parse_integer(value).map(|q| q.to_string()),
        _ => None,
    };
    parsed.unwrap_or_else(|| value.trim().to_string())
}

fn key_of(row: &RawRecord, columns: &[&str]) -> Vec<Option<String>> {
    columns
        .iter()
        .map(|c| row.get(c).map(|v| canonical(c, v)))
        .collect()
}

fn issue(row: usize, column: &str, kind: IssueKind, value: Option<&str>) -> Issue {
    Issue {
        row,
        column: column.to_string(),
        kind,
        severity: kind.severity(),
        value: value.map(|v| v.to_string()),
    }
}

/// Check a raw table. Fails only when required columns are absent.
pub fn validate(table: &RawTable) -> Result<QualityReport> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.columns.iter().any(|have| have == *c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalyticsError::Schema { missing });
    }

    let total = table.rows.len();
    debug!(rows = total, "validating ledger");

    let mut null_counts: BTreeMap<String, usize> =
        REQUIRED_COLUMNS.iter().map(|c| (c.to_string(), 0)).collect();
    let mut issues = Vec::new();
    let mut seen_rows = HashSet::new();
    let mut seen_keys = HashSet::new();
    let mut duplicate_rows = 0;
    let mut duplicate_keys = 0;

    for (i, row) in table.rows.iter().enumerate() {
        for column in REQUIRED_COLUMNS {
            let value = row.get(column);
            if is_blank(value) {
                *null_counts.entry(column.to_string()).or_default() += 1;
                issues.push(issue(i, column, IssueKind::Missing, value));
                continue;
            }
            let Some(value) = value else { continue };
            match check_field(column, value) {
                FieldCheck::Ok => {}
                FieldCheck::Unparseable => {
                    issues.push(issue(i, column, IssueKind::Unparseable, Some(value)))
                }
                FieldCheck::OutOfRange => {
                    issues.push(issue(i, column, IssueKind::OutOfRange, Some(value)))
                }
            }
        }

        if !seen_rows.insert(key_of(row, &REQUIRED_COLUMNS)) {
            duplicate_rows += 1;
        }
        if !seen_keys.insert(key_of(row, &BUSINESS_KEY)) {
            duplicate_keys += 1;
            issues.push(issue(i, "business_key", IssueKind::DuplicateKey, row.get("order_id")));
        }
    }

    let count = |kind: IssueKind| issues.iter().filter(|x| x.kind == kind).count();
    let missing_fields = count(IssueKind::Missing);
    let unparseable = count(IssueKind::Unparseable);
    let out_of_range = count(IssueKind::OutOfRange);

    let critical_rows: Vec<usize> = issues
        .iter()
        .filter(|x| x.severity == Severity::Critical)
        .map(|x| x.row)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let check = |category: CheckCategory, issues: usize| CheckResult {
        category,
        issues,
        passed: issues == 0,
    };
    let checks = vec![
        check(CheckCategory::Completeness, missing_fields),
        check(CheckCategory::Format, unparseable),
        check(CheckCategory::Range, out_of_range),
        check(CheckCategory::Uniqueness, duplicate_keys),
    ];

    let nulls = null_counts
        .into_iter()
        .map(|(column, count)| {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            (column, NullCount { count, pct })
        })
        .collect();

    if out_of_range > 0 || duplicate_keys > 0 {
        warn!(out_of_range, duplicate_keys, "advisory data-quality issues found");
    }
    if !critical_rows.is_empty() {
        warn!(rows = critical_rows.len(), "rows blocked by critical issues");
    }

    Ok(QualityReport {
        total_records: total,
        nulls,
        duplicate_rows,
        duplicate_keys,
        out_of_range,
        unparseable,
        critical: !critical_rows.is_empty(),
        critical_rows,
        checks,
        issues,
    })
}

/// Convert a row that carries no critical issue.
pub fn to_transaction(row: &RawRecord) -> Option<Transaction> {
    let text = |column: &str| {
        row.get(column)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    Some(Transaction {
        order_id: text("order_id")?,
        customer_id: text("customer_id")?,
        order_date: parse_date(row.get("order_date")?)?,
        product_id: text("product_id")?,
        category: text("category")?,
        sub_category: text("sub_category")?,
        region: text("region")?,
        segment: text("segment")?,
        sales: parse_number(row.get("sales")?)?,
        discount: parse_number(row.get("discount")?)?,
        profit: parse_number(row.get("profit")?)?,
        quantity: parse_integer(row.get("quantity")?)?,
    })
}

/// Validate, then build the typed dataset from every row without critical issues.
pub fn prepare(table: &RawTable) -> Result<(Dataset, QualityReport)> {
    let report = validate(table)?;
    let blocked: HashSet<usize> = report.critical_rows.iter().copied().collect();

    let dataset: Dataset = table
        .rows
        .iter()
        .enumerate()
        .filter(|(i, _)| !blocked.contains(i))
        .filter_map(|(_, row)| to_transaction(row))
        .collect();

    info!(
        accepted = dataset.len(),
        blocked = blocked.len(),
        "validation complete"
    );
    Ok((dataset, report))
}
