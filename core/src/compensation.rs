//! Numeric extraction from free-form compensation strings ("12 LPA",
//! "8-10 LPA", "10,000 per month").

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"[0-9]+\.?[0-9]*").expect("valid regex");
    static ref RANGE_WORD: Regex = Regex::new(r"(?i)\bto\b").expect("valid regex");
}

pub const NOT_AVAILABLE: &str = "Not available";

/// Compensation brackets in LPA, checked in order. Upper bounds are inclusive.
pub const BRACKETS: [(&str, f64); 4] = [
    ("0-5 LPA", 5.0),
    ("5-10 LPA", 10.0),
    ("10-15 LPA", 15.0),
    ("15+ LPA", f64::INFINITY),
];

/// How program-level averages reduce the numbers found in each row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationPolicy {
    /// Average each row's numbers to one value, then average the rows.
    #[default]
    RowMean,
    /// Average every number from every row directly.
    Pooled,
    /// Use [`parse`], the same rule as the dataset-wide summary.
    RangeAware,
}

/// Every number in `raw` with thousands separators removed.
pub fn extract_numbers(raw: &str) -> Vec<f64> {
    let stripped = raw.replace(',', "");
    NUMBER
        .find_iter(&stripped)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

fn has_range_marker(raw: &str) -> bool {
    raw.contains('-') || raw.contains('\u{2013}') || RANGE_WORD.is_match(raw)
}

/// Parse a compensation string into samples. A range ("8-10", "8 to 10")
/// collapses to its mean; unrelated numbers stay separate.
pub fn parse(raw: &str) -> Vec<f64> {
    let nums = extract_numbers(raw);
    if nums.len() > 1 && has_range_marker(raw) {
        vec![mean(&nums)]
    } else {
        nums
    }
}

/// Samples one row contributes to a program average under `policy`.
pub fn row_values(raw: &str, policy: CompensationPolicy) -> Vec<f64> {
    match policy {
        CompensationPolicy::RowMean => {
            let nums = extract_numbers(raw);
            if nums.is_empty() { Vec::new() } else { vec![mean(&nums)] }
        }
        CompensationPolicy::Pooled => extract_numbers(raw),
        CompensationPolicy::RangeAware => parse(raw),
    }
}

/// Largest parsed sample of a string, used to rank rows by package.
pub fn representative(raw: &str) -> Option<f64> {
    parse(raw).into_iter().reduce(f64::max)
}

/// Most populated bracket; earlier brackets win ties.
pub fn common_range(values: &[f64]) -> &'static str {
    let mut counts = [0usize; BRACKETS.len()];
    for &v in values {
        if let Some(i) = BRACKETS.iter().position(|&(_, upper)| v <= upper) {
            counts[i] += 1;
        }
    }
    let mut best = 0;
    for i in 1..counts.len() {
        if counts[i] > counts[best] {
            best = i;
        }
    }
    if counts[best] == 0 { NOT_AVAILABLE } else { BRACKETS[best].0 }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

pub fn round2(v: f64) -> f64 { (v * 100.0).round() / 100.0 }
