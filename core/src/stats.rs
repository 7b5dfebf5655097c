//! Dataset-wide and program-scoped placement statistics.
//!
//! Everything here is recomputed from the table on every call. A missing
//! column degrades its own metric to zero or empty and never fails the
//! whole report.

use crate::compensation::{self, round2, CompensationPolicy};
use crate::schema::{Schema, SENTINEL};
use crate::table::{Record, Table};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const TOP_N: usize = 5;
pub const PROGRAM_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyCount {
    pub company: String,
    pub placements: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramCompany {
    pub company: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationSummary {
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Samples after parsing; a range counts once, unrelated figures each count.
    pub count: usize,
    pub common_range: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementStats {
    pub total_placements: usize,
    pub companies_count: usize,
    pub roles_count: usize,
    pub top_companies: Vec<CompanyCount>,
    pub top_roles: Vec<RoleCount>,
    pub compensation: Option<CompensationSummary>,
    pub placement_types: Vec<TypeCount>,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramStats {
    pub program: String,
    pub total_students: usize,
    pub placement_rate: f64,
    pub top_companies: Vec<ProgramCompany>,
    pub top_roles: Vec<RoleCount>,
    pub average_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub companies: Vec<String>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPackage {
    pub row_index: usize,
    pub value: f64,
    pub row: Record,
}

/// Frequency of each non-null value of `col` over `rows`, most frequent
/// first. Equal counts keep first-appearance order.
pub fn value_counts_in<I>(table: &Table, col: usize, rows: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = usize>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for row in rows {
        if let Some(text) = table.text(row, col) {
            *counts.entry(text).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

pub fn value_counts(table: &Table, col: usize) -> Vec<(String, usize)> {
    value_counts_in(table, col, 0..table.len())
}

/// The `n` most frequent values with the sentinel then removed, so the list
/// can be shorter than `n`.
fn top_n(counts: &[(String, usize)], n: usize) -> impl Iterator<Item = (String, usize)> + '_ {
    counts.iter().take(n).filter(|(v, _)| v != SENTINEL).cloned()
}

fn distinct_count(table: &Table, col: Option<usize>) -> usize {
    col.map(|c| value_counts(table, c).len()).unwrap_or(0)
}

fn placed_count<I: IntoIterator<Item = usize>>(table: &Table, company: Option<usize>, rows: I) -> usize {
    let Some(col) = company else { return 0 };
    rows.into_iter()
        .filter(|&r| table.text(r, col).map_or(true, |v| v != SENTINEL))
        .count()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
}

/// Full statistics snapshot of the table.
pub fn snapshot(table: &Table, schema: &Schema) -> PlacementStats {
    let company = table.column_index(&schema.company);
    let role = table.column_index(&schema.role);
    let origin = table.column_index(&schema.origin);

    let top_companies = company
        .map(|c| {
            top_n(&value_counts(table, c), TOP_N)
                .map(|(company, placements)| CompanyCount { company, placements })
                .collect()
        })
        .unwrap_or_default();
    let top_roles = role
        .map(|c| {
            top_n(&value_counts(table, c), TOP_N)
                .map(|(role, count)| RoleCount { role, count })
                .collect()
        })
        .unwrap_or_default();
    let placement_types = origin
        .map(|c| {
            value_counts(table, c)
                .into_iter()
                .filter(|(v, _)| v != SENTINEL)
                .map(|(kind, count)| TypeCount { kind, count })
                .collect()
        })
        .unwrap_or_default();

    PlacementStats {
        total_placements: table.len(),
        companies_count: distinct_count(table, company),
        roles_count: distinct_count(table, role),
        top_companies,
        top_roles,
        compensation: compensation_summary(table, schema),
        placement_types,
        success_rate: percentage(placed_count(table, company, 0..table.len()), table.len()),
    }
}

/// Range-aware samples from every row whose compensation is specified.
pub fn compensation_samples(table: &Table, schema: &Schema) -> Vec<f64> {
    let Some(col) = table.column_index(&schema.compensation) else { return Vec::new() };
    table
        .column_texts(col)
        .filter(|raw| raw != SENTINEL)
        .flat_map(|raw| compensation::parse(&raw))
        .collect()
}

pub fn compensation_summary(table: &Table, schema: &Schema) -> Option<CompensationSummary> {
    let values = compensation_samples(table, schema);
    if values.is_empty() {
        return None;
    }
    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let min = values.iter().copied().fold(f64::MAX, f64::min);
    Some(CompensationSummary {
        average: round2(compensation::mean(&values)),
        max: round2(max),
        min: round2(min),
        count: values.len(),
        common_range: compensation::common_range(&values).to_string(),
    })
}

/// Statistics for rows whose program column contains `program`
/// (case-insensitive). `None` means no data for that program.
pub fn program_stats(
    table: &Table,
    schema: &Schema,
    program: &str,
    policy: CompensationPolicy,
) -> Option<ProgramStats> {
    let class = table.column_index(&schema.program)?;
    let needle = program.to_lowercase();
    let rows: Vec<usize> = (0..table.len())
        .filter(|&r| table.text(r, class).is_some_and(|v| v.to_lowercase().contains(&needle)))
        .collect();
    if rows.is_empty() {
        tracing::debug!(program, "no rows for program");
        return None;
    }

    let company = table.column_index(&schema.company);
    let role = table.column_index(&schema.role);
    let top_companies = company
        .map(|c| {
            top_n(&value_counts_in(table, c, rows.iter().copied()), PROGRAM_TOP_N)
                .map(|(company, count)| ProgramCompany { company, count })
                .collect()
        })
        .unwrap_or_default();
    let top_roles = role
        .map(|c| {
            top_n(&value_counts_in(table, c, rows.iter().copied()), PROGRAM_TOP_N)
                .map(|(role, count)| RoleCount { role, count })
                .collect()
        })
        .unwrap_or_default();

    let salaries: Vec<f64> = table
        .column_index(&schema.compensation)
        .map(|c| {
            rows.iter()
                .filter_map(|&r| table.text(r, c))
                .filter(|raw| raw != SENTINEL)
                .flat_map(|raw| compensation::row_values(&raw, policy))
                .collect()
        })
        .unwrap_or_default();

    Some(ProgramStats {
        program: program.to_string(),
        total_students: rows.len(),
        placement_rate: percentage(placed_count(table, company, rows.iter().copied()), rows.len()),
        top_companies,
        top_roles,
        average_salary: compensation::mean(&salaries),
    })
}

fn distinct_in_order(table: &Table, col: Option<usize>) -> Vec<String> {
    let Some(col) = col else { return Vec::new() };
    let mut seen: IndexMap<String, ()> = IndexMap::new();
    for v in table.column_texts(col) {
        seen.entry(v).or_insert(());
    }
    seen.into_keys().collect()
}

pub fn overview(table: &Table, schema: &Schema) -> Overview {
    Overview {
        total_rows: table.len(),
        columns: table.columns.clone(),
        companies: distinct_in_order(table, table.column_index(&schema.company)),
        roles: distinct_in_order(table, table.column_index(&schema.role)),
    }
}

/// Rows whose `column` contains `term` case-insensitively, in table order.
pub fn search_column(table: &Table, column: &str, term: &str) -> Vec<Record> {
    let Some(col) = table.column_index(column) else { return Vec::new() };
    let needle = term.to_lowercase();
    (0..table.len())
        .filter(|&r| table.text(r, col).is_some_and(|v| v.to_lowercase().contains(&needle)))
        .filter_map(|r| table.record(r))
        .collect()
}

pub fn search_by_company(table: &Table, schema: &Schema, company: &str) -> Vec<Record> {
    search_column(table, &schema.company, company)
}

pub fn search_by_role(table: &Table, schema: &Schema, role: &str) -> Vec<Record> {
    search_column(table, &schema.role, role)
}

/// Row with the largest parsed package; the first row wins ties.
pub fn highest_package(table: &Table, schema: &Schema) -> Option<TopPackage> {
    let col = table.column_index(&schema.compensation)?;
    let mut best: Option<(usize, f64)> = None;
    for r in 0..table.len() {
        let Some(raw) = table.text(r, col) else { continue };
        if raw == SENTINEL { continue; }
        if let Some(v) = compensation::representative(&raw) {
            if best.map_or(true, |(_, top)| v > top) {
                best = Some((r, v));
            }
        }
    }
    let (row_index, value) = best?;
    Some(TopPackage { row_index, value, row: table.record(row_index)? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table(rows: &[[&str; 3]]) -> Table {
        let mut t = Table::new(vec!["Company".into(), "Role".into(), "Class".into()]);
        for r in rows {
            t.push_row(r.iter().map(|s| Value::from(*s)).collect());
        }
        t
    }

    #[test]
    fn value_counts_ties_keep_first_appearance() {
        let t = table(&[["B", "x", "c"], ["A", "x", "c"], ["B", "y", "c"], ["A", "y", "c"], ["C", "z", "c"]]);
        let counts = value_counts(&t, 0);
        assert_eq!(counts, vec![("B".into(), 2), ("A".into(), 2), ("C".into(), 1)]);
    }

    #[test]
    fn sentinel_is_counted_but_not_listed() {
        let t = table(&[[SENTINEL, "x", "c"], [SENTINEL, "x", "c"], ["Acme", "y", "c"]]);
        let stats = snapshot(&t, &Schema::default());
        assert_eq!(stats.companies_count, 2);
        assert_eq!(stats.top_companies, vec![CompanyCount { company: "Acme".into(), placements: 1 }]);
        assert!(stats.compensation.is_none());
    }

    #[test]
    fn missing_company_column_degrades_to_zero() {
        let mut t = Table::new(vec!["Role".into()]);
        t.push_row(vec!["SWE".into()]);
        let stats = snapshot(&t, &Schema::default());
        assert_eq!(stats.companies_count, 0);
        assert!(stats.top_companies.is_empty());
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.roles_count, 1);
    }

    #[test]
    fn program_filter_is_case_insensitive_substring() {
        let t = table(&[["A", "x", "MCA Data Science"], ["B", "y", "msc"], ["C", "z", "mca"]]);
        let stats = program_stats(&t, &Schema::default(), "MCA", CompensationPolicy::default()).unwrap();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.placement_rate, 100.0);
        assert_eq!(stats.average_salary, 0.0);
        assert!(program_stats(&t, &Schema::default(), "btech", CompensationPolicy::default()).is_none());
    }

    #[test]
    fn search_matches_substrings_in_order() {
        let t = table(&[["Google India", "x", "c"], ["Infosys", "y", "c"], ["google", "z", "c"]]);
        let hits = search_by_company(&t, &Schema::default(), "GOOGLE");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["Role"], Value::Text("x".into()));
        assert_eq!(hits[1]["Role"], Value::Text("z".into()));
        assert!(search_column(&t, "Missing", "x").is_empty());
    }
}
