//! Plain-text hand-off to the language model used for open-ended questions.

use crate::schema::{Schema, SENTINEL};
use crate::stats::{compensation_summary, value_counts, TOP_N};
use crate::table::Table;
use std::fmt::Write;

/// Text report of the table the model can reason over: top companies and
/// roles, compensation, program, gender and placement-source breakdowns.
/// Sections whose column is absent are left out.
pub fn data_summary(table: &Table, schema: &Schema) -> String {
    let total = table.len();
    let pct = |count: usize| if total == 0 { 0.0 } else { count as f64 / total as f64 * 100.0 };
    let mut out = format!("Total Records: {total}\n\n");

    if let Some(col) = table.column_index(&schema.company) {
        out.push_str("TOP COMPANIES:\n");
        for (company, count) in value_counts(table, col).into_iter().take(TOP_N).filter(|(v, _)| v != SENTINEL) {
            let _ = writeln!(out, "- {company}: {count} placements");
        }
        out.push('\n');
    }

    if let Some(col) = table.column_index(&schema.role) {
        out.push_str("TOP ROLES:\n");
        for (role, count) in value_counts(table, col).into_iter().take(TOP_N).filter(|(v, _)| v != SENTINEL) {
            let _ = writeln!(out, "- {role}: {count} roles");
        }
        out.push('\n');
    }

    if table.column_index(&schema.compensation).is_some() {
        let comp = compensation_summary(table, schema);
        let show = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_else(|| "N/A".to_string());
        out.push_str("COMPENSATION STATS:\n");
        let _ = writeln!(out, "- Average: {} LPA", show(comp.as_ref().map(|c| c.average)));
        let _ = writeln!(out, "- Highest: {} LPA", show(comp.as_ref().map(|c| c.max)));
        let _ = writeln!(out, "- Lowest: {} LPA", show(comp.as_ref().map(|c| c.min)));
        out.push('\n');
    }

    if let Some(col) = table.column_index(&schema.program) {
        out.push_str("PROGRAM DISTRIBUTION:\n");
        for (program, count) in value_counts(table, col) {
            let _ = writeln!(out, "- {program}: {count} students");
        }
        out.push('\n');
    }

    if let Some(col) = table.column_index(&schema.gender) {
        out.push_str("GENDER DISTRIBUTION:\n");
        for (gender, count) in value_counts(table, col) {
            let _ = writeln!(out, "- {gender}: {count} students ({:.1}%)", pct(count));
        }
        out.push('\n');
    }

    if let Some(col) = table.column_index(&schema.origin) {
        out.push_str("PLACEMENT SOURCES:\n");
        for (origin, count) in value_counts(table, col).into_iter().filter(|(v, _)| v != SENTINEL) {
            let _ = writeln!(out, "- {origin}: {count} placements ({:.1}%)", pct(count));
        }
    }

    out
}

/// Prompt asking the model to answer `question` from `summary` as a data
/// analyst would.
pub fn analysis_prompt(question: &str, summary: &str) -> String {
    format!(
        "You are a data analyst. Answer the question using the placement data summary below.\n\n\
         PLACEMENT DATA SUMMARY:\n{summary}\n\
         QUESTION: {question}\n\n\
         REQUIREMENTS:\n\
         1. Base every statistic on the data shown\n\
         2. Be specific and quantitative\n\
         3. Include numbers and percentages where possible\n\
         4. Point out insights the data supports\n\
         5. If the data cannot answer the question, say why\n\n\
         ANSWER:\n"
    )
}
