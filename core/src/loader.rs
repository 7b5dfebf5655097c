use crate::error::{LoadError, Result};
use crate::schema::{Schema, SENTINEL};
use crate::table::{Table, Value};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

/// Markers that read as missing cells in tabular exports.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#NA", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Delimited,
    Spreadsheet,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Format::Delimited),
            "xlsx" | "xls" => Ok(Format::Spreadsheet),
            _ => Err(LoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a `.csv`, `.xlsx` or `.xls` file into a table. Cells are typed but
/// not cleaned; see [`clean`].
pub fn load<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let table = match Format::from_path(path)? {
        Format::Delimited => load_delimited(path)?,
        Format::Spreadsheet => load_spreadsheet(path)?,
    };
    tracing::info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        column_names = ?table.columns,
        "loaded table"
    );
    Ok(table)
}

fn load_delimited(path: &Path) -> Result<Table> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    let mut table = Table::new(normalize_headers(headers));
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(infer_value).collect());
    }
    Ok(table)
}

fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Empty(path.to_path_buf()))??;
    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| LoadError::Empty(path.to_path_buf()))?;
    let headers = header_row
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();
    let mut table = Table::new(normalize_headers(headers));
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    Ok(table)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => infer_value(s),
        other => Value::Text(other.to_string()),
    }
}

/// Type a raw cell: NA markers become null, plain numerals become numbers,
/// anything else stays text exactly as written.
pub fn infer_value(raw: &str) -> Value {
    if NA_MARKERS.contains(&raw) {
        return Value::Null;
    }
    let numeric_chars = raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if numeric_chars && raw.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<f64>() {
            if n.is_finite() {
                return Value::Number(n);
            }
        }
    }
    Value::Text(raw.to_string())
}

/// Blank headers become `Unnamed: <i>`, repeats get `.1`, `.2`, ... suffixes.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.trim().is_empty() { format!("Unnamed: {i}") } else { h };
            let n = seen.entry(base.clone()).or_insert(0);
            let name = if *n == 0 { base } else { format!("{base}.{n}") };
            *n += 1;
            name
        })
        .collect()
}

/// Fill, stringify and trim the designated text fields. Rows are never
/// dropped and other columns are left untouched.
pub fn clean(table: &mut Table, schema: &Schema) {
    let targets: Vec<usize> = schema.text_fields().iter().filter_map(|name| table.column_index(name)).collect();
    for row in table.rows.iter_mut() {
        for &col in &targets {
            let cleaned = match &row[col] {
                Value::Null => SENTINEL.to_string(),
                other => other.to_string().trim().to_string(),
            };
            row[col] = Value::Text(cleaned);
        }
    }
    tracing::debug!(cleaned_columns = targets.len(), "cleaned designated text fields");
}

/// Load then clean in one step.
pub fn load_clean<P: AsRef<Path>>(path: P, schema: &Schema) -> Result<Table> {
    let mut table = load(path)?;
    clean(&mut table, schema);
    Ok(table)
}
