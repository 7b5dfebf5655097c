use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of a loaded table. Columns are discovered at load time, so cells
/// carry their own loose type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Stringified cell, `None` for nulls.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::Text(s.to_string()) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

/// A row rendered as an ordered `column -> value` mapping.
pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>, // every row has columns.len() cells
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self { Self { columns, rows: Vec::new() } }

    /// Append a row, padding short rows with nulls and dropping surplus cells.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Stringified cell; `None` for nulls and out-of-range positions.
    pub fn text(&self, row: usize, col: usize) -> Option<String> {
        self.get(row, col).and_then(Value::to_text)
    }

    /// Non-null stringified values of one column, in row order.
    pub fn column_texts(&self, col: usize) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().filter_map(move |r| r.get(col).and_then(Value::to_text))
    }

    pub fn record(&self, row: usize) -> Option<Record> {
        let cells = self.rows.get(row)?;
        Some(self.columns.iter().cloned().zip(cells.iter().cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_display_without_fraction() {
        assert_eq!(Value::Number(20.0).to_string(), "20");
        assert_eq!(Value::Number(7.5).to_string(), "7.5");
        assert_eq!(Value::Null.to_text(), None);
    }

    #[test]
    fn short_rows_are_padded() {
        let mut t = Table::new(vec!["a".into(), "b".into()]);
        t.push_row(vec!["x".into()]);
        assert_eq!(t.rows[0], vec![Value::Text("x".into()), Value::Null]);
        let rec = t.record(0).unwrap();
        assert_eq!(rec.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
