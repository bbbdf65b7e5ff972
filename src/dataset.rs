//! Raw tabular data as delivered by the backend: ordered records of scalar cells.
//!
//! The schema is not known ahead of time. Column order is the order in which keys are
//! first seen across records, which is also the display order.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric reading of the cell: numbers as-is, text that parses as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Number(_) => None,
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Scalar::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Canonical string form used for search and display.
    /// Null renders as the empty string; whole numbers render without a fractional part.
    pub fn canonical_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Number(n) => format_number(*n),
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::from(s.to_string())
    }
}

impl From<String> for Scalar {
    /// Blank strings are missing values (the backend fills empty cells with "").
    fn from(s: String) -> Self {
        if s.trim().is_empty() {
            Scalar::Null
        } else {
            Scalar::Text(s)
        }
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => Scalar::from(s.as_str()),
            Value::Bool(b) => Scalar::Text(b.to_string()),
            Value::Array(_) | Value::Object(_) => Scalar::Text(value.to_string()),
        }
    }
}

/// Whole numbers below 2^53 print as integers; everything else uses the shortest
/// round-trip decimal form.
pub fn format_number(n: f64) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Column name to cell value, in column order.
pub type Record = IndexMap<String, Scalar>;

static NULL: Scalar = Scalar::Null;

/// Value of `column` in `record`, treating a missing key as null.
pub fn cell<'a>(record: &'a Record, column: &str) -> &'a Scalar {
    record.get(column).unwrap_or(&NULL)
}

/// An immutable, ordered set of records together with the union of their column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawDataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RawDataset {
    pub fn new(records: Vec<Record>) -> Self {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                seen.insert(key.as_str());
            }
        }
        let columns = seen.into_iter().map(str::to_string).collect();
        Self { columns, records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the JSON objects of a snapshot's `sample_data`. Non-object entries are skipped.
    pub fn from_json_rows(rows: &[Value]) -> Self {
        let records = rows
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Scalar::from(v)))
                    .collect::<Record>()
            })
            .collect();
        Self::new(records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All values of one column in record order, nulls included.
    pub fn column_values<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a Scalar> + Clone + 'a {
        self.records.iter().map(move |r| cell(r, column))
    }
}
