//! Column classification for datasets whose schema is only known at runtime.

use crate::dataset::{RawDataset, Scalar};
use crate::statistics::{compute_stats, ColumnStats};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Temporal,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Temporal => "date",
        }
    }
}

/// Inferred classification of a dataset's columns.
///
/// `numeric_columns`, `text_columns` and `date_columns` partition `columns`; each keeps the
/// dataset's column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub date_columns: Vec<String>,
}

impl ColumnInfo {
    pub fn total_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn numeric_count(&self) -> usize {
        self.numeric_columns.len()
    }

    pub fn text_count(&self) -> usize {
        self.text_columns.len()
    }

    pub fn date_count(&self) -> usize {
        self.date_columns.len()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|c| c == column)
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        if self.is_numeric(column) {
            Some(ColumnKind::Numeric)
        } else if self.date_columns.iter().any(|c| c == column) {
            Some(ColumnKind::Temporal)
        } else if self.text_columns.iter().any(|c| c == column) {
            Some(ColumnKind::Text)
        } else {
            None
        }
    }

    /// Position of `column` in display order.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Classify every column of `dataset`.
///
/// A column is numeric when every non-null value reads as a finite number, temporal when
/// every non-null value is a recognized date/time literal, otherwise text. The numeric test
/// runs first, so a column of bare years is numeric. Missing keys count as null.
pub fn infer(dataset: &RawDataset) -> ColumnInfo {
    let mut info = ColumnInfo {
        columns: dataset.columns().to_vec(),
        ..ColumnInfo::default()
    };
    for column in dataset.columns() {
        let kind = classify(dataset.column_values(column));
        let bucket = match kind {
            ColumnKind::Numeric => &mut info.numeric_columns,
            ColumnKind::Temporal => &mut info.date_columns,
            ColumnKind::Text => &mut info.text_columns,
        };
        bucket.push(column.clone());
    }
    info
}

fn classify<'a>(values: impl Iterator<Item = &'a Scalar> + Clone) -> ColumnKind {
    let mut non_null = values.filter(|v| !v.is_null());
    if non_null.clone().all(|v| v.as_f64().is_some()) {
        return ColumnKind::Numeric;
    }
    if non_null.all(|v| v.as_text().is_some_and(|s| parse_temporal(s).is_some())) {
        ColumnKind::Temporal
    } else {
        ColumnKind::Text
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d %b %Y", "%b %d, %Y",
];

/// Parse a date or date-time literal in one of the recognized layouts.
pub fn parse_temporal(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    // Month periods such as "2024-03".
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Schema and statistics derived together from one dataset generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSchema {
    pub info: ColumnInfo,
    pub stats: ColumnStats,
}

impl DatasetSchema {
    pub fn derive(dataset: &RawDataset) -> Self {
        let info = infer(dataset);
        let stats = compute_stats(dataset, &info.numeric_columns);
        Self { info, stats }
    }

    /// Numeric columns that have bounds and can therefore take a range filter.
    pub fn range_filterable_columns(&self) -> impl Iterator<Item = &str> {
        self.info
            .numeric_columns
            .iter()
            .map(String::as_str)
            .filter(|c| self.stats.get(c).is_some())
    }
}
