//! The user's current narrowing of the dataset: column selection, numeric ranges and search.

use crate::schema::{ColumnInfo, DatasetSchema};
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Inclusive numeric bounds on one column. `min <= max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("column '{0}' has no values to filter on")]
    NoStatistics(String),
    #[error("range bounds must be finite numbers")]
    NonFinite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterModel {
    pub selected_columns: Vec<String>,
    pub range_filters: IndexMap<String, RangeFilter>,
    pub search_term: String,
}

impl FilterModel {
    /// All columns selected, no ranges, empty search.
    pub fn seeded(info: &ColumnInfo) -> Self {
        Self {
            selected_columns: info.columns.clone(),
            ..Self::default()
        }
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.selected_columns.iter().any(|c| c == column)
    }

    /// Replace the projection. Unknown columns are dropped and duplicates keep their first
    /// position.
    pub fn set_selected_columns<S: AsRef<str>>(&mut self, columns: &[S], info: &ColumnInfo) {
        let mut selected: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns.iter().map(AsRef::as_ref) {
            if info.contains(column) && !selected.iter().any(|c| c == column) {
                selected.push(column.to_string());
            }
        }
        self.selected_columns = selected;
    }

    /// Flip one column in or out of the selection. A column coming back in takes its
    /// schema position relative to the other selected columns.
    pub fn toggle_column(&mut self, column: &str, info: &ColumnInfo) {
        if let Some(idx) = self.selected_columns.iter().position(|c| c == column) {
            self.selected_columns.remove(idx);
            return;
        }
        let Some(pos) = info.position(column) else {
            return;
        };
        let insert_at = self
            .selected_columns
            .iter()
            .position(|c| info.position(c).is_some_and(|p| p > pos))
            .unwrap_or(self.selected_columns.len());
        self.selected_columns.insert(insert_at, column.to_string());
    }

    /// Constrain `column` to `[min, max]`.
    ///
    /// Bounds outside the column's observed range are clamped into it, and inverted bounds
    /// are swapped. Returns the stored filter.
    pub fn set_range(
        &mut self,
        column: &str,
        min: f64,
        max: f64,
        schema: &DatasetSchema,
    ) -> Result<RangeFilter, FilterError> {
        if !schema.info.is_numeric(column) {
            return Err(FilterError::NotNumeric(column.to_string()));
        }
        let (lo, hi) = schema
            .stats
            .bounds(column)
            .ok_or_else(|| FilterError::NoStatistics(column.to_string()))?;
        if !min.is_finite() || !max.is_finite() {
            return Err(FilterError::NonFinite);
        }
        let (mut min, mut max) = (min.clamp(lo, hi), max.clamp(lo, hi));
        if min > max {
            std::mem::swap(&mut min, &mut max);
        }
        let filter = RangeFilter { min, max };
        self.range_filters.insert(column.to_string(), filter);
        Ok(filter)
    }

    pub fn clear_range(&mut self, column: &str) -> Option<RangeFilter> {
        self.range_filters.shift_remove(column)
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    /// Whether anything narrows the seeded view.
    pub fn is_narrowed(&self, info: &ColumnInfo) -> bool {
        !self.range_filters.is_empty()
            || !self.search_term.is_empty()
            || self.selected_columns != info.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawDataset;
    use serde_json::json;

    fn schema() -> DatasetSchema {
        DatasetSchema::derive(&RawDataset::from_json_rows(&[
            json!({"date": "2024-01-01", "category": "Sales", "amount": 10, "empty": ""}),
            json!({"date": "2024-01-02", "category": "Rent", "amount": 90, "empty": ""}),
        ]))
    }

    #[test]
    fn test_seeded_selects_everything() {
        let s = schema();
        let model = FilterModel::seeded(&s.info);
        assert_eq!(model.selected_columns, s.info.columns);
        assert!(model.range_filters.is_empty());
        assert!(model.search_term.is_empty());
        assert!(!model.is_narrowed(&s.info));
    }

    #[test]
    fn test_set_selected_columns_drops_unknown_and_duplicates() {
        let s = schema();
        let mut model = FilterModel::seeded(&s.info);
        model.set_selected_columns(&["amount", "bogus", "date", "amount"], &s.info);
        assert_eq!(model.selected_columns, vec!["amount", "date"]);
        assert!(model.is_narrowed(&s.info));
    }

    #[test]
    fn test_toggle_column_restores_schema_position() {
        let s = schema();
        let mut model = FilterModel::seeded(&s.info);
        model.toggle_column("category", &s.info);
        assert_eq!(model.selected_columns, vec!["date", "amount", "empty"]);
        model.toggle_column("category", &s.info);
        assert_eq!(model.selected_columns, s.info.columns);
        model.toggle_column("nope", &s.info);
        assert_eq!(model.selected_columns, s.info.columns);
    }

    #[test]
    fn test_set_range_clamps_and_swaps() {
        let s = schema();
        let mut model = FilterModel::seeded(&s.info);
        let f = model.set_range("amount", 70.0, -5.0, &s).unwrap();
        assert_eq!(f, RangeFilter { min: 10.0, max: 70.0 });
        let f = model.set_range("amount", 0.0, 1000.0, &s).unwrap();
        assert_eq!(f, RangeFilter { min: 10.0, max: 90.0 });
        assert_eq!(model.range_filters.len(), 1);
        assert_eq!(model.clear_range("amount"), Some(f));
        assert!(model.range_filters.is_empty());
    }

    #[test]
    fn test_set_range_rejections() {
        let s = schema();
        let mut model = FilterModel::seeded(&s.info);
        assert_eq!(
            model.set_range("category", 0.0, 1.0, &s),
            Err(FilterError::NotNumeric("category".into()))
        );
        assert_eq!(
            model.set_range("empty", 0.0, 1.0, &s),
            Err(FilterError::NoStatistics("empty".into()))
        );
        assert_eq!(
            model.set_range("amount", f64::NAN, 1.0, &s),
            Err(FilterError::NonFinite)
        );
        assert!(model.range_filters.is_empty());
    }

    #[test]
    fn test_search_term_stored_verbatim() {
        let mut model = FilterModel::default();
        model.set_search_term("  Sal ");
        assert_eq!(model.search_term, "  Sal ");
    }
}
