//! Derives the visible subset of a dataset from a [`FilterModel`].
//!
//! The pipeline is column projection, then range filtering, then text search. Each stage
//! only removes; record order is always the dataset's.

use crate::dataset::{cell, RawDataset, Record};
use crate::filter::{FilterModel, RangeFilter};
use crate::schema::ColumnInfo;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedView {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl ProjectedView {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn project(dataset: &RawDataset, info: &ColumnInfo, model: &FilterModel) -> ProjectedView {
    let columns = model.selected_columns.clone();

    // Ranges on columns that are no longer numeric, or no longer projected, do not apply.
    let ranges: Vec<(&str, &RangeFilter)> = model
        .range_filters
        .iter()
        .filter(|(c, _)| info.is_numeric(c) && model.is_selected(c))
        .map(|(c, r)| (c.as_str(), r))
        .collect();

    let needle = model.search_term.to_lowercase();

    let records = dataset
        .records()
        .iter()
        .map(|record| narrow(record, &columns))
        .filter(|record| passes_ranges(record, &ranges))
        .filter(|record| needle.is_empty() || matches_search(record, &needle))
        .collect();

    ProjectedView { columns, records }
}

fn narrow(record: &Record, columns: &[String]) -> Record {
    columns
        .iter()
        .map(|c| (c.clone(), cell(record, c).clone()))
        .collect()
}

fn passes_ranges(record: &Record, ranges: &[(&str, &RangeFilter)]) -> bool {
    ranges.iter().all(|(column, range)| {
        cell(record, column)
            .as_f64()
            .is_some_and(|v| range.contains(v))
    })
}

fn matches_search(record: &Record, needle: &str) -> bool {
    record
        .values()
        .any(|v| v.canonical_string().to_lowercase().contains(needle))
}

/// Memoizes the last projection.
///
/// A hit requires the very same dataset allocation and an equal filter model, so a
/// replaced dataset always recomputes even if its contents happen to match.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    entry: Option<CacheEntry>,
    hits: u64,
    misses: u64,
}

#[derive(Debug)]
struct CacheEntry {
    dataset: Arc<RawDataset>,
    model: FilterModel,
    view: Arc<ProjectedView>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        dataset: &Arc<RawDataset>,
        info: &ColumnInfo,
        model: &FilterModel,
    ) -> Arc<ProjectedView> {
        if let Some(entry) = &self.entry {
            if Arc::ptr_eq(&entry.dataset, dataset) && entry.model == *model {
                self.hits += 1;
                return Arc::clone(&entry.view);
            }
        }
        self.misses += 1;
        let view = Arc::new(project(dataset, info, model));
        tracing::trace!(rows = view.len(), columns = view.columns.len(), "projection recomputed");
        self.entry = Some(CacheEntry {
            dataset: Arc::clone(dataset),
            model: model.clone(),
            view: Arc::clone(&view),
        });
        view
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Scalar;
    use crate::schema::DatasetSchema;
    use serde_json::json;

    fn ledger() -> (RawDataset, DatasetSchema) {
        let ds = RawDataset::from_json_rows(&[
            json!({"category": "Sales", "amount": 10, "note": "q1"}),
            json!({"category": "Rent", "amount": 50, "note": ""}),
            json!({"category": "Payroll", "amount": 90, "note": "Wholesale"}),
        ]);
        let schema = DatasetSchema::derive(&ds);
        (ds, schema)
    }

    fn amounts(view: &ProjectedView) -> Vec<f64> {
        view.records
            .iter()
            .filter_map(|r| cell(r, "amount").as_f64())
            .collect()
    }

    #[test]
    fn test_seeded_model_is_identity() {
        let (ds, schema) = ledger();
        let view = project(&ds, &schema.info, &FilterModel::seeded(&schema.info));
        assert_eq!(view.columns, ds.columns());
        assert_eq!(view.records, ds.records());
    }

    #[test]
    fn test_range_is_inclusive() {
        let (ds, schema) = ledger();
        let mut model = FilterModel::seeded(&schema.info);
        model.set_range("amount", 20.0, 60.0, &schema).unwrap();
        assert_eq!(amounts(&project(&ds, &schema.info, &model)), vec![50.0]);

        model.set_range("amount", 10.0, 50.0, &schema).unwrap();
        assert_eq!(amounts(&project(&ds, &schema.info, &model)), vec![10.0, 50.0]);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let (ds, schema) = ledger();
        let mut model = FilterModel::seeded(&schema.info);
        model.set_search_term("sal");
        let view = project(&ds, &schema.info, &model);
        // "Sales" and "Wholesale" both match
        assert_eq!(amounts(&view), vec![10.0, 90.0]);

        model.set_search_term("50");
        assert_eq!(amounts(&project(&ds, &schema.info, &model)), vec![50.0]);
    }

    #[test]
    fn test_search_only_sees_projected_columns() {
        let (ds, schema) = ledger();
        let mut model = FilterModel::seeded(&schema.info);
        model.set_selected_columns(&["category", "amount"], &schema.info);
        model.set_search_term("wholesale");
        assert!(project(&ds, &schema.info, &model).is_empty());
    }

    #[test]
    fn test_range_on_unselected_column_is_ignored() {
        let (ds, schema) = ledger();
        let mut model = FilterModel::seeded(&schema.info);
        model.set_range("amount", 20.0, 60.0, &schema).unwrap();
        model.set_selected_columns(&["category"], &schema.info);
        let view = project(&ds, &schema.info, &model);
        assert_eq!(view.len(), 3);
        assert_eq!(view.columns, vec!["category"]);
    }

    #[test]
    fn test_range_excludes_nulls() {
        let ds = RawDataset::from_json_rows(&[json!({"v": 1}), json!({"v": null}), json!({"v": 3})]);
        let schema = DatasetSchema::derive(&ds);
        let mut model = FilterModel::seeded(&schema.info);
        model.set_range("v", 1.0, 3.0, &schema).unwrap();
        assert_eq!(project(&ds, &schema.info, &model).len(), 2);
    }

    #[test]
    fn test_empty_selection_keeps_empty_rows() {
        let (ds, schema) = ledger();
        let model = FilterModel {
            selected_columns: vec![],
            ..FilterModel::default()
        };
        let view = project(&ds, &schema.info, &model);
        assert!(view.columns.is_empty());
        assert_eq!(view.len(), 3);
        assert!(view.records.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn test_missing_column_projects_to_null() {
        let (ds, schema) = ledger();
        let model = FilterModel {
            selected_columns: vec!["ghost".into()],
            ..FilterModel::default()
        };
        let view = project(&ds, &schema.info, &model);
        assert!(view.records.iter().all(|r| r["ghost"] == Scalar::Null));
    }

    #[test]
    fn test_cache_keys_on_dataset_identity() {
        let (ds, schema) = ledger();
        let ds = Arc::new(ds);
        let model = FilterModel::seeded(&schema.info);
        let mut cache = ProjectionCache::new();
        let first = cache.get(&ds, &schema.info, &model);
        let second = cache.get(&ds, &schema.info, &model);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        let copy = Arc::new((*ds).clone());
        let third = cache.get(&copy, &schema.info, &model);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
        assert_eq!(cache.misses(), 2);

        let mut narrowed = model.clone();
        narrowed.set_search_term("rent");
        assert_eq!(cache.get(&copy, &schema.info, &narrowed).len(), 1);
        assert_eq!(cache.misses(), 3);
    }
}
