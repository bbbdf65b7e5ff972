use crate::dataset::RawDataset;
use indexmap::IndexMap;
use serde::Serialize;

/// Summary of one numeric column over its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

/// Per-numeric-column bounds, in column order.
///
/// Columns with no non-null values have no entry; they cannot carry a range filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnStats {
    columns: IndexMap<String, NumericSummary>,
}

impl ColumnStats {
    pub fn get(&self, column: &str) -> Option<&NumericSummary> {
        self.columns.get(column)
    }

    /// `(min, max)` for `column`.
    pub fn bounds(&self, column: &str) -> Option<(f64, f64)> {
        self.get(column).map(|s| (s.min, s.max))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NumericSummary)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Compute min, max, mean and count for each of `numeric_columns`.
pub fn compute_stats(dataset: &RawDataset, numeric_columns: &[String]) -> ColumnStats {
    let mut columns = IndexMap::new();
    for column in numeric_columns {
        if let Some(summary) = summarize(dataset.column_values(column).filter_map(|v| v.as_f64()))
        {
            columns.insert(column.clone(), summary);
        }
    }
    ColumnStats { columns }
}

fn summarize(values: impl Iterator<Item = f64>) -> Option<NumericSummary> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(NumericSummary {
        min,
        max,
        mean: sum / count as f64,
        count,
    })
}

/// One cell of a correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationCell {
    pub x: String,
    pub y: String,
    pub value: f64,
}

/// Pairwise Pearson correlation for every ordered pair of `numeric_columns`.
///
/// Each pair uses only the rows where both values are present. Pairs with fewer than two
/// shared rows or zero variance report 0. Needs at least two columns; otherwise empty.
pub fn correlation_matrix(dataset: &RawDataset, numeric_columns: &[String]) -> Vec<CorrelationCell> {
    if numeric_columns.len() < 2 {
        return Vec::new();
    }
    let n = numeric_columns.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                1.0
            } else {
                pearson(dataset, &numeric_columns[i], &numeric_columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    let mut out = Vec::with_capacity(n * n);
    for (i, x) in numeric_columns.iter().enumerate() {
        for (j, y) in numeric_columns.iter().enumerate() {
            out.push(CorrelationCell {
                x: x.clone(),
                y: y.clone(),
                value: values[i][j],
            });
        }
    }
    out
}

fn pearson(dataset: &RawDataset, a: &str, b: &str) -> f64 {
    let pairs: Vec<(f64, f64)> = dataset
        .column_values(a)
        .zip(dataset.column_values(b))
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }
    let len = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / len;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / len;

    let numerator: f64 = pairs
        .iter()
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    let var_a: f64 = pairs.iter().map(|(x, _)| (x - mean_a).powi(2)).sum();
    let var_b: f64 = pairs.iter().map(|(_, y)| (y - mean_b).powi(2)).sum();

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    numerator / (var_a.sqrt() * var_b.sqrt())
}

/// The strongest off-diagonal correlations, one entry per unordered pair, strongest first.
pub fn strongest_correlations(cells: &[CorrelationCell], limit: usize) -> Vec<&CorrelationCell> {
    let mut pairs: Vec<&CorrelationCell> = cells.iter().filter(|c| c.x < c.y).collect();
    pairs.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    pairs.truncate(limit);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_bounds_cover_values() {
        let ds = RawDataset::from_json_rows(&[
            json!({"amount": 10, "tax": "1.5"}),
            json!({"amount": 90, "tax": null}),
            json!({"amount": 50, "tax": "0.5"}),
        ]);
        let stats = compute_stats(&ds, &["amount".to_string(), "tax".to_string()]);
        let amount = stats.get("amount").unwrap();
        assert_eq!((amount.min, amount.max, amount.count), (10.0, 90.0, 3));
        assert!((amount.mean - 50.0).abs() < 1e-9);
        assert_eq!(stats.bounds("tax"), Some((0.5, 1.5)));
        for (col, s) in stats.iter() {
            assert!(s.min <= s.max);
            for v in ds.column_values(col).filter_map(|v| v.as_f64()) {
                assert!(s.min <= v && v <= s.max);
            }
        }
    }

    #[test]
    fn test_stats_skip_columns_without_values() {
        let ds = RawDataset::from_json_rows(&[json!({"a": null}), json!({"a": ""})]);
        let stats = compute_stats(&ds, &["a".to_string()]);
        assert!(stats.is_empty());
        assert_eq!(stats.bounds("a"), None);
    }

    #[test]
    fn test_correlation_matrix() {
        let rows: Vec<_> = (0..20)
            .map(|i| json!({"x": i, "y": 2 * i + 5, "z": -3 * i, "flat": 1}))
            .collect();
        let ds = RawDataset::from_json_rows(&rows);
        let cols: Vec<String> = ["x", "y", "z", "flat"].iter().map(|s| s.to_string()).collect();
        let cells = correlation_matrix(&ds, &cols);
        assert_eq!(cells.len(), 16);
        let get = |x: &str, y: &str| {
            cells
                .iter()
                .find(|c| c.x == x && c.y == y)
                .map(|c| c.value)
                .unwrap()
        };
        assert!((get("x", "x") - 1.0).abs() < 1e-9);
        assert!((get("x", "y") - 1.0).abs() < 1e-9);
        assert!((get("x", "z") + 1.0).abs() < 1e-9);
        assert_eq!(get("x", "y"), get("y", "x"));
        assert_eq!(get("x", "flat"), 0.0);

        let top = strongest_correlations(&cells, 2);
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|c| c.value.abs() > 0.99));
    }

    #[test]
    fn test_correlation_needs_two_columns() {
        let ds = RawDataset::from_json_rows(&[json!({"x": 1}), json!({"x": 2})]);
        assert!(correlation_matrix(&ds, &["x".to_string()]).is_empty());
    }
}
