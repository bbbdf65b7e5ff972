//! Offline mode: read spreadsheets on this machine instead of uploading them.
//!
//! CSV goes through polars, Excel through calamine. Only the first `sample_rows` rows are
//! kept, which is all the backend ever returns for exploration.

use crate::dataset::{RawDataset, Record, Scalar};
use crate::service::{
    AccountId, CategoryAmount, DataService, FinancialMetrics, Locale, ServiceError, Snapshot,
    UploadReceipt,
};
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use finsight_cli::SpreadsheetFormat;
use indexmap::IndexMap;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Read the first `sample_rows` data rows of a CSV or Excel file.
pub fn read_spreadsheet(path: &Path, sample_rows: usize) -> Result<RawDataset, ServiceError> {
    let format = SpreadsheetFormat::from_path(path)
        .ok_or_else(|| ServiceError::UnsupportedFormat(path.display().to_string()))?;
    if !path.exists() {
        return Err(ServiceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let dataset = match format {
        SpreadsheetFormat::Csv => read_csv(path, sample_rows)?,
        SpreadsheetFormat::Excel => read_excel(path, sample_rows)?,
    };
    tracing::debug!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "spreadsheet ingested"
    );
    Ok(dataset)
}

fn read_csv(path: &Path, sample_rows: usize) -> Result<RawDataset, ServiceError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_n_rows(Some(sample_rows))
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    dataframe_to_dataset(&df)
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Convert a frame column by column. Numeric columns become numbers, everything else text.
pub fn dataframe_to_dataset(df: &DataFrame) -> Result<RawDataset, ServiceError> {
    let height = df.height();
    let mut columns: Vec<(String, Vec<Scalar>)> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().trim().to_string();
        let series = column.as_materialized_series();
        let values: Vec<Scalar> = if is_numeric_dtype(series.dtype()) {
            series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(Scalar::from)
                .collect()
        } else {
            series
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(Scalar::from)
                .collect()
        };
        columns.push((name, values));
    }

    let records = (0..height)
        .map(|row| {
            columns
                .iter()
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect::<Record>()
        })
        .collect();
    Ok(RawDataset::new(records))
}

fn read_excel(path: &Path, sample_rows: usize) -> Result<RawDataset, ServiceError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ServiceError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ServiceError::Spreadsheet("workbook has no worksheets".into()))?
        .map_err(|e| ServiceError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawDataset::empty());
    };
    let headers = header_names(
        header_row
            .iter()
            .map(|c| c.as_string().unwrap_or_else(|| c.to_string())),
    );

    let records = rows
        .take(sample_rows)
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, h)| (h.clone(), row.get(idx).map(excel_cell).unwrap_or(Scalar::Null)))
                .collect::<Record>()
        })
        .collect();
    Ok(RawDataset::new(records))
}

/// Trimmed, unique column names: blanks become `column_N`, repeats get `_2`, `_3`, ...
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    raw.enumerate()
        .map(|(idx, h)| {
            let h = h.trim();
            let base = if h.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                h.to_string()
            };
            let mut name = base.clone();
            let mut n = 2;
            while taken.contains(&name) {
                name = format!("{base}_{n}");
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

fn excel_cell(cell: &Data) -> Scalar {
    match cell {
        Data::Empty | Data::Error(_) => Scalar::Null,
        Data::Int(i) => Scalar::from(*i),
        Data::Float(f) => Scalar::from(*f),
        Data::String(s) => Scalar::from(s.as_str()),
        Data::Bool(b) => Scalar::Text(b.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Scalar::from(s.as_str()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => {
                Scalar::Text(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => Scalar::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Scalar::Null,
        },
    }
}

const AMOUNT_KEYWORDS: &[&str] = &["amount", "total", "value", "price", "amt", "sum", "debit", "credit"];
const TYPE_KEYWORDS: &[&str] = &["type", "dr_cr", "credit_debit", "income_expense", "transaction_type"];
const INCOME_KEYWORDS: &[&str] = &["income", "revenue", "credit", "receipt", "sale"];
const CATEGORY_KEYWORDS: &[&str] = &["category", "head", "account", "particulars", "description"];
const TOP_EXPENSES: usize = 5;

fn normalize_header(h: &str) -> String {
    h.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['$', '₹', '%', '(', ')'], "")
}

/// Find the column matching `keywords`: an exact header first, then a header containing one.
fn find_column<'a>(columns: &'a [String], keywords: &[&str]) -> Option<&'a str> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_header(c)).collect();
    keywords
        .iter()
        .find_map(|kw| normalized.iter().position(|c| c == kw))
        .or_else(|| {
            normalized
                .iter()
                .position(|c| keywords.iter().any(|kw| c.contains(kw)))
        })
        .map(|idx| columns[idx].as_str())
}

fn parse_amount(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Text(s) => s.replace(['$', ',', '₹'], "").trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
    .filter(|v| v.is_finite())
}

/// Headline revenue and expense figures from a transaction-style sheet.
///
/// Rows are income when a type column says so, or by sign when there is no type column.
/// Returns empty metrics when no amount column can be found.
pub fn derive_metrics(dataset: &RawDataset) -> FinancialMetrics {
    let Some(amount_col) = find_column(dataset.columns(), AMOUNT_KEYWORDS) else {
        return FinancialMetrics::default();
    };
    let type_col = find_column(dataset.columns(), TYPE_KEYWORDS).filter(|c| *c != amount_col);
    let category_col = find_column(dataset.columns(), CATEGORY_KEYWORDS)
        .filter(|c| *c != amount_col && Some(*c) != type_col);

    let mut revenue = 0.0;
    let mut expenses = 0.0;
    let mut by_category: IndexMap<String, f64> = IndexMap::new();
    for record in dataset.records() {
        let Some(amount) = record.get(amount_col).and_then(parse_amount) else {
            continue;
        };
        let is_income = match type_col {
            Some(col) => {
                let kind = record.get(col).map(Scalar::canonical_string).unwrap_or_default();
                let kind = kind.to_lowercase();
                INCOME_KEYWORDS.iter().any(|k| kind.contains(k))
            }
            None => amount > 0.0,
        };
        if is_income {
            revenue += amount;
        } else {
            expenses += amount.abs();
            if let Some(col) = category_col {
                let category = record.get(col).map(Scalar::canonical_string).unwrap_or_default();
                let category = if category.is_empty() { "Uncategorized".to_string() } else { category };
                *by_category.entry(category).or_default() += amount.abs();
            }
        }
    }
    // Stable sort keeps first-seen order among equal totals.
    by_category.sort_by(|_, a, _, b| b.total_cmp(a));
    let top_expenses = by_category
        .into_iter()
        .take(TOP_EXPENSES)
        .map(|(category, amount)| CategoryAmount { category, amount })
        .collect();

    let net = revenue - expenses;
    let (margin, ratio) = if revenue > 0.0 {
        (net * 100.0 / revenue, expenses * 100.0 / revenue)
    } else {
        (0.0, 0.0)
    };
    FinancialMetrics {
        total_revenue: Some(revenue),
        total_expenses: Some(expenses),
        net_profit: Some(net),
        profit_margin: Some(margin),
        expense_ratio: Some(ratio),
        top_expenses,
        ..FinancialMetrics::default()
    }
}

/// A [`DataService`] that keeps the latest ingested sheet per account in memory.
#[derive(Debug)]
pub struct LocalDataService {
    sample_rows: usize,
    datasets: Mutex<HashMap<AccountId, RawDataset>>,
}

impl LocalDataService {
    pub fn new(sample_rows: usize) -> Self {
        Self {
            sample_rows: sample_rows.max(1),
            datasets: Mutex::new(HashMap::new()),
        }
    }

    fn with_datasets<T>(&self, f: impl FnOnce(&mut HashMap<AccountId, RawDataset>) -> T) -> T {
        let mut guard = match self.datasets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Default for LocalDataService {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_ROWS)
    }
}

impl DataService for LocalDataService {
    fn get_snapshot(&self, _locale: Locale, account: AccountId) -> Result<Snapshot, ServiceError> {
        let Some(records) = self.with_datasets(|d| d.get(&account).cloned()) else {
            return Ok(Snapshot::no_data());
        };
        Ok(Snapshot {
            has_data: true,
            report_id: None,
            metrics: derive_metrics(&records),
            records,
            narrative: Default::default(),
        })
    }

    fn upload_dataset(
        &self,
        path: &Path,
        _locale: Locale,
        account: AccountId,
    ) -> Result<UploadReceipt, ServiceError> {
        let dataset = read_spreadsheet(path, self.sample_rows)?;
        let rows = dataset.len();
        self.with_datasets(|d| d.insert(account, dataset));
        Ok(UploadReceipt {
            upload_id: None,
            rows: Some(rows),
        })
    }

    fn clear_dashboard(&self, account: AccountId) -> Result<(), ServiceError> {
        self.with_datasets(|d| d.remove(&account));
        Ok(())
    }
}
