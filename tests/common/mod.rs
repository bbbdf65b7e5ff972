#![allow(dead_code)]

use finsight::dataset::RawDataset;
use finsight::service::{
    AccountId, DataService, FinancialMetrics, Locale, Narrative, Risk, ServiceError, Snapshot,
    UploadReceipt,
};
use serde_json::json;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Rows used throughout the tests: a small ledger with one text, one date and two numeric columns.
pub fn ledger() -> RawDataset {
    RawDataset::from_json_rows(&[
        json!({"date": "2024-01-05", "category": "Sales", "amount": 10, "qty": 1}),
        json!({"date": "2024-01-12", "category": "Rent", "amount": 50, "qty": 2}),
        json!({"date": "2024-02-01", "category": "Salaries", "amount": 90, "qty": 3}),
    ])
}

pub fn snapshot_with(records: RawDataset, summary: &str) -> Snapshot {
    Snapshot {
        has_data: true,
        report_id: Some("report-7".to_string()),
        records,
        metrics: FinancialMetrics {
            total_revenue: Some(150.0),
            total_expenses: Some(140.0),
            net_profit: Some(10.0),
            ..FinancialMetrics::default()
        },
        narrative: Narrative {
            health_score: Some(72.0),
            status: Some("Stable".to_string()),
            summary: Some(summary.to_string()),
            risks: vec![Risk {
                kind: Some("liquidity".to_string()),
                severity: Some("high".to_string()),
                message: "Cash runway under three months".to_string(),
            }],
            ..Narrative::default()
        },
    }
}

pub fn ledger_snapshot() -> Snapshot {
    snapshot_with(ledger(), "Revenue grew")
}

/// What a scripted service was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Snapshot(Locale),
    Upload(PathBuf),
    Clear,
}

/// In-memory [`DataService`] that answers snapshot requests from a queue.
///
/// With an empty queue every snapshot request answers "no data".
#[derive(Default)]
pub struct ScriptedService {
    snapshots: Mutex<VecDeque<Result<Snapshot, ServiceError>>>,
    calls: Mutex<Vec<Call>>,
    clear_delay: Option<Duration>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `clear_dashboard` take `delay` before it answers.
    pub fn with_clear_delay(delay: Duration) -> Self {
        Self {
            clear_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, result: Result<Snapshot, ServiceError>) {
        self.snapshots.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl DataService for ScriptedService {
    fn get_snapshot(&self, locale: Locale, _account: AccountId) -> Result<Snapshot, ServiceError> {
        self.calls.lock().unwrap().push(Call::Snapshot(locale));
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Snapshot::no_data()))
    }

    fn upload_dataset(
        &self,
        path: &Path,
        _locale: Locale,
        _account: AccountId,
    ) -> Result<UploadReceipt, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Upload(path.to_path_buf()));
        Ok(UploadReceipt {
            upload_id: Some("up-1".to_string()),
            rows: Some(3),
        })
    }

    fn clear_dashboard(&self, _account: AccountId) -> Result<(), ServiceError> {
        if let Some(delay) = self.clear_delay {
            std::thread::sleep(delay);
        }
        self.calls.lock().unwrap().push(Call::Clear);
        Ok(())
    }
}

/// Write `contents` to `name` inside `dir` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}
