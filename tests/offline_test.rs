mod common;

use finsight::ingest::LocalDataService;
use finsight::service::{DataService, Locale, ServiceError};
use finsight::{Command, DashboardState, Effect, MemorySessionFlag, SessionController, SessionOptions};
use std::sync::Arc;
use tempfile::TempDir;

const LEDGER_CSV: &str = "\
Date,Description,Type,Amount
2024-03-01,Invoice 1001,Income,1200
2024-03-02,Office rent,Expense,400
2024-03-05,Invoice 1002,Income,800
2024-03-09,Payroll,Expense,900
";

/// Run every fetch effect against `service` until the session settles.
fn drive(session: &mut SessionController, service: &dyn DataService, effects: Vec<Effect>) {
    let mut pending = effects;
    while let Some(effect) = pending.pop() {
        if let Effect::FetchSnapshot { ticket, locale } = effect {
            let result = service.get_snapshot(locale, 1);
            if let finsight::Completion::Applied(more) = session.complete(ticket, result) {
                pending.extend(more);
            }
        }
    }
}

#[test]
fn test_offline_upload_loads_dashboard() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "march.csv", LEDGER_CSV);
    let service = LocalDataService::new(100);
    let mut session = SessionController::new(
        Arc::new(MemorySessionFlag::new(true)),
        Locale::En,
        SessionOptions::default(),
    );

    // Fresh start with the flag set: blank until something is uploaded.
    assert!(session.handle(Command::Mount).is_empty());
    assert_eq!(session.state(), DashboardState::Empty);

    let receipt = service.upload_dataset(&path, Locale::En, 1).unwrap();
    assert_eq!(receipt.rows, Some(4));

    let effects = session.handle(Command::UploadCompleted);
    drive(&mut session, &service, effects);

    assert_eq!(session.state(), DashboardState::Loaded);
    let schema = session.schema().unwrap();
    assert_eq!(schema.info.numeric_columns, vec!["Amount"]);
    assert_eq!(schema.info.date_columns, vec!["Date"]);
    assert_eq!(schema.stats.bounds("Amount"), Some((400.0, 1200.0)));

    let metrics = session.metrics().unwrap();
    assert_eq!(metrics.total_revenue, Some(2000.0));
    assert_eq!(metrics.total_expenses, Some(1300.0));
    assert_eq!(metrics.net_profit, Some(700.0));
    // Offline mode has no narrative.
    assert!(session.narrative().unwrap().summary.is_none());
}

#[test]
fn test_offline_sample_rows_limit() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "march.csv", LEDGER_CSV);
    let service = LocalDataService::new(2);
    service.upload_dataset(&path, Locale::Hi, 3).unwrap();

    let snapshot = service.get_snapshot(Locale::Hi, 3).unwrap();
    assert!(snapshot.has_data);
    assert_eq!(snapshot.records.len(), 2);

    // Other accounts see nothing.
    assert!(!service.get_snapshot(Locale::Hi, 4).unwrap().has_data);
}

#[test]
fn test_offline_clear_hides_dataset() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "march.csv", LEDGER_CSV);
    let service = LocalDataService::new(100);
    service.upload_dataset(&path, Locale::En, 1).unwrap();
    service.clear_dashboard(1).unwrap();
    assert!(!service.get_snapshot(Locale::En, 1).unwrap().has_data);
}

#[test]
fn test_offline_rejects_unsupported_files() {
    let dir = TempDir::new().unwrap();
    let path = common::write_file(dir.path(), "notes.txt", "hello");
    let service = LocalDataService::new(100);
    match service.upload_dataset(&path, Locale::En, 1) {
        Err(ServiceError::UnsupportedFormat(name)) => assert!(name.ends_with("notes.txt")),
        other => panic!("expected UnsupportedFormat, got {:?}", other.map(|r| r.rows)),
    }
}
