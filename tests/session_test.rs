mod common;

use common::{ledger_snapshot, snapshot_with};
use finsight::service::{Locale, ServiceError, Snapshot};
use finsight::session::{FetchPurpose, FetchTicket};
use finsight::{
    Command, Completion, DashboardState, DashboardTab, Effect, MemorySessionFlag,
    SessionController, SessionFlag, SessionOptions,
};
use std::sync::Arc;

fn controller(flag_set: bool) -> (SessionController, Arc<MemorySessionFlag>) {
    let flag = Arc::new(MemorySessionFlag::new(flag_set));
    let session = SessionController::new(flag.clone(), Locale::En, SessionOptions::default());
    (session, flag)
}

fn only_fetch(effects: Vec<Effect>) -> FetchTicket {
    match effects.as_slice() {
        [Effect::FetchSnapshot { ticket, .. }] => *ticket,
        other => panic!("expected a single fetch, got {:?}", other),
    }
}

fn mount_loaded(session: &mut SessionController) {
    let ticket = only_fetch(session.handle(Command::Mount));
    assert_eq!(
        session.complete(ticket, Ok(ledger_snapshot())),
        Completion::Applied(vec![])
    );
    assert_eq!(session.state(), DashboardState::Loaded);
}

#[test]
fn test_unflagged_mount_loads() {
    let (mut session, flag) = controller(false);
    assert_eq!(session.state(), DashboardState::Uninitialized);

    let ticket = only_fetch(session.handle(Command::Mount));
    assert_eq!(ticket.purpose, FetchPurpose::Mount);
    assert_eq!(session.state(), DashboardState::Loading);
    assert!(session.is_busy());

    session.complete(ticket, Ok(ledger_snapshot()));
    assert_eq!(session.state(), DashboardState::Loaded);
    assert!(!flag.is_set());
    assert_eq!(session.dataset().map(|d| d.len()), Some(3));
    assert_eq!(session.report_id(), Some("report-7"));
    let schema = session.schema().unwrap();
    assert_eq!(schema.info.numeric_columns, vec!["amount", "qty"]);
    assert_eq!(schema.info.date_columns, vec!["date"]);
    assert_eq!(session.filter().selected_columns, schema.info.columns);
}

#[test]
fn test_flagged_mount_stays_empty_without_fetch() {
    let (mut session, flag) = controller(true);
    assert!(session.handle(Command::Mount).is_empty());
    assert_eq!(session.state(), DashboardState::Empty);
    assert!(!flag.is_set());
    assert!(!session.is_busy());
}

#[test]
fn test_flagged_mount_can_clear_remote() {
    let flag = Arc::new(MemorySessionFlag::new(true));
    let mut session = SessionController::new(
        flag,
        Locale::En,
        SessionOptions {
            clear_remote_on_refresh: true,
        },
    );
    assert_eq!(session.handle(Command::Mount), vec![Effect::ClearRemote]);
}

#[test]
fn test_no_data_and_failure_go_empty() {
    let (mut session, _) = controller(false);
    let ticket = only_fetch(session.handle(Command::Mount));
    session.complete(ticket, Ok(Snapshot::no_data()));
    assert_eq!(session.state(), DashboardState::Empty);
    assert!(session.last_error().is_none());

    let ticket = only_fetch(session.handle(Command::Mount));
    session.complete(
        ticket,
        Err(ServiceError::Status {
            code: 500,
            message: "boom".into(),
        }),
    );
    assert_eq!(session.state(), DashboardState::Empty);
    assert!(session.last_error().is_some());
    assert!(session.dataset().is_none());
}

#[test]
fn test_reset_blanks_until_next_upload() {
    let (mut session, flag) = controller(false);
    mount_loaded(&mut session);

    session.handle(Command::Reset);
    assert_eq!(session.state(), DashboardState::Empty);
    assert!(session.dataset().is_none());
    assert!(session.filter().selected_columns.is_empty());
    assert!(flag.is_set());

    // A refresh after the reset honors the flag.
    assert!(session.handle(Command::Mount).is_empty());
    assert_eq!(session.state(), DashboardState::Empty);

    // A later refresh fetches again; the flag was consumed.
    assert_eq!(only_fetch(session.handle(Command::Mount)).purpose, FetchPurpose::Mount);

    let ticket = only_fetch(session.handle(Command::UploadCompleted));
    assert_eq!(ticket.purpose, FetchPurpose::Upload);
    assert!(!session.is_in_flight(FetchPurpose::Mount));
    session.complete(ticket, Ok(ledger_snapshot()));
    assert_eq!(session.state(), DashboardState::Loaded);
}

#[test]
fn test_upload_clears_flag_and_supersedes_mount() {
    let (mut session, flag) = controller(false);
    let mount = only_fetch(session.handle(Command::Mount));
    flag.set();
    let upload = only_fetch(session.handle(Command::UploadCompleted));
    assert!(!flag.is_set());

    assert_eq!(session.complete(mount, Ok(Snapshot::no_data())), Completion::Stale);
    assert_eq!(session.state(), DashboardState::Loading);

    session.complete(upload, Ok(ledger_snapshot()));
    assert_eq!(session.state(), DashboardState::Loaded);
}

#[test]
fn test_duplicate_trigger_is_noop() {
    let (mut session, _) = controller(false);
    only_fetch(session.handle(Command::Mount));
    assert!(session.handle(Command::Mount).is_empty());
    only_fetch(session.handle(Command::UploadCompleted));
    assert!(session.handle(Command::UploadCompleted).is_empty());
}

#[test]
fn test_locale_change_refreshes_narrative_only() {
    let (mut session, _) = controller(false);
    mount_loaded(&mut session);
    session.handle(Command::SelectTab(DashboardTab::Data));
    session.handle(Command::SetSearch("sal".into()));
    session.handle(Command::SelectColumns(vec!["category".into(), "amount".into()]));
    let filter_before = session.filter().clone();
    let dataset_before = Arc::clone(session.dataset().unwrap());

    let ticket = only_fetch(session.handle(Command::ChangeLocale(Locale::Hi)));
    assert_eq!(ticket.purpose, FetchPurpose::LocaleRefresh);
    assert_eq!(ticket.locale, Locale::Hi);

    let mut translated = snapshot_with(common::ledger(), "राजस्व बढ़ा");
    translated.report_id = Some("report-8".into());
    session.complete(ticket, Ok(translated));

    assert_eq!(session.state(), DashboardState::Loaded);
    assert_eq!(session.tab(), DashboardTab::Data);
    assert_eq!(session.filter(), &filter_before);
    assert!(Arc::ptr_eq(session.dataset().unwrap(), &dataset_before));
    assert_eq!(
        session.narrative().and_then(|n| n.summary.as_deref()),
        Some("राजस्व बढ़ा")
    );
    assert_eq!(session.report_id(), Some("report-8"));
}

#[test]
fn test_locale_refresh_failure_keeps_data() {
    let (mut session, _) = controller(false);
    mount_loaded(&mut session);
    let ticket = only_fetch(session.handle(Command::ChangeLocale(Locale::Hi)));
    session.complete(ticket, Err(ServiceError::Transport("connection refused".into())));
    assert_eq!(session.state(), DashboardState::Loaded);
    assert!(session.dataset().is_some());
    assert!(session.last_error().is_some());
}

#[test]
fn test_locale_switch_during_mount_triggers_refresh() {
    let (mut session, _) = controller(false);
    let ticket = only_fetch(session.handle(Command::Mount));
    // Not loaded yet, so no refresh of its own.
    assert!(session.handle(Command::ChangeLocale(Locale::Hi)).is_empty());

    match session.complete(ticket, Ok(ledger_snapshot())) {
        Completion::Applied(effects) => {
            let refresh = only_fetch(effects);
            assert_eq!(refresh.purpose, FetchPurpose::LocaleRefresh);
            assert_eq!(refresh.locale, Locale::Hi);
        }
        Completion::Stale => panic!("mount result should apply"),
    }
}

#[test]
fn test_filter_commands_ignored_until_loaded() {
    let (mut session, _) = controller(false);
    session.handle(Command::SetSearch("x".into()));
    assert!(session.filter().search_term.is_empty());

    mount_loaded(&mut session);
    session.handle(Command::SetRange {
        column: "category".into(),
        min: 0.0,
        max: 1.0,
    });
    assert!(session.filter().range_filters.is_empty());

    session.handle(Command::SetRange {
        column: "amount".into(),
        min: 60.0,
        max: 20.0,
    });
    let range = session.filter().range_filters["amount"];
    assert_eq!((range.min, range.max), (20.0, 60.0));

    session.handle(Command::ClearRange("amount".into()));
    assert!(session.filter().range_filters.is_empty());

    session.handle(Command::ToggleColumn("qty".into()));
    assert!(!session.filter().is_selected("qty"));
}

#[test]
fn test_teardown_makes_late_completions_stale() {
    let (mut session, _) = controller(false);
    let ticket = only_fetch(session.handle(Command::Mount));
    session.handle(Command::Teardown);
    assert!(session.is_torn_down());
    assert_eq!(session.complete(ticket, Ok(ledger_snapshot())), Completion::Stale);
    assert_eq!(session.state(), DashboardState::Loading);
    assert!(session.handle(Command::Mount).is_empty());
}
