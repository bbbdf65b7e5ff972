mod common;

use common::{ledger_snapshot, Call, ScriptedService};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use finsight::service::{Benchmarks, CategoryAmount, WorkingCapital};
use finsight::{
    App, AppConfig, AppEvent, Command, DashboardState, DashboardTab, InputMode,
    MemorySessionFlag, SessionFlag, StatusMessage, Theme,
};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    app: App,
    rx: Receiver<AppEvent>,
    service: Arc<ScriptedService>,
    flag: Arc<MemorySessionFlag>,
}

impl Harness {
    fn new(flag_set: bool) -> Self {
        Self::with(flag_set, AppConfig::default(), ScriptedService::new())
    }

    fn with(flag_set: bool, config: AppConfig, service: ScriptedService) -> Self {
        let (tx, rx) = channel();
        let service = Arc::new(service);
        let flag = Arc::new(MemorySessionFlag::new(flag_set));
        let theme = Theme::from_config(&config.theme).unwrap();
        let app = App::new_with_config(tx, service.clone(), flag.clone(), theme, &config);
        Self {
            app,
            rx,
            service,
            flag,
        }
    }

    /// Feed the next event posted by a background worker back into the app.
    fn pump(&mut self) {
        let event = self
            .rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker did not report back");
        assert!(self.app.event(event).is_none());
    }

    fn key(&mut self, code: KeyCode) -> Option<AppEvent> {
        self.app
            .event(AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_str(&mut self, s: &str) {
        for c in s.chars() {
            self.key(KeyCode::Char(c));
        }
    }

    fn mount_loaded(&mut self) {
        self.service.push(Ok(ledger_snapshot()));
        self.app.event(AppEvent::Command(Command::Mount));
        self.pump();
        assert_eq!(self.app.session().state(), DashboardState::Loaded);
    }

    fn screen(&mut self) -> String {
        let area = Rect::new(0, 0, 110, 32);
        let mut buf = Buffer::empty(area);
        (&mut self.app).render(area, &mut buf);
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[test]
fn test_mount_fetches_in_configured_locale() {
    let mut h = Harness::new(false);
    h.mount_loaded();
    assert_eq!(h.service.calls(), vec![Call::Snapshot(finsight::Locale::Hi)]);
    assert!(!h.app.is_busy());
}

#[test]
fn test_flagged_start_renders_empty_dashboard() {
    let mut h = Harness::new(true);
    h.app.event(AppEvent::Command(Command::Mount));
    assert_eq!(h.app.session().state(), DashboardState::Empty);
    assert!(h.service.calls().is_empty());
    assert!(h.screen().contains("No data to show"));
}

#[test]
fn test_tabs_render_loaded_data() {
    let mut h = Harness::new(false);
    h.mount_loaded();

    let overview = h.screen();
    assert!(overview.contains("Key figures"));
    assert!(overview.contains("Revenue grew"));

    h.key(KeyCode::Char('2'));
    assert_eq!(h.app.session().tab(), DashboardTab::Data);
    let data = h.screen();
    assert!(data.contains("category"));
    assert!(data.contains("Salaries"));

    h.key(KeyCode::Tab);
    assert_eq!(h.app.session().tab(), DashboardTab::Insights);
    let insights = h.screen();
    assert!(insights.contains("Column statistics"));
    assert!(insights.contains("Cash runway under three months"));
}

#[test]
fn test_overview_shows_benchmarks_and_expenses() {
    let mut h = Harness::new(false);
    let mut snapshot = ledger_snapshot();
    snapshot.metrics.profit_margin = Some(6.7);
    snapshot.metrics.top_expenses = vec![
        CategoryAmount {
            category: "Salaries".to_string(),
            amount: 90.0,
        },
        CategoryAmount {
            category: "Rent".to_string(),
            amount: 50.0,
        },
    ];
    snapshot.narrative.benchmarks = Some(Benchmarks {
        profit_margin_avg: Some(15.0),
        ..Benchmarks::default()
    });
    snapshot.narrative.working_capital = Some(WorkingCapital {
        status: Some("Warning".to_string()),
        message: Some("Receivables are slow".to_string()),
    });
    h.service.push(Ok(snapshot));
    h.app.event(AppEvent::Command(Command::Mount));
    h.pump();

    let overview = h.screen();
    assert!(overview.contains("Industry benchmarks"));
    assert!(overview.contains("behind"));
    assert!(overview.contains("Top expenses"));
    assert!(overview.contains("Salaries"));
    assert!(overview.contains("Working capital"));
    assert!(overview.contains("Receivables are slow"));
}

#[test]
fn test_live_search_and_restore() {
    let mut h = Harness::new(false);
    h.mount_loaded();
    h.key(KeyCode::Char('2'));

    h.key(KeyCode::Char('/'));
    assert_eq!(h.app.input_mode(), InputMode::Search);
    h.type_str("rent");
    assert_eq!(h.app.session().filter().search_term, "rent");
    assert_eq!(h.app.projected().map(|(v, _)| v.len()), Some(1));

    // Esc puts back the term that was active before the prompt opened.
    h.key(KeyCode::Esc);
    assert_eq!(h.app.input_mode(), InputMode::Normal);
    assert_eq!(h.app.session().filter().search_term, "");

    h.key(KeyCode::Char('/'));
    h.type_str("sal");
    h.key(KeyCode::Enter);
    assert_eq!(h.app.session().filter().search_term, "sal");
    assert_eq!(h.app.projected().map(|(v, _)| v.len()), Some(2));

    // Esc in normal mode clears the search.
    h.key(KeyCode::Esc);
    assert_eq!(h.app.projected().map(|(v, _)| v.len()), Some(3));
}

#[test]
fn test_column_picker_and_range_editor() {
    let mut h = Harness::new(false);
    h.mount_loaded();
    h.key(KeyCode::Char('2'));

    h.key(KeyCode::Char('c'));
    assert_eq!(h.app.input_mode(), InputMode::ColumnPicker);
    h.key(KeyCode::Char(' '));
    h.key(KeyCode::Esc);
    assert!(!h.app.session().filter().is_selected("date"));

    h.key(KeyCode::Char('f'));
    assert_eq!(h.app.input_mode(), InputMode::Range);
    // Leftmost visible column is text, so the editor opens on the first numeric one.
    h.app.event(AppEvent::Key(KeyEvent::new(
        KeyCode::Char('u'),
        KeyModifiers::CONTROL,
    )));
    h.type_str("40");
    h.key(KeyCode::Enter);
    assert_eq!(h.app.input_mode(), InputMode::Normal);

    let range = h.app.session().filter().range_filters["amount"];
    assert_eq!((range.min, range.max), (40.0, 90.0));
    assert_eq!(h.app.projected().map(|(v, _)| v.len()), Some(2));
}

#[test]
fn test_upload_then_refetch() {
    let mut h = Harness::new(true);
    h.app.event(AppEvent::Command(Command::Mount));
    assert_eq!(h.app.session().state(), DashboardState::Empty);

    h.service.push(Ok(ledger_snapshot()));
    h.app.event(AppEvent::Upload(PathBuf::from("q1.csv")));
    assert!(h.app.is_busy());
    h.pump(); // upload finished
    h.pump(); // snapshot fetched

    assert_eq!(h.app.session().state(), DashboardState::Loaded);
    assert!(!h.flag.is_set());
    assert_eq!(
        h.service.calls(),
        vec![
            Call::Upload(PathBuf::from("q1.csv")),
            Call::Snapshot(finsight::Locale::Hi)
        ]
    );
    assert!(matches!(h.app.status(), Some(StatusMessage::Info(msg)) if msg.contains("q1.csv")));
}

#[test]
fn test_upload_waits_for_remote_clear() {
    let mut config = AppConfig::default();
    config.service.clear_remote_on_refresh = true;
    let service = ScriptedService::with_clear_delay(Duration::from_millis(200));
    let mut h = Harness::with(true, config, service);

    // Startup order of `run`: mount first, then the --upload file.
    h.app.event(AppEvent::Command(Command::Mount));
    h.service.push(Ok(ledger_snapshot()));
    h.app.event(AppEvent::Upload(PathBuf::from("q1.csv")));
    assert!(h.app.is_busy());
    assert!(matches!(h.app.status(), Some(StatusMessage::Info(msg)) if msg.contains("Clearing")));

    h.pump(); // clear finished, queued upload starts
    h.pump(); // upload finished
    h.pump(); // snapshot fetched

    assert_eq!(
        h.service.calls(),
        vec![
            Call::Clear,
            Call::Upload(PathBuf::from("q1.csv")),
            Call::Snapshot(finsight::Locale::Hi)
        ]
    );
    assert_eq!(h.app.session().state(), DashboardState::Loaded);
    assert!(!h.app.is_busy());
}

#[test]
fn test_upload_rejects_unknown_extension() {
    let mut h = Harness::new(false);
    h.app.event(AppEvent::Upload(PathBuf::from("notes.txt")));
    assert!(!h.app.is_busy());
    assert!(h.service.calls().is_empty());
    assert!(matches!(h.app.status(), Some(StatusMessage::Error(msg)) if msg.contains(".csv")));
}

#[test]
fn test_locale_toggle_refreshes() {
    let mut h = Harness::new(false);
    h.mount_loaded();
    h.service.push(Ok(common::snapshot_with(common::ledger(), "Revenue grew (en)")));

    h.key(KeyCode::Char('l'));
    assert_eq!(h.app.session().locale(), finsight::Locale::En);
    h.pump();
    assert_eq!(
        h.app.session().narrative().and_then(|n| n.summary.as_deref()),
        Some("Revenue grew (en)")
    );
    assert_eq!(h.app.session().state(), DashboardState::Loaded);
}

#[test]
fn test_reset_requires_confirmation() {
    let mut h = Harness::new(false);
    h.mount_loaded();

    h.key(KeyCode::Char('R'));
    assert_eq!(h.app.input_mode(), InputMode::ConfirmReset);
    h.key(KeyCode::Enter); // "No" is focused by default
    assert_eq!(h.app.session().state(), DashboardState::Loaded);

    h.key(KeyCode::Char('R'));
    h.key(KeyCode::Char('y'));
    assert_eq!(h.app.session().state(), DashboardState::Empty);
    assert!(h.flag.is_set());

    // Refresh after a reset is not offered until there is data or an error.
    h.key(KeyCode::Char('r'));
    assert!(!h.app.is_busy());
}

#[test]
fn test_quit_tears_down() {
    let mut h = Harness::new(false);
    h.app.event(AppEvent::Command(Command::Mount));
    assert!(matches!(h.key(KeyCode::Char('q')), Some(AppEvent::Exit)));
    assert!(h.app.session().is_torn_down());

    // The mount fetch still reports back, but it no longer applies.
    h.pump();
    assert_eq!(h.app.session().state(), DashboardState::Loading);
}
