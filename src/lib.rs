use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::{Clear, Widget};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

pub mod cache;
pub mod column_picker_modal;
pub mod config;
pub mod dataset;
pub mod error_display;
pub mod filter;
pub mod help_strings;
pub mod ingest;
pub mod projector;
pub mod range_modal;
pub mod render;
pub mod schema;
pub mod service;
pub mod session;
pub mod statistics;
pub mod widgets;

pub use cache::CacheManager;
pub use config::{AppConfig, ConfigManager, Theme};
pub use service::{DataService, Locale};
pub use session::{
    Command, Completion, DashboardState, DashboardTab, Effect, MemorySessionFlag, SessionController,
    SessionFlag, SessionOptions,
};

use crate::column_picker_modal::{ColumnPickerModal, PickerAction};
use crate::config::DisplayConfig;
use crate::dataset::RawDataset;
use crate::error_display::user_message;
use crate::projector::{ProjectedView, ProjectionCache};
use crate::range_modal::{RangeAction, RangeModal};
use crate::schema::DatasetSchema;
use crate::service::{AccountId, ServiceError, Snapshot, UploadReceipt};
use crate::session::{FetchPurpose, FetchTicket};
use crate::statistics::{correlation_matrix, CorrelationCell};
use crate::widgets::datatable::DataTableState;
use crate::widgets::text_input::{TextInput, TextInputEvent};
use finsight_cli::SpreadsheetFormat;

/// Application name used for config and cache directories
pub const APP_NAME: &str = "finsight";

/// Rows moved by PageUp / PageDown.
const PAGE_ROWS: usize = 10;

pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// A session command from outside the key handler (start-up mount, tests).
    Command(Command),
    Upload(PathBuf),
    FetchDone {
        ticket: FetchTicket,
        result: Result<Snapshot, ServiceError>,
    },
    UploadDone {
        path: PathBuf,
        result: Result<UploadReceipt, ServiceError>,
    },
    ClearDone(Result<(), ServiceError>),
    Exit,
    Crash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Search,
    Upload,
    ColumnPicker,
    Range,
    ConfirmReset,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

/// Options that only apply to one run of the dashboard.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Spreadsheet uploaded as soon as the dashboard is up.
    pub upload: Option<PathBuf>,
    pub debug: bool,
}

impl From<&finsight_cli::Args> for RunOptions {
    fn from(args: &finsight_cli::Args) -> Self {
        Self {
            upload: args.upload.clone(),
            debug: args.debug,
        }
    }
}

pub struct App {
    events: Sender<AppEvent>,
    service: Arc<dyn DataService>,
    account: AccountId,
    pub(crate) session: SessionController,
    pub(crate) projection: ProjectionCache,
    pub(crate) table: DataTableState,
    pub(crate) input_mode: InputMode,
    pub(crate) search_input: TextInput,
    search_before: String,
    pub(crate) upload_input: TextInput,
    pub(crate) column_picker: ColumnPickerModal,
    pub(crate) range_modal: RangeModal,
    pub(crate) confirm_reset_yes: bool,
    pub(crate) uploading: Option<PathBuf>,
    /// Upload held back until the remote clear has finished.
    queued_upload: Option<PathBuf>,
    pub(crate) clearing: bool,
    pub(crate) status: Option<StatusMessage>,
    pub(crate) throbber_frame: u8,
    pub(crate) insights_scroll: u16,
    correlations: Option<(Arc<RawDataset>, Arc<Vec<CorrelationCell>>)>,
    theme: Theme,
    pub(crate) display: DisplayConfig,
    pub(crate) debug: bool,
}

impl App {
    pub fn new_with_config(
        events: Sender<AppEvent>,
        service: Arc<dyn DataService>,
        flag: Arc<dyn SessionFlag>,
        theme: Theme,
        config: &AppConfig,
    ) -> Self {
        let session = SessionController::new(
            flag,
            config.initial_locale(),
            SessionOptions {
                clear_remote_on_refresh: config.service.clear_remote_on_refresh,
            },
        );
        Self {
            events,
            service,
            account: config.service.account_id,
            session,
            projection: ProjectionCache::new(),
            table: DataTableState::default(),
            input_mode: InputMode::Normal,
            search_input: TextInput::new(),
            search_before: String::new(),
            upload_input: TextInput::new(),
            column_picker: ColumnPickerModal::new(),
            range_modal: RangeModal::new(),
            confirm_reset_yes: false,
            uploading: None,
            queued_upload: None,
            clearing: false,
            status: None,
            throbber_frame: 0,
            insights_scroll: 0,
            correlations: None,
            theme,
            display: config.display.clone(),
            debug: false,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug = true;
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// Anything still running in the background.
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
            || self.uploading.is_some()
            || self.queued_upload.is_some()
            || self.clearing
    }

    pub fn advance_throbber(&mut self) {
        self.throbber_frame = self.throbber_frame.wrapping_add(1);
    }

    /// Current projected view and the schema it was built against.
    pub fn projected(&mut self) -> Option<(Arc<ProjectedView>, Arc<DatasetSchema>)> {
        let dataset = Arc::clone(self.session.dataset()?);
        let schema = Arc::clone(self.session.schema()?);
        let view = self
            .projection
            .get(&dataset, &schema.info, self.session.filter());
        Some((view, schema))
    }

    /// Correlations of the loaded dataset's numeric columns, computed once per dataset.
    pub(crate) fn correlations(&mut self) -> Option<Arc<Vec<CorrelationCell>>> {
        let dataset = self.session.dataset()?;
        if let Some((cached_for, cells)) = &self.correlations {
            if Arc::ptr_eq(cached_for, dataset) {
                return Some(Arc::clone(cells));
            }
        }
        let schema = self.session.schema()?;
        let cells = Arc::new(correlation_matrix(dataset, &schema.info.numeric_columns));
        self.correlations = Some((Arc::clone(dataset), Arc::clone(&cells)));
        Some(cells)
    }

    pub fn event(&mut self, event: AppEvent) -> Option<AppEvent> {
        match event {
            AppEvent::Key(key) => self.key(&key),
            AppEvent::Resize(..) => None,
            AppEvent::Command(command) => {
                self.dispatch(command);
                None
            }
            AppEvent::Upload(path) => {
                self.start_upload(path);
                None
            }
            AppEvent::FetchDone { ticket, result } => {
                self.fetch_done(ticket, result);
                None
            }
            AppEvent::UploadDone { path, result } => {
                self.upload_done(&path, result);
                None
            }
            AppEvent::ClearDone(result) => {
                self.clearing = false;
                if let Err(e) = result {
                    tracing::warn!("could not clear the remote dashboard: {e}");
                    self.status = Some(StatusMessage::Error(user_message(&e)));
                }
                if let Some(path) = self.queued_upload.take() {
                    self.start_upload(path);
                }
                None
            }
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn dispatch(&mut self, command: Command) {
        let effects = self.session.handle(command);
        self.run_effects(effects);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchSnapshot { ticket, locale } => {
                    let account = self.account;
                    self.spawn_worker("fetch", move |service| AppEvent::FetchDone {
                        ticket,
                        result: service.get_snapshot(locale, account),
                    });
                }
                Effect::ClearRemote => {
                    // The clear must not land after an upload and hide it.
                    if self.uploading.is_some() || self.queued_upload.is_some() {
                        tracing::debug!("remote clear skipped, an upload replaces the dashboard");
                        continue;
                    }
                    let account = self.account;
                    self.clearing = true;
                    self.spawn_worker("clear", move |service| {
                        AppEvent::ClearDone(service.clear_dashboard(account))
                    });
                }
            }
        }
    }

    /// Run a blocking service call off the UI thread and post its result back.
    fn spawn_worker<F>(&mut self, name: &str, job: F)
    where
        F: FnOnce(&dyn DataService) -> AppEvent + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{APP_NAME}-{name}"))
            .spawn(move || {
                // The receiver is gone once the app has exited; nothing left to report to.
                let _ = events.send(job(service.as_ref()));
            });
        if let Err(e) = spawned {
            tracing::error!("failed to start {name} worker: {e}");
            let _ = self.events.send(AppEvent::Crash(format!(
                "Failed to start background {name} task: {e}"
            )));
        }
    }

    fn fetch_done(&mut self, ticket: FetchTicket, result: Result<Snapshot, ServiceError>) {
        match self.session.complete(ticket, result) {
            Completion::Applied(effects) => {
                if matches!(ticket.purpose, FetchPurpose::Mount | FetchPurpose::Upload) {
                    self.table.reset();
                    self.insights_scroll = 0;
                    self.search_input.clear();
                }
                match self.session.last_error() {
                    Some(err) => self.status = Some(StatusMessage::Error(err.to_string())),
                    None if matches!(self.status, Some(StatusMessage::Error(_))) => {
                        self.status = None
                    }
                    None => {}
                }
                self.run_effects(effects);
            }
            Completion::Stale => {}
        }
    }

    fn start_upload(&mut self, path: PathBuf) {
        if self.session.is_torn_down() {
            return;
        }
        if self.uploading.is_some() || self.queued_upload.is_some() {
            self.status = Some(StatusMessage::Info(
                "An upload is already in progress".to_string(),
            ));
            return;
        }
        if SpreadsheetFormat::from_path(&path).is_none() {
            let err = ServiceError::UnsupportedFormat(path.display().to_string());
            self.status = Some(StatusMessage::Error(user_message(&err)));
            return;
        }
        if self.clearing {
            tracing::debug!(file = %path.display(), "upload waits for the remote clear");
            self.status = Some(StatusMessage::Info(format!(
                "Clearing the previous dashboard before uploading {}...",
                display_name(&path)
            )));
            self.queued_upload = Some(path);
            return;
        }
        let locale = self.session.locale();
        let account = self.account;
        self.uploading = Some(path.clone());
        self.status = Some(StatusMessage::Info(format!(
            "Uploading {}...",
            display_name(&path)
        )));
        self.spawn_worker("upload", move |service| {
            let result = service.upload_dataset(&path, locale, account);
            AppEvent::UploadDone { path, result }
        });
    }

    fn upload_done(&mut self, path: &Path, result: Result<UploadReceipt, ServiceError>) {
        self.uploading = None;
        match result {
            Ok(receipt) => {
                tracing::info!(
                    file = %path.display(),
                    upload_id = receipt.upload_id.as_deref().unwrap_or("-"),
                    "upload finished"
                );
                let rows = receipt
                    .rows
                    .map(|n| format!(" ({} rows)", n))
                    .unwrap_or_default();
                self.status = Some(StatusMessage::Info(format!(
                    "Uploaded {}{}",
                    display_name(path),
                    rows
                )));
                self.dispatch(Command::UploadCompleted);
            }
            Err(e) => {
                tracing::error!(file = %path.display(), "upload failed: {e}");
                self.status = Some(StatusMessage::Error(user_message(&e)));
            }
        }
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return self.quit();
        }
        match self.input_mode {
            InputMode::Normal => self.normal_key(key),
            InputMode::Search => {
                self.search_key(key);
                None
            }
            InputMode::Upload => {
                self.upload_key(key);
                None
            }
            InputMode::ColumnPicker => {
                let action = self.column_picker.handle_key(key, self.session.filter());
                match action {
                    PickerAction::Send(command) => self.dispatch(command),
                    PickerAction::Close => self.input_mode = InputMode::Normal,
                    PickerAction::None => {}
                }
                None
            }
            InputMode::Range => {
                let Some(schema) = self.session.schema().map(Arc::clone) else {
                    self.range_modal.close();
                    self.input_mode = InputMode::Normal;
                    return None;
                };
                match self.range_modal.handle_key(key, &schema, self.session.filter()) {
                    RangeAction::Send(command) => {
                        self.dispatch(command);
                        self.input_mode = InputMode::Normal;
                    }
                    RangeAction::Close => self.input_mode = InputMode::Normal,
                    RangeAction::None => {}
                }
                None
            }
            InputMode::ConfirmReset => {
                self.confirm_reset_key(key);
                None
            }
            InputMode::Help => {
                self.input_mode = InputMode::Normal;
                None
            }
        }
    }

    fn quit(&mut self) -> Option<AppEvent> {
        self.dispatch(Command::Teardown);
        Some(AppEvent::Exit)
    }

    fn normal_key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        let tab = self.session.tab();
        let loaded = self.session.state() == DashboardState::Loaded;
        match key.code {
            KeyCode::Char('q') => return self.quit(),
            KeyCode::Char('?') | KeyCode::F(1) => self.input_mode = InputMode::Help,
            KeyCode::Tab => self.dispatch(Command::SelectTab(tab.next())),
            KeyCode::BackTab => self.dispatch(Command::SelectTab(tab.prev())),
            KeyCode::Char(c @ '1'..='3') => {
                let idx = c as usize - '1' as usize;
                self.dispatch(Command::SelectTab(DashboardTab::ALL[idx]));
            }
            KeyCode::Char('l') => {
                let next = self.session.locale().toggled();
                self.dispatch(Command::ChangeLocale(next));
            }
            KeyCode::Char('u') => {
                if self.uploading.is_none() {
                    self.upload_input.clear();
                    self.upload_input.set_focused(true);
                    self.input_mode = InputMode::Upload;
                }
            }
            KeyCode::Char('r') => {
                // Only retry after a failure or refresh loaded data; a cleared dashboard
                // stays blank until the next upload.
                if loaded || self.session.last_error().is_some() {
                    self.dispatch(Command::Mount);
                }
            }
            KeyCode::Char('R') => {
                self.confirm_reset_yes = false;
                self.input_mode = InputMode::ConfirmReset;
            }
            _ if tab == DashboardTab::Data && loaded => self.data_key(key),
            KeyCode::Down | KeyCode::Char('j') if tab == DashboardTab::Insights => {
                self.insights_scroll = self.insights_scroll.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') if tab == DashboardTab::Insights => {
                self.insights_scroll = self.insights_scroll.saturating_sub(1);
            }
            _ => {}
        }
        None
    }

    fn data_key(&mut self, key: &KeyEvent) {
        let (rows, columns) = self
            .projected()
            .map(|(view, _)| (view.len(), view.columns.len()))
            .unwrap_or((0, 0));
        match key.code {
            KeyCode::Char('/') => {
                self.search_before = self.session.filter().search_term.clone();
                self.search_input.set_value(self.search_before.clone());
                self.search_input.set_focused(true);
                self.input_mode = InputMode::Search;
            }
            KeyCode::Esc if !self.session.filter().search_term.is_empty() => {
                self.search_input.clear();
                self.dispatch(Command::SetSearch(String::new()));
            }
            KeyCode::Char('c') => {
                if let Some(schema) = self.session.schema() {
                    self.column_picker.open(&schema.info);
                    self.input_mode = InputMode::ColumnPicker;
                }
            }
            KeyCode::Char('f') => {
                let Some(schema) = self.session.schema().map(Arc::clone) else {
                    return;
                };
                let focused = self.focused_column();
                if self
                    .range_modal
                    .open(&schema, self.session.filter(), focused.as_deref())
                {
                    self.input_mode = InputMode::Range;
                } else {
                    self.status = Some(StatusMessage::Info(
                        "No numeric columns to filter".to_string(),
                    ));
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.table.scroll_down(1, rows),
            KeyCode::Up | KeyCode::Char('k') => self.table.scroll_up(1),
            KeyCode::PageDown => self.table.scroll_down(PAGE_ROWS, rows),
            KeyCode::PageUp => self.table.scroll_up(PAGE_ROWS),
            KeyCode::Home | KeyCode::Char('g') => self.table.scroll_up(usize::MAX),
            KeyCode::End | KeyCode::Char('G') => self.table.scroll_down(usize::MAX, rows),
            KeyCode::Right => self.table.scroll_right(columns),
            KeyCode::Left => self.table.scroll_left(),
            _ => {}
        }
    }

    /// Leftmost visible column of the data table.
    fn focused_column(&mut self) -> Option<String> {
        let (view, _) = self.projected()?;
        view.columns.get(self.table.column_offset).cloned()
    }

    fn search_key(&mut self, key: &KeyEvent) {
        match self.search_input.handle_key(key) {
            TextInputEvent::Changed => {
                let term = self.search_input.value().to_string();
                self.dispatch(Command::SetSearch(term));
            }
            TextInputEvent::Submit => {
                self.search_input.set_focused(false);
                self.input_mode = InputMode::Normal;
            }
            TextInputEvent::Cancel => {
                let previous = std::mem::take(&mut self.search_before);
                self.search_input.set_value(previous.clone());
                self.search_input.set_focused(false);
                self.dispatch(Command::SetSearch(previous));
                self.input_mode = InputMode::Normal;
            }
            TextInputEvent::None => {}
        }
    }

    fn upload_key(&mut self, key: &KeyEvent) {
        match self.upload_input.handle_key(key) {
            TextInputEvent::Submit => {
                let raw = self.upload_input.value().trim().to_string();
                self.upload_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                if !raw.is_empty() {
                    self.start_upload(expand_home(&raw));
                }
            }
            TextInputEvent::Cancel => {
                self.upload_input.set_focused(false);
                self.input_mode = InputMode::Normal;
            }
            TextInputEvent::Changed | TextInputEvent::None => {}
        }
    }

    fn confirm_reset_key(&mut self, key: &KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.confirm_reset_yes = !self.confirm_reset_yes;
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => self.reset(),
            KeyCode::Enter if self.confirm_reset_yes => self.reset(),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.dispatch(Command::Reset);
        self.table.reset();
        self.projection.invalidate();
        self.correlations = None;
        self.search_input.clear();
        self.insights_scroll = 0;
        self.status = Some(StatusMessage::Info(
            "Dashboard cleared. Press 'u' to upload a new file.".to_string(),
        ));
        self.input_mode = InputMode::Normal;
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand a leading `~/` to the home directory.
fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw)),
        None => PathBuf::from(raw),
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        use crate::render::context::RenderContext;
        use crate::render::layout::app_layout;

        let ctx = RenderContext::from_theme_and_config(&self.theme, &self.display);
        Clear.render(area, buf);

        let layout = app_layout(area, self.debug);
        crate::render::main_view::render_tabs(layout.tabs, buf, self, &ctx);
        match self.session.tab() {
            DashboardTab::Overview => {
                crate::render::overview::render_overview(layout.main_view, buf, self, &ctx)
            }
            DashboardTab::Data => {
                crate::render::data_view::render_data_view(layout.main_view, buf, self, &ctx)
            }
            DashboardTab::Insights => {
                crate::render::insights::render_insights(layout.main_view, buf, self, &ctx)
            }
        }
        crate::render::main_view::render_status_line(layout.status, buf, self, &ctx);
        crate::render::main_view::render_control_bar(layout.control_bar, buf, self, &ctx);
        if let Some(debug_area) = layout.debug {
            crate::render::main_view::render_debug_row(debug_area, buf, self, &ctx);
        }

        crate::render::overlays::render_overlays(area, buf, self, &ctx);
    }
}

/// Build the data service the configuration asks for.
pub fn build_service(config: &AppConfig) -> Result<Arc<dyn DataService>> {
    if config.service.offline {
        tracing::info!(sample_rows = config.ingest.sample_rows, "offline mode");
        return Ok(Arc::new(ingest::LocalDataService::new(
            config.ingest.sample_rows,
        )));
    }
    #[cfg(feature = "http")]
    {
        tracing::info!(base_url = %config.service.base_url, "using analytics backend");
        Ok(Arc::new(service::HttpDataService::from_config(
            &config.service,
        )))
    }
    #[cfg(not(feature = "http"))]
    {
        Err(color_eyre::eyre::eyre!(
            "finsight was built without the http feature; run with --offline"
        ))
    }
}

/// Send logs to a file; the terminal belongs to the dashboard. RUST_LOG wins over the config.
pub fn init_logging(config: &AppConfig) -> Result<PathBuf> {
    use tracing_subscriber::EnvFilter;

    let cache = CacheManager::new(APP_NAME)?;
    let path = cache.log_path(config.logging.file.as_deref())?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(&config.logging.level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .try_init();
    Ok(path)
}

pub fn run(options: RunOptions, config: AppConfig) -> Result<()> {
    use std::sync::{mpsc, Mutex, Once};
    use std::time::{Duration, Instant};

    const THROBBER_INTERVAL: Duration = Duration::from_millis(120);

    let theme = Theme::from_config(&config.theme)
        .or_else(|e| Theme::from_config(&AppConfig::default().theme).map_err(|_| e))?;

    // Install color_eyre at most once per process.
    static COLOR_EYRE_INIT: Once = Once::new();
    static INSTALL_RESULT: Mutex<Option<Result<(), color_eyre::Report>>> = Mutex::new(None);
    COLOR_EYRE_INIT.call_once(|| {
        *INSTALL_RESULT.lock().unwrap_or_else(|e| e.into_inner()) = Some(color_eyre::install());
    });
    if let Some(Err(e)) = INSTALL_RESULT
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
    {
        return Err(color_eyre::eyre::eyre!(e.to_string()));
    }

    let service = build_service(&config)?;
    let flag: Arc<dyn SessionFlag> = Arc::new(MemorySessionFlag::new(config.service.clear_on_start));

    let mut terminal = ratatui::try_init().map_err(|e| {
        color_eyre::eyre::eyre!(
            "finsight requires an interactive terminal (TTY). No terminal detected: {}. \
             Run from a terminal or ensure stdout is connected to a TTY.",
            e
        )
    })?;
    let (tx, rx) = mpsc::channel::<AppEvent>();
    let mut app = App::new_with_config(tx.clone(), service, flag, theme, &config);
    if options.debug {
        app.enable_debug();
    }

    terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
    tx.send(AppEvent::Command(Command::Mount))?;
    if let Some(path) = options.upload {
        tx.send(AppEvent::Upload(path))?;
    }

    let mut last_tick = Instant::now();
    loop {
        if crossterm::event::poll(Duration::from_millis(
            config.performance.event_poll_interval_ms,
        ))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key) => {
                    if key.is_press() {
                        tx.send(AppEvent::Key(key))?
                    }
                }
                crossterm::event::Event::Resize(cols, rows) => {
                    tx.send(AppEvent::Resize(cols, rows))?
                }
                _ => {}
            }
        }

        let mut updated = match rx.recv_timeout(Duration::from_millis(0)) {
            Ok(event) => {
                match event {
                    AppEvent::Exit => break,
                    AppEvent::Crash(msg) => {
                        ratatui::restore();
                        return Err(color_eyre::eyre::eyre!(msg));
                    }
                    event => {
                        if let Some(next) = app.event(event) {
                            tx.send(next)?;
                        }
                    }
                }
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => false,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if app.is_busy() && last_tick.elapsed() >= THROBBER_INTERVAL {
            app.advance_throbber();
            last_tick = Instant::now();
            updated = true;
        }

        if updated {
            terminal.draw(|frame| frame.render_widget(&mut app, frame.area()))?;
        }
    }

    ratatui::restore();
    Ok(())
}
