//! Dashboard session lifecycle: when to fetch, when to start blank, and how late
//! responses are discarded.
//!
//! [`SessionController`] is a plain state machine. It never performs I/O itself; commands
//! return [`Effect`]s for the caller to execute, and the caller feeds each fetch result back
//! through [`SessionController::complete`] together with the ticket it was issued under.

use crate::dataset::RawDataset;
use crate::error_display::user_message;
use crate::filter::FilterModel;
use crate::schema::DatasetSchema;
use crate::service::{FinancialMetrics, Locale, Narrative, ServiceError, Snapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot "start from a blank dashboard" marker, scoped to the running process.
pub trait SessionFlag: Send + Sync {
    fn is_set(&self) -> bool;
    fn set(&self);
    fn clear(&self);
    /// Read and clear in one step.
    fn take(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct MemorySessionFlag(AtomicBool);

impl MemorySessionFlag {
    pub fn new(initial: bool) -> Self {
        Self(AtomicBool::new(initial))
    }
}

impl SessionFlag for MemorySessionFlag {
    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardState {
    Uninitialized,
    Loading,
    Loaded,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Overview,
    Data,
    Insights,
}

impl DashboardTab {
    pub const ALL: [DashboardTab; 3] = [DashboardTab::Overview, DashboardTab::Data, DashboardTab::Insights];

    pub fn title(&self) -> &'static str {
        match self {
            DashboardTab::Overview => "Overview",
            DashboardTab::Data => "Data",
            DashboardTab::Insights => "Insights",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            DashboardTab::Overview => 0,
            DashboardTab::Data => 1,
            DashboardTab::Insights => 2,
        }
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPurpose {
    Mount,
    LocaleRefresh,
    Upload,
}

/// Identifies one issued fetch. Only the latest ticket per purpose is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub purpose: FetchPurpose,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mount,
    ChangeLocale(Locale),
    SelectColumns(Vec<String>),
    ToggleColumn(String),
    SetRange { column: String, min: f64, max: f64 },
    ClearRange(String),
    SetSearch(String),
    SelectTab(DashboardTab),
    Reset,
    UploadCompleted,
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSnapshot { ticket: FetchTicket, locale: Locale },
    /// Ask the backend to hide the previous session's dataset.
    ClearRemote,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied(Vec<Effect>),
    Stale,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Emit [`Effect::ClearRemote`] when a flagged mount is honored.
    pub clear_remote_on_refresh: bool,
}

pub struct SessionController {
    state: DashboardState,
    flag: Arc<dyn SessionFlag>,
    options: SessionOptions,
    locale: Locale,
    tab: DashboardTab,
    dataset: Option<Arc<RawDataset>>,
    schema: Option<Arc<DatasetSchema>>,
    filter: FilterModel,
    narrative: Option<Narrative>,
    metrics: Option<FinancialMetrics>,
    report_id: Option<String>,
    last_error: Option<String>,
    in_flight: HashMap<FetchPurpose, FetchTicket>,
    next_ticket: u64,
    torn_down: bool,
}

impl SessionController {
    pub fn new(flag: Arc<dyn SessionFlag>, locale: Locale, options: SessionOptions) -> Self {
        Self {
            state: DashboardState::Uninitialized,
            flag,
            options,
            locale,
            tab: DashboardTab::default(),
            dataset: None,
            schema: None,
            filter: FilterModel::default(),
            narrative: None,
            metrics: None,
            report_id: None,
            last_error: None,
            in_flight: HashMap::new(),
            next_ticket: 0,
            torn_down: false,
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn tab(&self) -> DashboardTab {
        self.tab
    }

    pub fn dataset(&self) -> Option<&Arc<RawDataset>> {
        self.dataset.as_ref()
    }

    pub fn schema(&self) -> Option<&Arc<DatasetSchema>> {
        self.schema.as_ref()
    }

    pub fn filter(&self) -> &FilterModel {
        &self.filter
    }

    pub fn narrative(&self) -> Option<&Narrative> {
        self.narrative.as_ref()
    }

    pub fn metrics(&self) -> Option<&FinancialMetrics> {
        self.metrics.as_ref()
    }

    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_in_flight(&self, purpose: FetchPurpose) -> bool {
        self.in_flight.contains_key(&purpose)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn handle(&mut self, command: Command) -> Vec<Effect> {
        if self.torn_down {
            tracing::debug!(?command, "command ignored after teardown");
            return Vec::new();
        }
        match command {
            Command::Mount => self.mount(),
            Command::ChangeLocale(locale) => self.change_locale(locale),
            Command::UploadCompleted => self.upload_completed(),
            Command::Reset => {
                self.reset();
                Vec::new()
            }
            Command::Teardown => {
                tracing::debug!(outstanding = self.in_flight.len(), "session torn down");
                self.in_flight.clear();
                self.torn_down = true;
                Vec::new()
            }
            Command::SelectTab(tab) => {
                self.tab = tab;
                Vec::new()
            }
            other => {
                self.apply_filter_command(other);
                Vec::new()
            }
        }
    }

    fn mount(&mut self) -> Vec<Effect> {
        if self.flag.take() {
            tracing::info!("session flag set, starting with a blank dashboard");
            self.clear_loaded();
            self.state = DashboardState::Empty;
            return if self.options.clear_remote_on_refresh {
                vec![Effect::ClearRemote]
            } else {
                Vec::new()
            };
        }
        if self.is_in_flight(FetchPurpose::Mount) {
            return Vec::new();
        }
        self.supersede_refresh();
        self.state = DashboardState::Loading;
        vec![self.issue(FetchPurpose::Mount)]
    }

    fn change_locale(&mut self, locale: Locale) -> Vec<Effect> {
        if locale == self.locale {
            return Vec::new();
        }
        self.locale = locale;
        tracing::info!(locale = locale.tag(), "locale changed");
        if self.state != DashboardState::Loaded || self.is_in_flight(FetchPurpose::LocaleRefresh) {
            return Vec::new();
        }
        vec![self.issue(FetchPurpose::LocaleRefresh)]
    }

    fn upload_completed(&mut self) -> Vec<Effect> {
        self.flag.clear();
        if self.is_in_flight(FetchPurpose::Upload) {
            return Vec::new();
        }
        if self.in_flight.remove(&FetchPurpose::Mount).is_some() {
            tracing::debug!("upload supersedes pending mount fetch");
        }
        self.supersede_refresh();
        self.state = DashboardState::Loading;
        vec![self.issue(FetchPurpose::Upload)]
    }

    /// A refresh still in flight describes the dataset being replaced. The load that
    /// replaces it re-requests the active locale when needed.
    fn supersede_refresh(&mut self) {
        if self.in_flight.remove(&FetchPurpose::LocaleRefresh).is_some() {
            tracing::debug!("new load supersedes pending locale refresh");
        }
    }

    fn reset(&mut self) {
        tracing::info!("dashboard reset");
        self.clear_loaded();
        self.in_flight.clear();
        self.last_error = None;
        self.state = DashboardState::Empty;
        self.flag.set();
    }

    fn apply_filter_command(&mut self, command: Command) {
        if self.state != DashboardState::Loaded {
            tracing::debug!(?command, state = ?self.state, "filter command ignored");
            return;
        }
        let Some(schema) = self.schema.as_deref() else {
            return;
        };
        match command {
            Command::SelectColumns(columns) => {
                self.filter.set_selected_columns(columns.as_slice(), &schema.info)
            }
            Command::ToggleColumn(column) => self.filter.toggle_column(&column, &schema.info),
            Command::SetRange { column, min, max } => {
                if let Err(e) = self.filter.set_range(&column, min, max, schema) {
                    tracing::warn!(column = %column, "range rejected: {e}");
                }
            }
            Command::ClearRange(column) => {
                self.filter.clear_range(&column);
            }
            Command::SetSearch(term) => self.filter.set_search_term(term),
            _ => {}
        }
    }

    fn issue(&mut self, purpose: FetchPurpose) -> Effect {
        self.next_ticket += 1;
        let ticket = FetchTicket {
            id: self.next_ticket,
            purpose,
            locale: self.locale,
        };
        self.in_flight.insert(purpose, ticket);
        tracing::debug!(id = ticket.id, ?purpose, locale = ticket.locale.tag(), "fetch issued");
        Effect::FetchSnapshot {
            ticket,
            locale: self.locale,
        }
    }

    /// Apply the result of a fetch issued under `ticket`.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Snapshot, ServiceError>,
    ) -> Completion {
        if self.torn_down || self.in_flight.get(&ticket.purpose) != Some(&ticket) {
            tracing::debug!(id = ticket.id, purpose = ?ticket.purpose, "stale fetch result dropped");
            return Completion::Stale;
        }
        self.in_flight.remove(&ticket.purpose);

        match ticket.purpose {
            FetchPurpose::Mount | FetchPurpose::Upload => {
                Completion::Applied(self.complete_load(ticket, result))
            }
            FetchPurpose::LocaleRefresh => Completion::Applied(self.complete_refresh(ticket, result)),
        }
    }

    fn complete_load(
        &mut self,
        ticket: FetchTicket,
        result: Result<Snapshot, ServiceError>,
    ) -> Vec<Effect> {
        match result {
            Ok(snapshot) if snapshot.has_data => {
                let dataset = Arc::new(snapshot.records);
                let schema = Arc::new(DatasetSchema::derive(&dataset));
                tracing::info!(
                    rows = dataset.len(),
                    columns = schema.info.total_columns(),
                    numeric = schema.info.numeric_count(),
                    "dashboard loaded"
                );
                // Dataset, schema and filter change together.
                self.filter = FilterModel::seeded(&schema.info);
                self.dataset = Some(dataset);
                self.schema = Some(schema);
                self.narrative = Some(snapshot.narrative);
                self.metrics = Some(snapshot.metrics);
                self.report_id = snapshot.report_id;
                self.last_error = None;
                self.state = DashboardState::Loaded;
                // The narrative came back in the locale that was active when the fetch left.
                if ticket.locale != self.locale {
                    return vec![self.issue(FetchPurpose::LocaleRefresh)];
                }
            }
            Ok(_) => {
                tracing::info!(purpose = ?ticket.purpose, "no dashboard data");
                self.clear_loaded();
                self.last_error = None;
                self.state = DashboardState::Empty;
            }
            Err(e) => {
                tracing::error!(purpose = ?ticket.purpose, "failed to fetch dashboard: {e}");
                self.clear_loaded();
                self.last_error = Some(user_message(&e));
                self.state = DashboardState::Empty;
            }
        }
        Vec::new()
    }

    fn complete_refresh(
        &mut self,
        ticket: FetchTicket,
        result: Result<Snapshot, ServiceError>,
    ) -> Vec<Effect> {
        match result {
            Ok(snapshot) if self.state == DashboardState::Loaded => {
                self.narrative = Some(snapshot.narrative);
                self.last_error = None;
                if snapshot.report_id.is_some() {
                    self.report_id = snapshot.report_id;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(locale = ticket.locale.tag(), "failed to refresh analysis: {e}");
                self.last_error = Some(user_message(&e));
            }
        }
        if ticket.locale != self.locale && self.state == DashboardState::Loaded {
            return vec![self.issue(FetchPurpose::LocaleRefresh)];
        }
        Vec::new()
    }

    fn clear_loaded(&mut self) {
        self.dataset = None;
        self.schema = None;
        self.filter = FilterModel::default();
        self.narrative = None;
        self.metrics = None;
        self.report_id = None;
    }
}
