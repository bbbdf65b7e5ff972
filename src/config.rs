use crate::service::Locale;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use finsight_cli::Args;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use supports_color::Stream;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Default configuration as TOML with every field commented out, so the built-in
    /// defaults stay in effect until a line is uncommented.
    pub fn generate_default_config(&self) -> Result<String> {
        let toml_str = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        Ok(Self::comment_all_fields(&toml_str, &Self::collect_all_comments()))
    }

    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();
        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        let sections: &[(&str, &[(&str, &str)])] = &[
            ("service", SERVICE_COMMENTS),
            ("locale", LOCALE_COMMENTS),
            ("ingest", INGEST_COMMENTS),
            ("display", DISPLAY_COMMENTS),
            ("performance", PERFORMANCE_COMMENTS),
            ("logging", LOGGING_COMMENTS),
            ("theme.colors", COLOR_COMMENTS),
        ];
        for (section, fields) in sections {
            for (field, comment) in *fields {
                comments.insert(format!("{}.{}", section, field), comment.to_string());
            }
        }
        comments
    }

    fn comment_all_fields(toml: &str, comments: &HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# finsight configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if let Some((_, header)) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header);
                    result.push('\n');
                }
                current_section = section;
                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);
                result.push_str("# ");
            }
            result.push_str(line);
            result.push('\n');
        }

        Self::add_missing_option_fields(result, comments, &seen_fields)
    }

    /// Option fields are skipped by the serializer when unset; list them anyway.
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        const OPTION_FIELDS: &[&str] = &["logging.file"];

        for field_path in OPTION_FIELDS {
            if seen_fields.contains(*field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.rsplit_once('.') else {
                continue;
            };
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header = section_pos + section_header.len();
            let insert_pos = result[after_header..]
                .find('\n')
                .map(|p| after_header + p + 1)
                .unwrap_or(result.len());

            let mut new_content = String::new();
            if let Some(comment) = comments.get(*field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n", field_name));
            result.insert_str(insert_pos, &new_content);
        }
        result
    }

    /// Section name from a TOML line like "[service]" or "[theme.colors]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    fn extract_field_path(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }
        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, self.generate_default_config()?)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub service: ServiceConfig,
    pub locale: LocaleConfig,
    pub ingest: IngestConfig,
    pub display: DisplayConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "service",
        "# ============================================================================\n# Backend Service\n# ============================================================================",
    ),
    (
        "locale",
        "# ============================================================================\n# Language\n# ============================================================================",
    ),
    (
        "ingest",
        "# ============================================================================\n# Offline Ingestion\n# ============================================================================",
    ),
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "performance",
        "# ============================================================================\n# Performance Settings\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================\n# The terminal belongs to the dashboard, so logs always go to a file.",
    ),
    (
        "theme.colors",
        "# ============================================================================\n# Color Theme\n# ============================================================================\n# Supported formats:\n#   - Named colors: \"red\", \"blue\", \"bright_red\", \"dark_gray\", etc. (case-insensitive)\n#   - Hex colors: \"#ff0000\"\n#   - Indexed colors: \"indexed(0-255)\" for specific xterm 256-color palette entries",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub account_id: u64,
    pub industry: String,
    pub timeout_secs: u64,
    pub offline: bool,
    pub clear_remote_on_refresh: bool,
    pub clear_on_start: bool,
}

const SERVICE_COMMENTS: &[(&str, &str)] = &[
    ("base_url", "Base URL of the analytics API, including the version prefix"),
    ("account_id", "Company account whose dashboard is shown"),
    (
        "industry",
        "Industry sent with uploads so the analysis can compare against sector norms",
    ),
    ("timeout_secs", "Timeout in seconds for each request to the backend"),
    (
        "offline",
        "Read uploaded spreadsheets locally instead of sending them to the backend.\nNarrative fields are unavailable offline.",
    ),
    (
        "clear_remote_on_refresh",
        "When the dashboard starts blank, also ask the backend to hide its current data.\nUpload history on the server is kept either way.",
    ),
    (
        "clear_on_start",
        "Start every session with a blank dashboard until something is uploaded.\nSet to false (or pass --keep-previous) to load the last upload on start.",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub default: String,
}

const LOCALE_COMMENTS: &[(&str, &str)] = &[(
    "default",
    "Language for narrative fields: \"en\" or \"hi\". Toggle at runtime with 'l'.",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub sample_rows: usize,
}

const INGEST_COMMENTS: &[(&str, &str)] = &[(
    "sample_rows",
    "Rows kept from an uploaded spreadsheet in offline mode",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub table_cell_padding: u16,
    pub column_colors: bool,
    pub max_column_width: u16,
}

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    ("table_cell_padding", "Spaces between table columns"),
    (
        "column_colors",
        "Color table cells by column kind (numeric, text, date)",
    ),
    ("max_column_width", "Widest a table column may grow, in characters"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub event_poll_interval_ms: u64,
}

const PERFORMANCE_COMMENTS: &[(&str, &str)] = &[(
    "event_poll_interval_ms",
    "How often the UI checks for key presses, in milliseconds",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[
    (
        "level",
        "Log filter (error, warn, info, debug, trace, or target=level directives).\nRUST_LOG takes precedence when set.",
    ),
    (
        "file",
        "Log file path. Default: finsight.log in the user cache directory",
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub primary: String,
    pub secondary: String,
    pub success: String,
    pub error: String,
    pub warning: String,
    pub dimmed: String,
    pub controls_bg: String,
    pub keybind_hints: String,
    pub keybind_labels: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub table_header: String,
    pub table_selected: String,
    pub column_numeric: String,
    pub column_text: String,
    pub column_date: String,
    pub modal_border: String,
    pub modal_border_active: String,
    pub tab_active: String,
}

const COLOR_COMMENTS: &[(&str, &str)] = &[
    ("primary", "Headings and focused borders"),
    ("secondary", "Secondary highlights"),
    ("success", "Healthy status and positive figures"),
    ("error", "Errors and negative figures"),
    ("warning", "Warnings and medium-severity risks"),
    ("dimmed", "Muted text such as empty-state hints"),
    ("controls_bg", "Background of the control bar"),
    ("keybind_hints", "Keys in the control bar"),
    ("keybind_labels", "Labels next to keys in the control bar"),
    ("text_primary", "Main text"),
    ("text_secondary", "Secondary text"),
    ("table_header", "Table header text"),
    ("table_selected", "Selected row (\"reversed\" inverts the row)"),
    ("column_numeric", "Cells of numeric columns"),
    ("column_text", "Cells of text columns"),
    ("column_date", "Cells of date columns"),
    ("modal_border", "Border of popups"),
    ("modal_border_active", "Border of the focused input in popups"),
    ("tab_active", "Selected tab title"),
];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            service: ServiceConfig::default(),
            locale: LocaleConfig::default(),
            ingest: IngestConfig::default(),
            display: DisplayConfig::default(),
            performance: PerformanceConfig::default(),
            logging: LoggingConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            account_id: 1,
            industry: "General".to_string(),
            timeout_secs: 60,
            offline: false,
            clear_remote_on_refresh: false,
            clear_on_start: true,
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: Locale::default().tag().to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sample_rows: crate::ingest::DEFAULT_SAMPLE_ROWS,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            table_cell_padding: 2,
            column_colors: true,
            max_column_width: 32,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            event_poll_interval_ms: 25,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            primary: "cyan".to_string(),
            secondary: "yellow".to_string(),
            success: "green".to_string(),
            error: "red".to_string(),
            warning: "yellow".to_string(),
            dimmed: "dark_gray".to_string(),
            controls_bg: "indexed(236)".to_string(),
            keybind_hints: "cyan".to_string(),
            keybind_labels: "indexed(252)".to_string(),
            text_primary: "white".to_string(),
            text_secondary: "dark_gray".to_string(),
            table_header: "white".to_string(),
            table_selected: "reversed".to_string(),
            column_numeric: "light_cyan".to_string(),
            column_text: "white".to_string(),
            column_date: "light_magenta".to_string(),
            modal_border: "cyan".to_string(),
            modal_border_active: "yellow".to_string(),
            tab_active: "yellow".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load from the `config.toml` managed by `manager`, on top of the defaults.
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        let mut config = AppConfig::default();
        if let Some(user_config) = Self::read_config_file(&config_path)? {
            config.merge(user_config);
        }
        config.validate().map_err(|e| {
            eyre!(
                "Invalid configuration in {}: {}",
                config_path.display(),
                e
            )
        })?;
        Ok(config)
    }

    fn read_config_file(config_path: &Path) -> Result<Option<AppConfig>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map(Some).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.service.merge(other.service);
        self.locale.merge(other.locale);
        self.ingest.merge(other.ingest);
        self.display.merge(other.display);
        self.performance.merge(other.performance);
        self.logging.merge(other.logging);
        self.theme.colors.merge(other.theme.colors);
    }

    /// Command-line layer: any flag given on the command line wins over the files.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(url) = &args.base_url {
            self.service.base_url = url.clone();
        }
        if let Some(id) = args.account_id {
            self.service.account_id = id;
        }
        if let Some(industry) = &args.industry {
            self.service.industry = industry.clone();
        }
        if let Some(secs) = args.timeout_secs {
            self.service.timeout_secs = secs;
        }
        if args.offline {
            self.service.offline = true;
        }
        if let Some(clear) = args.clear_remote_on_refresh {
            self.service.clear_remote_on_refresh = clear;
        }
        if args.keep_previous {
            self.service.clear_on_start = false;
        }
        if let Some(lang) = args.lang {
            self.locale.default = Locale::from(lang).tag().to_string();
        }
        if let Some(n) = args.sample_rows {
            self.ingest.sample_rows = n;
        }
        if let Some(colors) = args.column_colors {
            self.display.column_colors = colors;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(file) = &args.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Locale the dashboard starts in.
    pub fn initial_locale(&self) -> Locale {
        Locale::from_tag(&self.locale.default).unwrap_or_default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        let url = self.service.base_url.trim();
        if !self.service.offline && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(eyre!(
                "service.base_url must start with http:// or https://, got '{}'",
                self.service.base_url
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(eyre!("service.timeout_secs must be greater than 0"));
        }

        if Locale::from_tag(&self.locale.default).is_none() {
            return Err(eyre!(
                "Invalid locale.default: '{}'. Must be 'en' or 'hi'",
                self.locale.default
            ));
        }

        if self.ingest.sample_rows == 0 {
            return Err(eyre!("ingest.sample_rows must be greater than 0"));
        }

        if self.display.max_column_width < 4 {
            return Err(eyre!("display.max_column_width must be at least 4"));
        }

        if self.performance.event_poll_interval_ms == 0 {
            return Err(eyre!("event_poll_interval_ms must be greater than 0"));
        }

        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .map_err(|e| eyre!("Invalid logging.level '{}': {}", self.logging.level, e))?;

        let parser = ColorParser::new();
        self.theme.colors.validate(&parser)?;

        Ok(())
    }
}

/// Take `other`'s value for each listed field that differs from the section default.
macro_rules! merge_changed {
    ($self:ident, $other:ident, $default:expr, [$($field:ident),+ $(,)?]) => {{
        let default = $default;
        $(
            if $other.$field != default.$field {
                $self.$field = $other.$field;
            }
        )+
    }};
}

impl ServiceConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(
            self,
            other,
            ServiceConfig::default(),
            [
                base_url,
                account_id,
                industry,
                timeout_secs,
                offline,
                clear_remote_on_refresh,
                clear_on_start,
            ]
        );
    }
}

impl LocaleConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(self, other, LocaleConfig::default(), [default]);
    }
}

impl IngestConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(self, other, IngestConfig::default(), [sample_rows]);
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(
            self,
            other,
            DisplayConfig::default(),
            [table_cell_padding, column_colors, max_column_width]
        );
    }
}

impl PerformanceConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(self, other, PerformanceConfig::default(), [event_poll_interval_ms]);
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        merge_changed!(self, other, LoggingConfig::default(), [level]);
        if other.file.is_some() {
            self.file = other.file;
        }
    }
}

impl ColorConfig {
    /// Name and value of every color, in declaration order.
    pub fn entries(&self) -> [(&'static str, &str); 19] {
        [
            ("primary", &self.primary),
            ("secondary", &self.secondary),
            ("success", &self.success),
            ("error", &self.error),
            ("warning", &self.warning),
            ("dimmed", &self.dimmed),
            ("controls_bg", &self.controls_bg),
            ("keybind_hints", &self.keybind_hints),
            ("keybind_labels", &self.keybind_labels),
            ("text_primary", &self.text_primary),
            ("text_secondary", &self.text_secondary),
            ("table_header", &self.table_header),
            ("table_selected", &self.table_selected),
            ("column_numeric", &self.column_numeric),
            ("column_text", &self.column_text),
            ("column_date", &self.column_date),
            ("modal_border", &self.modal_border),
            ("modal_border_active", &self.modal_border_active),
            ("tab_active", &self.tab_active),
        ]
    }

    fn validate(&self, parser: &ColorParser) -> Result<()> {
        for (name, value) in self.entries() {
            parser
                .parse(value)
                .map_err(|e| eyre!("Invalid color value for '{}': {}", name, e))?;
        }
        Ok(())
    }

    pub fn merge(&mut self, other: Self) {
        merge_changed!(
            self,
            other,
            ColorConfig::default(),
            [
                primary,
                secondary,
                success,
                error,
                warning,
                dimmed,
                controls_bg,
                keybind_hints,
                keybind_labels,
                text_primary,
                text_secondary,
                table_header,
                table_selected,
                column_numeric,
                column_text,
                column_date,
                modal_border,
                modal_border_active,
                tab_active,
            ]
        );
    }
}

/// Color parser with terminal capability detection
pub struct ColorParser {
    supports_true_color: bool,
    supports_256: bool,
    no_color: bool,
}

impl ColorParser {
    pub fn new() -> Self {
        let support = supports_color::on(Stream::Stdout);
        Self {
            supports_true_color: support.as_ref().is_some_and(|s| s.has_16m),
            supports_256: support.as_ref().is_some_and(|s| s.has_256),
            no_color: std::env::var("NO_COLOR").is_ok(),
        }
    }

    /// Parse a named, hex or indexed color into what this terminal can show.
    pub fn parse(&self, s: &str) -> Result<Color> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();

        let color = if trimmed.starts_with('#') {
            let (r, g, b) = parse_hex(trimmed)?;
            self.convert_rgb_to_terminal_color(r, g, b)
        } else if let Some(inner) = lower
            .strip_prefix("indexed(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let num = inner.trim().parse::<u8>().map_err(|_| {
                eyre!(
                    "Invalid indexed color: '{}'. Expected format: indexed(0-255)",
                    trimmed
                )
            })?;
            Color::Indexed(num)
        } else {
            named_color(&lower.replace(' ', "_")).ok_or_else(|| {
                eyre!(
                    "Unknown color name: '{}'. Supported: basic ANSI colors (red, blue, etc.), \
                     bright variants (bright_red, etc.), or hex colors (#ff0000)",
                    trimmed
                )
            })?
        };

        if self.no_color {
            return Ok(Color::Reset);
        }
        Ok(color)
    }

    fn convert_rgb_to_terminal_color(&self, r: u8, g: u8, b: u8) -> Color {
        if self.supports_true_color {
            Color::Rgb(r, g, b)
        } else if self.supports_256 {
            Color::Indexed(rgb_to_256_color(r, g, b))
        } else {
            rgb_to_basic_ansi(r, g, b)
        }
    }
}

impl Default for ColorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn named_color(name: &str) -> Option<Color> {
    let color = match name {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "bright_black" | "gray" | "grey" | "dark_gray" | "dark_grey" => Color::Indexed(8),
        "bright_red" | "light_red" => Color::Indexed(9),
        "bright_green" | "light_green" => Color::Indexed(10),
        "bright_yellow" | "light_yellow" => Color::Indexed(11),
        "bright_blue" | "light_blue" => Color::Indexed(12),
        "bright_magenta" | "light_magenta" => Color::Indexed(13),
        "bright_cyan" | "light_cyan" => Color::Indexed(14),
        "bright_white" => Color::Indexed(15),
        "light_gray" | "light_grey" => Color::Indexed(7),
        // Modifiers, resolved at render time.
        "reset" | "reversed" => Color::Reset,
        _ => return None,
    };
    Some(color)
}

fn parse_hex(s: &str) -> Result<(u8, u8, u8)> {
    let digits = s
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.is_ascii())
        .ok_or_else(|| {
            eyre!(
                "Invalid hex color format: '{}'. Expected format: #rrggbb",
                s
            )
        })?;
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| eyre!("Invalid hex color component in {}", s))
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Nearest entry of the xterm 256-color palette.
pub fn rgb_to_256_color(r: u8, g: u8, b: u8) -> u8 {
    let spread = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if spread < 10 {
        let gray = (r as u16 + g as u16 + b as u16) / 3;
        return match gray {
            0..=7 => 16,
            248.. => 231,
            _ => 232 + ((gray - 8) * 24 / 240) as u8,
        };
    }
    let level = |c: u8| (c as u16 * 5 / 255) as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

/// Nearest of the eight basic ANSI colors.
pub fn rgb_to_basic_ansi(r: u8, g: u8, b: u8) -> Color {
    let spread = r.max(g).max(b) as i16 - r.min(g).min(b) as i16;
    if spread < 30 {
        let avg = (r as u16 + g as u16 + b as u16) / 3;
        return if avg < 64 { Color::Black } else { Color::White };
    }
    match (r > 128, g > 128, b > 128) {
        (false, false, false) => Color::Black,
        (true, false, false) => Color::Red,
        (false, true, false) => Color::Green,
        (true, true, false) => Color::Yellow,
        (false, false, true) => Color::Blue,
        (true, false, true) => Color::Magenta,
        (false, true, true) => Color::Cyan,
        (true, true, true) => Color::White,
    }
}

/// Theme containing parsed colors ready for use
#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: HashMap<String, Color>,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parser = ColorParser::new();
        let mut colors = HashMap::new();
        for (name, value) in config.colors.entries() {
            colors.insert(name.to_string(), parser.parse(value)?);
        }
        Ok(Self { colors })
    }

    /// Get a color by name, returns Reset if not found
    pub fn get(&self, name: &str) -> Color {
        self.colors.get(name).copied().unwrap_or(Color::Reset)
    }

    pub fn get_optional(&self, name: &str) -> Option<Color> {
        self.colors.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colors() {
        let parser = ColorParser {
            supports_true_color: true,
            supports_256: true,
            no_color: false,
        };
        assert_eq!(parser.parse("Cyan").unwrap(), Color::Cyan);
        assert_eq!(parser.parse("dark gray").unwrap(), Color::Indexed(8));
        assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
        assert_eq!(parser.parse("#FF8000").unwrap(), Color::Rgb(255, 128, 0));
        assert!(parser.parse("#ff80").is_err());
        assert!(parser.parse("indexed(300)").is_err());
        assert!(parser.parse("chartreuse").is_err());
    }

    #[test]
    fn test_no_color_still_validates() {
        let parser = ColorParser {
            supports_true_color: false,
            supports_256: false,
            no_color: true,
        };
        assert_eq!(parser.parse("red").unwrap(), Color::Reset);
        assert!(parser.parse("not-a-color").is_err());
    }

    #[test]
    fn test_rgb_fallbacks() {
        assert_eq!(rgb_to_256_color(0, 0, 0), 16);
        assert_eq!(rgb_to_256_color(255, 255, 255), 231);
        assert_eq!(rgb_to_256_color(255, 0, 0), 196);
        assert_eq!(rgb_to_basic_ansi(200, 20, 20), Color::Red);
        assert_eq!(rgb_to_basic_ansi(10, 10, 10), Color::Black);
    }

    #[test]
    fn test_merge_takes_non_default_values() {
        let mut base = AppConfig::default();
        base.service.account_id = 9;
        let mut user = AppConfig::default();
        user.service.base_url = "https://api.example.com/v1".into();
        user.logging.file = Some(PathBuf::from("/tmp/f.log"));
        base.merge(user);
        assert_eq!(base.service.account_id, 9);
        assert_eq!(base.service.base_url, "https://api.example.com/v1");
        assert_eq!(base.logging.file, Some(PathBuf::from("/tmp/f.log")));
    }

    #[test]
    fn test_comment_all_fields() {
        let template = ConfigManager::with_dir(PathBuf::from("/unused"))
            .generate_default_config()
            .unwrap();
        assert!(template.contains("# Backend Service"));
        assert!(template.contains("# [service]"));
        assert!(template.contains("# base_url = \"http://localhost:8000/api/v1\""));
        assert!(template.contains("# file = null"));
        for line in template.lines() {
            assert!(line.is_empty() || line.starts_with('#'), "uncommented line: {line}");
        }
    }
}
