//! Shared CLI definitions for finsight.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// Spreadsheet formats accepted for upload.
/// Detection is by file extension, matching what the backend accepts.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Comma-separated values
    Csv,
    /// Excel (.xlsx, .xls)
    Excel,
}

impl SpreadsheetFormat {
    /// Detect format from path extension. Returns None when extension is missing or unsupported.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "xlsx").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Canonical extension, used when the path has no usable file name.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }

    /// MIME type sent with the upload form.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Display language for server-rendered narrative fields
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LanguageTag {
    /// English
    En,
    /// Hindi
    Hi,
}

/// Command-line arguments for finsight
#[derive(Clone, Parser, Debug)]
#[command(
    name = "finsight",
    version,
    about = "Financial health dashboard in the terminal",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Spreadsheet (CSV or Excel) to upload as soon as the dashboard starts
    #[arg(long = "upload", value_name = "PATH")]
    pub upload: Option<std::path::PathBuf>,

    /// Backend API base URL (overrides config [service] base_url). Example: http://localhost:8000/api/v1
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Account (company) id the dashboard belongs to
    #[arg(long = "account-id", value_name = "ID")]
    pub account_id: Option<u64>,

    /// Industry sent with uploads so the analysis can use sector benchmarks (default: General)
    #[arg(long = "industry", value_name = "NAME")]
    pub industry: Option<String>,

    /// Language for narrative fields (en, hi)
    #[arg(long = "lang", value_enum)]
    pub lang: Option<LanguageTag>,

    /// HTTP timeout in seconds for snapshot and upload requests
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Ingest spreadsheets locally instead of talking to the backend
    #[arg(long = "offline", action)]
    pub offline: bool,

    /// Number of rows kept from an uploaded spreadsheet in offline mode (default: 100)
    #[arg(long = "sample-rows", value_name = "N")]
    pub sample_rows: Option<usize>,

    /// Load the last uploaded dataset on start instead of beginning with an empty dashboard
    #[arg(long = "keep-previous", action)]
    pub keep_previous: bool,

    /// Also ask the backend to hide its dashboard data when the start-up clear is honored (default: false)
    #[arg(long = "clear-remote-on-refresh", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub clear_remote_on_refresh: Option<bool>,

    /// Colorize table cells by column kind (default: true). Set to false to disable.
    #[arg(long = "column-colors", value_name = "BOOL", value_parser = clap::value_parser!(bool))]
    pub column_colors: Option<bool>,

    /// Write logs to this file (default: finsight.log in the cache directory)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<std::path::PathBuf>,

    /// Log level filter (error, warn, info, debug, trace). RUST_LOG takes precedence when set.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Enable debug mode to show session state in a status row
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Delete cached files (the default log file) and exit
    #[arg(long = "clear-cache", action)]
    pub clear_cache: bool,

    /// Generate default configuration file at ~/.config/finsight/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let mut parts = Vec::new();
        if let Some(s) = arg.get_short() {
            parts.push(format!("-{s}"));
        }
        if let Some(l) = arg.get_long() {
            parts.push(format!("--{l}"));
        }
        let op = parts.join(", ");
        let placeholder: String = if arg.get_action().takes_values() {
            arg.get_value_names()
                .map(|names| {
                    names
                        .iter()
                        .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default()
        } else {
            String::new()
        };
        let option_str = if placeholder.is_empty() {
            op
        } else {
            format!("{op} {placeholder}")
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
