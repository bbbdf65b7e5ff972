//! User-facing error message formatting.
//!
//! Matches on error types (ServiceError, PolarsError variants, io::ErrorKind) rather than
//! parsing strings, so the status line never shows a raw backtrace or HTTP dump.

use crate::service::ServiceError;
use polars::prelude::PolarsError;
use std::io;
use std::path::Path;

/// Message shown in the dashboard when a backend or ingest call fails.
pub fn user_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Transport(msg) => format!("Could not reach the analytics server: {}", msg),
        ServiceError::Status { code, message } => match code {
            404 => format!("Not found: {}", message),
            401 | 403 => format!("Access denied: {}", message),
            400 | 422 => format!("Rejected by the server: {}", message),
            500..=599 => format!("Server error ({}): {}", code, message),
            _ => format!("Request failed ({}): {}", code, message),
        },
        ServiceError::Decode(msg) => format!("Unexpected response from the server: {}", msg),
        ServiceError::Io(e) => user_message_from_io(e, None),
        ServiceError::UnsupportedFormat(path) => format!(
            "Unsupported file type: {}. Upload a .csv, .xlsx or .xls file.",
            path
        ),
        ServiceError::Spreadsheet(msg) => format!("Could not read spreadsheet: {}", msg),
        ServiceError::Polars(e) => user_message_from_polars(e),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!("Column not found: {}", msg),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Inconsistent column types: {}", msg),
        PE::ShapeMismatch(msg) => format!("Rows have different lengths: {}", msg),
        PE::ComputeError(msg) => format!("Could not parse file: {}", msg),
        PE::Context { error, msg } => format!("{}: {}", msg, user_message_from_polars(error)),
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::ConnectionRefused => "Connection refused.".to_string(),
        ErrorKind::ConnectionReset => "Connection reset.".to_string(),
        ErrorKind::TimedOut => "Timed out.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => "Invalid or corrupted data.".to_string(),
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find ServiceError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let msg = report
        .chain()
        .find_map(|cause| {
            if let Some(se) = cause.downcast_ref::<ServiceError>() {
                Some(user_message(se))
            } else if let Some(pe) = cause.downcast_ref::<PolarsError>() {
                Some(user_message_from_polars(pe))
            } else {
                cause
                    .downcast_ref::<io::Error>()
                    .map(|e| user_message_from_io(e, None))
            }
        })
        .unwrap_or_else(|| {
            // First line only; the rest is usually a backtrace.
            let display = report.to_string();
            display
                .lines()
                .next()
                .unwrap_or("An error occurred")
                .trim()
                .to_string()
        });

    match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    }
}
