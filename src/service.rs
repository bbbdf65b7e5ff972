//! Boundary to the analytics backend.
//!
//! [`DataService`] is the only way the dashboard reaches data. [`HttpDataService`] talks to
//! the REST API; [`crate::ingest::LocalDataService`] reads spreadsheets on this machine.

use crate::dataset::RawDataset;
use finsight_cli::LanguageTag;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Narrative language. The tag is forwarded to the backend untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    #[default]
    Hi,
}

impl Locale {
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Hi => "hi",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "hi" => Some(Locale::Hi),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Locale::En => Locale::Hi,
            Locale::Hi => Locale::En,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Locale::En => "English",
            Locale::Hi => "हिन्दी",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<LanguageTag> for Locale {
    fn from(tag: LanguageTag) -> Self {
        match tag {
            LanguageTag::En => Locale::En,
            LanguageTag::Hi => Locale::Hi,
        }
    }
}

pub type AccountId = u64;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("could not reach the server: {0}")]
    Transport(String),
    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Headline figures computed by the backend from the uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialMetrics {
    pub total_revenue: Option<f64>,
    pub total_expenses: Option<f64>,
    pub net_profit: Option<f64>,
    pub profit_margin: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub accounts_receivable: Option<f64>,
    pub accounts_payable: Option<f64>,
    pub inventory_value: Option<f64>,
    pub total_debt: Option<f64>,
    /// Largest expense categories, biggest first.
    #[serde(skip)]
    pub top_expenses: Vec<CategoryAmount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: f64,
}

impl FinancialMetrics {
    /// Labelled figures for display, skipping the ones the backend did not send.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        [
            ("Revenue", self.total_revenue),
            ("Expenses", self.total_expenses),
            ("Net profit", self.net_profit),
            ("Profit margin %", self.profit_margin),
            ("Expense ratio %", self.expense_ratio),
            ("Receivables", self.accounts_receivable),
            ("Payables", self.accounts_payable),
            ("Inventory", self.inventory_value),
            ("Debt", self.total_debt),
        ]
        .into_iter()
        .filter_map(|(label, v)| v.map(|v| (label, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Risk {
    pub kind: Option<String>,
    pub severity: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkingCapital {
    /// `Good`, `Warning` or `Critical`.
    pub status: Option<String>,
    pub message: Option<String>,
}

/// Industry averages, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Benchmarks {
    pub profit_margin_avg: Option<f64>,
    pub expense_ratio_avg: Option<f64>,
    pub revenue_growth_avg: Option<f64>,
    pub user_comparison: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: String,
    pub impact: Option<String>,
    pub category: Option<String>,
}

/// Model-written commentary. Regenerated per locale; everything else in a snapshot is not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Narrative {
    pub health_score: Option<f64>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub risks: Vec<Risk>,
    pub recommendations: Vec<Recommendation>,
    pub forecast: Option<String>,
    pub creditworthiness_score: Option<f64>,
    pub creditworthiness_rationale: Option<String>,
    pub working_capital: Option<WorkingCapital>,
    pub benchmarks: Option<Benchmarks>,
}

/// Everything the dashboard shows for one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub has_data: bool,
    pub report_id: Option<String>,
    pub records: RawDataset,
    pub metrics: FinancialMetrics,
    pub narrative: Narrative,
}

impl Snapshot {
    pub fn no_data() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReceipt {
    pub upload_id: Option<String>,
    pub rows: Option<usize>,
}

pub trait DataService: Send + Sync {
    fn get_snapshot(&self, locale: Locale, account: AccountId) -> Result<Snapshot, ServiceError>;

    fn upload_dataset(
        &self,
        path: &Path,
        locale: Locale,
        account: AccountId,
    ) -> Result<UploadReceipt, ServiceError>;

    /// Hide the current dashboard data for `account`. History is kept by the backend.
    fn clear_dashboard(&self, account: AccountId) -> Result<(), ServiceError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DashboardResponse {
    has_data: bool,
    report_id: Option<Value>,
    financial_data: FinancialData,
    ai_analysis: AiAnalysis,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FinancialData {
    #[serde(flatten)]
    metrics: FinancialMetrics,
    top_expenses: Vec<Value>,
    generic_metadata: GenericMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenericMetadata {
    sample_data: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AiAnalysis {
    health_score: Option<f64>,
    status: Option<String>,
    summary: Option<String>,
    risks: Vec<Value>,
    recommendations: Vec<Value>,
    forecast_narrative: Option<String>,
    creditworthiness_score: Option<Value>,
    creditworthiness_rationale: Option<String>,
    // Raw model output nests score and rationale here.
    creditworthiness: Option<Value>,
    working_capital_analysis: Option<Value>,
    industry_benchmarks: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UploadResponse {
    upload_id: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    detail: Option<Value>,
}

fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// A number, or a string holding one. Models are not consistent about which.
fn num_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

fn num_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(num_value)
}

/// Non-empty object, or nothing. The backend sends `{}` for "not analysed".
fn non_empty_object(value: Option<&Value>) -> Option<&serde_json::Map<String, Value>> {
    value.and_then(Value::as_object).filter(|o| !o.is_empty())
}

fn category_amount_from(value: &Value) -> Option<CategoryAmount> {
    let obj = value.as_object()?;
    let category = match obj.get("category")? {
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };
    Some(CategoryAmount {
        category,
        amount: num_field(obj, "amount")?,
    })
}

fn working_capital_from(value: Option<&Value>) -> Option<WorkingCapital> {
    let obj = non_empty_object(value)?;
    Some(WorkingCapital {
        status: str_field(obj, "status"),
        message: str_field(obj, "message"),
    })
}

fn benchmarks_from(value: Option<&Value>) -> Option<Benchmarks> {
    let obj = non_empty_object(value)?;
    Some(Benchmarks {
        profit_margin_avg: num_field(obj, "profit_margin_avg"),
        expense_ratio_avg: num_field(obj, "expense_ratio_avg"),
        revenue_growth_avg: num_field(obj, "revenue_growth_avg"),
        user_comparison: str_field(obj, "user_comparison"),
    })
}

fn risk_from(value: &Value) -> Option<Risk> {
    match value {
        Value::String(s) => Some(Risk {
            message: s.clone(),
            ..Risk::default()
        }),
        Value::Object(obj) => Some(Risk {
            kind: str_field(obj, "type"),
            severity: str_field(obj, "severity"),
            message: str_field(obj, "message").unwrap_or_default(),
        }),
        _ => None,
    }
}

fn recommendation_from(value: &Value) -> Option<Recommendation> {
    match value {
        Value::String(s) => Some(Recommendation {
            action: s.clone(),
            ..Recommendation::default()
        }),
        Value::Object(obj) => Some(Recommendation {
            action: str_field(obj, "action").unwrap_or_default(),
            impact: str_field(obj, "impact"),
            category: str_field(obj, "category"),
        }),
        _ => None,
    }
}

impl From<AiAnalysis> for Narrative {
    fn from(ai: AiAnalysis) -> Self {
        let nested_credit = non_empty_object(ai.creditworthiness.as_ref());
        let creditworthiness_score = ai
            .creditworthiness_score
            .as_ref()
            .and_then(num_value)
            .or_else(|| nested_credit.and_then(|c| num_field(c, "score")));
        let creditworthiness_rationale = ai
            .creditworthiness_rationale
            .filter(|r| !r.is_empty())
            .or_else(|| nested_credit.and_then(|c| str_field(c, "rationale")));
        Self {
            creditworthiness_score,
            creditworthiness_rationale,
            working_capital: working_capital_from(ai.working_capital_analysis.as_ref()),
            benchmarks: benchmarks_from(ai.industry_benchmarks.as_ref()),
            health_score: ai.health_score,
            status: ai.status,
            summary: ai.summary,
            risks: ai.risks.iter().filter_map(risk_from).collect(),
            recommendations: ai.recommendations.iter().filter_map(recommendation_from).collect(),
            forecast: ai.forecast_narrative,
        }
    }
}

impl From<DashboardResponse> for Snapshot {
    fn from(resp: DashboardResponse) -> Self {
        if !resp.has_data {
            return Snapshot::no_data();
        }
        Self {
            has_data: true,
            report_id: id_string(resp.report_id),
            records: RawDataset::from_json_rows(&resp.financial_data.generic_metadata.sample_data),
            metrics: FinancialMetrics {
                top_expenses: resp
                    .financial_data
                    .top_expenses
                    .iter()
                    .filter_map(category_amount_from)
                    .collect(),
                ..resp.financial_data.metrics
            },
            narrative: resp.ai_analysis.into(),
        }
    }
}

/// Decode the body of `GET /financial/dashboard`.
pub fn parse_snapshot(body: &str) -> Result<Snapshot, ServiceError> {
    let resp: DashboardResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
    Ok(resp.into())
}

/// Pull the message out of a `{"detail": ...}` error body, falling back to the raw text.
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.detail) {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(feature = "http")]
pub use http::HttpDataService;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::ServiceConfig;
    use finsight_cli::SpreadsheetFormat;
    use std::time::Duration;

    /// REST client for the analytics backend.
    pub struct HttpDataService {
        agent: ureq::Agent,
        base_url: String,
        industry: String,
    }

    impl HttpDataService {
        pub fn new(base_url: &str, industry: &str, timeout: Duration) -> Self {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            Self {
                agent,
                base_url: base_url.trim_end_matches('/').to_string(),
                industry: industry.to_string(),
            }
        }

        pub fn from_config(config: &ServiceConfig) -> Self {
            Self::new(
                &config.base_url,
                &config.industry,
                Duration::from_secs(config.timeout_secs),
            )
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }
    }

    fn into_service_error(err: ureq::Error) -> ServiceError {
        match err {
            ureq::Error::Status(code, response) => {
                let body = response.into_string().unwrap_or_default();
                ServiceError::Status {
                    code,
                    message: error_detail(&body),
                }
            }
            ureq::Error::Transport(t) => ServiceError::Transport(t.to_string()),
        }
    }

    /// A multipart boundary that does not occur in `contents`.
    fn boundary_for(contents: &[u8], mut token: impl FnMut() -> u64) -> String {
        loop {
            let boundary = format!("finsight-{:016x}", token());
            if !contents
                .windows(boundary.len())
                .any(|w| w == boundary.as_bytes())
            {
                return boundary;
            }
        }
    }

    fn multipart_body(boundary: &str, file_name: &str, mime: &str, contents: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(contents.len() + 256);
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name.replace('"', "")
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    impl DataService for HttpDataService {
        fn get_snapshot(
            &self,
            locale: Locale,
            account: AccountId,
        ) -> Result<Snapshot, ServiceError> {
            let response = self
                .agent
                .get(&self.url("/financial/dashboard"))
                .query("lang", locale.tag())
                .query("id", &account.to_string())
                .call()
                .map_err(into_service_error)?;
            let body = response.into_string()?;
            parse_snapshot(&body)
        }

        fn upload_dataset(
            &self,
            path: &Path,
            locale: Locale,
            account: AccountId,
        ) -> Result<UploadReceipt, ServiceError> {
            let format = SpreadsheetFormat::from_path(path)
                .ok_or_else(|| ServiceError::UnsupportedFormat(path.display().to_string()))?;
            let contents = std::fs::read(path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("upload.{}", format.extension()));
            tracing::info!(file = %file_name, bytes = contents.len(), "uploading dataset");

            let boundary = boundary_for(&contents, || fastrand::u64(..));
            let body = multipart_body(&boundary, &file_name, format.mime_type(), &contents);
            let response = self
                .agent
                .post(&self.url("/financial/upload"))
                .query("lang", locale.tag())
                .query("industry", &self.industry)
                .query("id", &account.to_string())
                .set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={boundary}"),
                )
                .send_bytes(&body)
                .map_err(into_service_error)?;
            let resp: UploadResponse = response
                .into_json()
                .map_err(|e| ServiceError::Decode(e.to_string()))?;
            Ok(UploadReceipt {
                upload_id: id_string(resp.upload_id),
                rows: None,
            })
        }

        fn clear_dashboard(&self, account: AccountId) -> Result<(), ServiceError> {
            self.agent
                .post(&self.url("/financial/dashboard/clear"))
                .query("id", &account.to_string())
                .call()
                .map_err(into_service_error)?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_multipart_body_layout() {
            let body = multipart_body("b0", "q1.csv", "text/csv", b"a,b\n1,2\n");
            let text = String::from_utf8(body).unwrap();
            assert!(text.starts_with("--b0\r\n"));
            assert!(text.contains("name=\"file\"; filename=\"q1.csv\""));
            assert!(text.contains("Content-Type: text/csv\r\n\r\na,b\n1,2\n\r\n"));
            assert!(text.ends_with("--b0--\r\n"));
        }

        #[test]
        fn test_boundary_avoids_file_contents() {
            let contents = b"note\n--finsight-0000000000000001\n";
            let mut tokens = [1u64, 2].into_iter();
            let boundary = boundary_for(contents, || tokens.next().unwrap_or(3));
            assert_eq!(boundary, "finsight-0000000000000002");

            let a = boundary_for(b"", || fastrand::u64(..));
            let b = boundary_for(b"", || fastrand::u64(..));
            assert_ne!(a, b);
        }

        #[test]
        fn test_base_url_trailing_slash() {
            let svc = HttpDataService::new("http://localhost:8000/api/v1/", "Retail", Duration::from_secs(5));
            assert_eq!(
                svc.url("/financial/dashboard"),
                "http://localhost:8000/api/v1/financial/dashboard"
            );
        }
    }
}
