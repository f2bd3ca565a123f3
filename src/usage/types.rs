use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upstream usage-tracking agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Claude,
    Opencode,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Claude => "claude",
            Source::Opencode => "opencode",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(Source::Claude),
            "opencode" => Ok(Source::Opencode),
            other => Err(format!(
                "unknown source '{}'; expected 'claude' or 'opencode'",
                other
            )),
        }
    }
}

/// Reporting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Session,
    Blocks,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Session => "session",
            Period::Blocks => "blocks",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "session" => Ok(Period::Session),
            "blocks" => Ok(Period::Blocks),
            other => Err(format!(
                "unknown period '{}'; expected daily, weekly, monthly, session or blocks",
                other
            )),
        }
    }
}

/// How session costs are resolved: recorded values, recomputed from the
/// pricing table, or recorded-with-recompute-fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    #[default]
    Auto,
    Calculate,
    Display,
}

impl CostMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CostMode::Auto => "auto",
            CostMode::Calculate => "calculate",
            CostMode::Display => "display",
        }
    }
}

impl FromStr for CostMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(CostMode::Auto),
            "calculate" => Ok(CostMode::Calculate),
            "display" => Ok(CostMode::Display),
            other => Err(format!(
                "unknown cost mode '{}'; expected auto, calculate or display",
                other
            )),
        }
    }
}

/// Request-scoped load parameters. These always arrive explicitly from the
/// caller (query params or CLI flags), never from ambient state.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub mode: Option<CostMode>,
    pub timezone: Option<String>,
    pub start_of_week: Option<String>,
    pub breakdown: bool,
}

/// Headline numbers for a periodic (daily/weekly/monthly) report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub period: Period,
    pub start: String,
    pub total_tokens: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
}

impl UsageSummary {
    /// Zero-valued summary used when a weekly/monthly report has no entries.
    pub fn zero(period: Period) -> Self {
        UsageSummary {
            period,
            start: String::new(),
            total_tokens: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cost_usd: 0.0,
        }
    }
}

/// One chart point in a periodic report, in upstream chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub label: String,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    pub total_tokens: u64,
}

/// One session row for the session drill-down view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub source: Source,
    pub last_activity: String,
    pub total_tokens: u64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
    pub models_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
}

/// One billing-block row (claude only).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub block_id: String,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    pub total_tokens: u64,
    #[serde(rename = "costUSD")]
    pub cost_usd: f64,
    pub models: Vec<String>,
}

/// Whether any local data exists for a source, with remediation guidance
/// when it does not. Computed once per request, before any invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyState {
    pub is_empty: bool,
    pub missing_paths: Vec<String>,
    pub checklist: Vec<String>,
}

/// The canonical shape every view consumes. Exactly one of `summary`/`series`,
/// `sessions` or `blocks` is meaningfully populated per period; the collection
/// fields are always present so consumers need no null checks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub source: Source,
    pub period: Period,
    pub summary: Option<UsageSummary>,
    pub series: Vec<SeriesPoint>,
    pub sessions: Vec<SessionSummary>,
    pub blocks: Vec<BlockSummary>,
    pub empty_state: EmptyState,
    pub errors: Vec<String>,
}

impl UsageResponse {
    /// A response with no data: used for short-circuits and absorbed failures.
    pub fn empty(
        source: Source,
        period: Period,
        empty_state: EmptyState,
        errors: Vec<String>,
    ) -> Self {
        UsageResponse {
            source,
            period,
            summary: None,
            series: Vec::new(),
            sessions: Vec::new(),
            blocks: Vec::new(),
            empty_state,
            errors,
        }
    }
}
