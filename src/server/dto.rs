use serde::{Deserialize, Serialize};

use crate::usage::types::{CostMode, Source, UsageResponse};

/// Generic API response wrapper for the config endpoints.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Query parameters for `/api/usage` and `/api/overview`. Everything is
/// optional at the wire level; the handlers decide what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub source: Option<String>,
    pub period: Option<String>,
    pub mode: Option<String>,
    pub timezone: Option<String>,
    pub start_of_week: Option<String>,
    pub breakdown: Option<bool>,
}

/// The four concurrently loaded reports backing the overview page.
#[derive(Serialize)]
pub struct OverviewDto {
    pub daily: UsageResponse,
    pub weekly: UsageResponse,
    pub monthly: UsageResponse,
    pub sessions: UsageResponse,
}

/// Dashboard settings exposed over `/api/config`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDto {
    pub default_source: Source,
    pub cost_mode: CostMode,
    pub start_of_week: String,
    pub timezone: String,
    pub show_breakdown: bool,
    pub port: u16,
}

/// Partial settings update; absent fields keep their current value.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdateRequest {
    pub default_source: Option<String>,
    pub cost_mode: Option<String>,
    pub start_of_week: Option<String>,
    pub timezone: Option<String>,
    pub show_breakdown: Option<bool>,
}
