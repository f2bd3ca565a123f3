use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::{Arc, RwLock};

use crate::config::{save_config, Config};
use crate::usage::loader::load_usage;
use crate::usage::types::{EmptyState, LoadOptions, Period, Source, UsageResponse};

use super::dto::*;

/// Shared application state
pub struct AppState {
    pub config: RwLock<Config>,
}

/// Serve one canonical usage report.
///
/// `source` and `period` are required; a missing or unrecognized value is a
/// 400 whose body still matches the canonical shape so clients render it
/// like any other soft failure.
pub async fn get_usage(
    State(_state): State<Arc<AppState>>,
    Query(params): Query<UsageQuery>,
) -> impl IntoResponse {
    let (source, period) = match parse_target(&params) {
        Ok(target) => target,
        Err(rejection) => return rejection,
    };

    let options = build_options(&params);
    let response = load_usage(source, period, &options).await;
    (StatusCode::OK, Json(response))
}

/// Serve the overview page's four reports, loaded concurrently. A failure in
/// one load degrades that one report only; the join waits for the slowest.
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsageQuery>,
) -> impl IntoResponse {
    let source = match &params.source {
        Some(raw) => match raw.parse::<Source>() {
            Ok(source) => source,
            Err(message) => return reject(None, None, message).into_response(),
        },
        None => state.config.read().unwrap().defaults.source,
    };

    let options = build_options(&params);
    let (daily, weekly, monthly, sessions) = tokio::join!(
        load_usage(source, Period::Daily, &options),
        load_usage(source, Period::Weekly, &options),
        load_usage(source, Period::Monthly, &options),
        load_usage(source, Period::Session, &options),
    );

    Json(OverviewDto {
        daily,
        weekly,
        monthly,
        sessions,
    })
    .into_response()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Get the persisted dashboard settings
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read().unwrap();
    Json(ApiResponse::success(config_dto(&config)))
}

/// Update dashboard settings; unknown enum values are rejected, everything
/// else is stored as sent.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConfigUpdateRequest>,
) -> impl IntoResponse {
    let mut config = state.config.write().unwrap();

    if let Some(raw) = req.default_source {
        match raw.parse() {
            Ok(source) => config.defaults.source = source,
            Err(message) => return Json(ApiResponse::<ConfigDto>::error(message)),
        }
    }
    if let Some(raw) = req.cost_mode {
        match raw.parse() {
            Ok(mode) => config.defaults.cost_mode = mode,
            Err(message) => return Json(ApiResponse::<ConfigDto>::error(message)),
        }
    }
    if let Some(start_of_week) = req.start_of_week {
        config.defaults.start_of_week = start_of_week;
    }
    if let Some(timezone) = req.timezone {
        config.defaults.timezone = timezone;
    }
    if let Some(show) = req.show_breakdown {
        config.defaults.show_breakdown = show;
    }

    if let Err(e) = save_config(&config) {
        return Json(ApiResponse::<ConfigDto>::error(format!(
            "Failed to save config: {}",
            e
        )));
    }

    Json(ApiResponse::success(config_dto(&config)))
}

fn config_dto(config: &Config) -> ConfigDto {
    ConfigDto {
        default_source: config.defaults.source,
        cost_mode: config.defaults.cost_mode,
        start_of_week: config.defaults.start_of_week.clone(),
        timezone: config.defaults.timezone.clone(),
        show_breakdown: config.defaults.show_breakdown,
        port: config.server.port,
    }
}

// Helper functions

type Rejection = (StatusCode, Json<UsageResponse>);

fn parse_target(params: &UsageQuery) -> Result<(Source, Period), Rejection> {
    let source = match &params.source {
        Some(raw) => Some(raw.parse::<Source>().map_err(|m| reject(None, None, m))?),
        None => None,
    };
    let period = match &params.period {
        Some(raw) => Some(raw.parse::<Period>().map_err(|m| reject(source, None, m))?),
        None => None,
    };

    match (source, period) {
        (Some(source), Some(period)) => Ok((source, period)),
        (source, period) => Err(reject(
            source,
            period,
            "missing required query parameters 'source' and 'period'",
        )),
    }
}

/// A 400 whose body keeps the canonical shape: empty collections, one
/// explanatory error, default empty-state.
fn reject(
    source: Option<Source>,
    period: Option<Period>,
    message: impl Into<String>,
) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(UsageResponse::empty(
            source.unwrap_or(Source::Claude),
            period.unwrap_or(Period::Daily),
            EmptyState::default(),
            vec![message.into()],
        )),
    )
}

fn build_options(params: &UsageQuery) -> LoadOptions {
    LoadOptions {
        // An unrecognized mode degrades to the default rather than failing,
        // same as an unrecognized week-start name.
        mode: params.mode.as_deref().and_then(|m| m.parse().ok()),
        timezone: params.timezone.clone(),
        start_of_week: params.start_of_week.clone(),
        breakdown: params.breakdown.unwrap_or(false),
    }
}
