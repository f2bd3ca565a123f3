use anyhow::Result;
use serde_json::Value;

use super::normalize::{self, NormalizedData};
use super::periods::{self, PeriodWindow};
use super::pricing::PricingData;
use super::types::{EmptyState, LoadOptions, Period, Source, UsageResponse};
use super::{empty_state, filter, invoke, scanner};

/// Produce the canonical response for one (source, period, options) request.
///
/// This never fails: unsupported combinations and invocation errors become
/// entries in the response's `errors` list, and a detected empty state
/// short-circuits before any external work happens.
pub async fn load_usage(source: Source, period: Period, options: &LoadOptions) -> UsageResponse {
    if source == Source::Opencode && period == Period::Blocks {
        return UsageResponse::empty(
            source,
            period,
            EmptyState {
                is_empty: true,
                missing_paths: Vec::new(),
                checklist: Vec::new(),
            },
            vec!["Blocks reports are not supported for OpenCode".to_string()],
        );
    }

    let empty = empty_state::detect(source);
    if empty.is_empty {
        // Expected condition, not a failure: no error is recorded.
        return UsageResponse::empty(source, period, empty, Vec::new());
    }

    match load_normalized(source, period, options).await {
        Ok(data) => UsageResponse {
            source,
            period,
            summary: data.summary,
            series: data.series,
            sessions: data.sessions,
            blocks: data.blocks,
            empty_state: empty,
            errors: Vec::new(),
        },
        Err(err) => UsageResponse::empty(source, period, empty, vec![err.to_string()]),
    }
}

async fn load_normalized(
    source: Source,
    period: Period,
    options: &LoadOptions,
) -> Result<NormalizedData> {
    let window = periods::resolve_window(period, options.start_of_week.as_deref());

    match source {
        // The transcript scanner covers every claude period except blocks,
        // skipping the spawn-and-parse round trip entirely.
        Source::Claude if period != Period::Blocks => {
            load_claude_scanned(period, &window, options)
        }
        Source::Claude => {
            let args = invoke::claude_command(period, &window, options);
            let raw = invoke::run_json_command(&args, &[("CCUSAGE_OFFLINE", "1")]).await?;
            Ok(normalize_for(period, &raw, source))
        }
        Source::Opencode => {
            let args = invoke::opencode_command(period);
            let raw = invoke::run_json_command(&args, &[]).await?;
            let filtered = filter::filter_report(&raw, period, &window);
            Ok(normalize_for(period, &filtered, source))
        }
    }
}

fn normalize_for(period: Period, raw: &Value, source: Source) -> NormalizedData {
    match period {
        Period::Daily => normalize::normalize_daily(raw),
        Period::Weekly => normalize::normalize_weekly(raw),
        Period::Monthly => normalize::normalize_monthly(raw),
        Period::Session => normalize::normalize_sessions(raw, source),
        Period::Blocks => normalize::normalize_blocks(raw),
    }
}

/// The in-process path: scan local transcripts into typed records, window
/// them, and feed them through the same normalizers as CLI payloads.
fn load_claude_scanned(
    period: Period,
    window: &PeriodWindow,
    options: &LoadOptions,
) -> Result<NormalizedData> {
    let mode = options.mode.unwrap_or_default();
    let pricing = PricingData::load_offline();
    let sessions = scanner::scan_sessions(mode, &pricing);

    let since = periods::yyyymmdd_to_iso(&window.since);
    let until = periods::yyyymmdd_to_iso(&window.until);

    match period {
        Period::Daily => {
            let records: Vec<_> = scanner::daily_records(&sessions)
                .into_iter()
                .filter(|r| r.date >= since && r.date <= until)
                .collect();
            Ok(normalize::normalize_daily(&serde_json::to_value(records)?))
        }
        Period::Weekly => {
            let start = periods::parse_week_start(options.start_of_week.as_deref());
            let records = scanner::weekly_records(&sessions, start);
            Ok(normalize::normalize_weekly(&serde_json::to_value(records)?))
        }
        Period::Monthly => {
            let target = since.get(..7).unwrap_or(&since).to_string();
            let records = scanner::monthly_records(&sessions);
            let matched: Vec<_> = records
                .iter()
                .filter(|r| r.month == target)
                .cloned()
                .collect();
            // No bucket for the current month: serve all history instead of
            // an empty chart.
            let chosen = if matched.is_empty() { records } else { matched };
            Ok(normalize::normalize_monthly(&serde_json::to_value(chosen)?))
        }
        Period::Session => {
            let records: Vec<_> = scanner::session_records(&sessions)
                .into_iter()
                .filter(|r| r.last_activity >= since && r.last_activity <= until)
                .collect();
            Ok(normalize::normalize_sessions(
                &serde_json::to_value(records)?,
                Source::Claude,
            ))
        }
        Period::Blocks => anyhow::bail!("blocks reports use the command path"),
    }
}
