use serde_json::Value;

use super::types::{
    BlockSummary, Period, SeriesPoint, SessionSummary, Source, UsageSummary,
};

/// Output of one normalizer: exactly one of the four fields is meaningfully
/// populated per period type, the rest stay empty.
#[derive(Debug, Clone, Default)]
pub struct NormalizedData {
    pub summary: Option<UsageSummary>,
    pub series: Vec<SeriesPoint>,
    pub sessions: Vec<SessionSummary>,
    pub blocks: Vec<BlockSummary>,
}

// Ordered-fallback field aliases. The two upstream agents (and the two
// invocation paths) disagree on names, so every lookup tries each alias in
// order instead of branching on source.
const COST_ALIASES: &[&str] = &["totalCost", "costUSD", "totalCostUSD"];
const MODEL_ALIASES: &[&str] = &["modelsUsed", "models"];
const INPUT_ALIASES: &[&str] = &["inputTokens", "totalInputTokens"];
const OUTPUT_ALIASES: &[&str] = &["outputTokens", "totalOutputTokens"];
const CACHE_CREATE_ALIASES: &[&str] = &["cacheCreationTokens", "cacheCreationInputTokens"];
const CACHE_READ_ALIASES: &[&str] = &["cacheReadTokens", "cacheReadInputTokens"];

fn opt_uint(entry: &Value, aliases: &[&str]) -> Option<u64> {
    aliases
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_u64))
}

fn uint_field(entry: &Value, aliases: &[&str]) -> u64 {
    opt_uint(entry, aliases).unwrap_or(0)
}

fn float_field(entry: &Value, aliases: &[&str]) -> f64 {
    aliases
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_f64))
        .unwrap_or(0.0)
}

fn str_field(entry: &Value, aliases: &[&str]) -> String {
    opt_str(entry, aliases).unwrap_or_default()
}

fn opt_str(entry: &Value, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn string_list(entry: &Value, aliases: &[&str]) -> Vec<String> {
    aliases
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn cost_of(entry: &Value) -> f64 {
    float_field(entry, COST_ALIASES)
}

/// Sum of the four token sub-categories.
fn derived_tokens(entry: &Value) -> u64 {
    uint_field(entry, INPUT_ALIASES)
        + uint_field(entry, OUTPUT_ALIASES)
        + uint_field(entry, CACHE_CREATE_ALIASES)
        + uint_field(entry, CACHE_READ_ALIASES)
}

/// An entry's token total: the explicit total when present and nonzero,
/// otherwise derived from the four sub-categories. A present-but-zero total
/// is treated the same as absent.
fn token_total(entry: &Value) -> u64 {
    match opt_uint(entry, &["totalTokens"]) {
        Some(total) if total > 0 => total,
        _ => derived_tokens(entry),
    }
}

/// Resolve a payload to its ordered entry sequence: either the payload is the
/// bare array itself, or an object wrapping it under one of `envelope_keys`.
fn unwrap_entries(raw: &Value, envelope_keys: &[&str]) -> Vec<Value> {
    if let Some(entries) = raw.as_array() {
        return entries.clone();
    }
    for key in envelope_keys {
        if let Some(entries) = raw.get(key).and_then(Value::as_array) {
            return entries.clone();
        }
    }
    Vec::new()
}

fn series_points(entries: &[Value], label_aliases: &[&str]) -> Vec<SeriesPoint> {
    entries
        .iter()
        .map(|entry| SeriesPoint {
            label: str_field(entry, label_aliases),
            cost_usd: cost_of(entry),
            total_tokens: token_total(entry),
        })
        .collect()
}

#[derive(Debug, Default)]
struct Totals {
    input: u64,
    output: u64,
    tokens: u64,
    cost: f64,
}

fn totals_from_entries(entries: &[Value]) -> Totals {
    let mut totals = Totals::default();
    for entry in entries {
        totals.input += uint_field(entry, INPUT_ALIASES);
        totals.output += uint_field(entry, OUTPUT_ALIASES);
        totals.tokens += token_total(entry);
        totals.cost += cost_of(entry);
    }
    totals
}

fn totals_from_value(value: &Value) -> Totals {
    Totals {
        input: uint_field(value, INPUT_ALIASES),
        output: uint_field(value, OUTPUT_ALIASES),
        tokens: token_total(value),
        cost: float_field(value, &["totalCostUSD", "totalCost", "costUSD"]),
    }
}

fn summary_from_totals(period: Period, start: String, totals: Totals) -> UsageSummary {
    UsageSummary {
        period,
        start,
        total_tokens: totals.tokens,
        total_input_tokens: totals.input,
        total_output_tokens: totals.output,
        total_cost_usd: totals.cost,
    }
}

/// Daily report: one series point per day, summary reflecting the most
/// recent entry. An empty report has no summary.
pub fn normalize_daily(raw: &Value) -> NormalizedData {
    let entries = unwrap_entries(raw, &["daily", "data"]);
    let series = series_points(&entries, &["date"]);
    let summary = entries.last().map(|latest| UsageSummary {
        period: Period::Daily,
        start: str_field(latest, &["date"]),
        total_tokens: token_total(latest),
        total_input_tokens: uint_field(latest, INPUT_ALIASES),
        total_output_tokens: uint_field(latest, OUTPUT_ALIASES),
        total_cost_usd: cost_of(latest),
    });

    NormalizedData {
        summary,
        series,
        ..Default::default()
    }
}

/// Weekly report: aggregate summary across all buckets, preferring an
/// explicit upstream `totals` object over a locally recomputed sum. An empty
/// report yields a zero-valued summary, never `None`.
pub fn normalize_weekly(raw: &Value) -> NormalizedData {
    let entries = unwrap_entries(raw, &["weekly", "data"]);
    let series = series_points(&entries, &["week"]);
    let summary = if entries.is_empty() {
        UsageSummary::zero(Period::Weekly)
    } else {
        let totals = raw
            .get("totals")
            .filter(|v| v.is_object())
            .map(totals_from_value)
            .unwrap_or_else(|| totals_from_entries(&entries));
        summary_from_totals(Period::Weekly, str_field(&entries[0], &["week"]), totals)
    };

    NormalizedData {
        summary: Some(summary),
        series,
        ..Default::default()
    }
}

/// Monthly report: like weekly, with the aggregate accepted under either a
/// `summary` or `totals` envelope key.
pub fn normalize_monthly(raw: &Value) -> NormalizedData {
    let entries = unwrap_entries(raw, &["monthly", "data"]);
    let series = series_points(&entries, &["month"]);
    let summary = if entries.is_empty() {
        UsageSummary::zero(Period::Monthly)
    } else {
        let totals = raw
            .get("summary")
            .or_else(|| raw.get("totals"))
            .filter(|v| v.is_object())
            .map(totals_from_value)
            .unwrap_or_else(|| totals_from_entries(&entries));
        summary_from_totals(Period::Monthly, str_field(&entries[0], &["month"]), totals)
    };

    NormalizedData {
        summary: Some(summary),
        series,
        ..Default::default()
    }
}

/// Session report: one row per session, tagged with the requesting source
/// since the payload does not reliably carry it.
pub fn normalize_sessions(raw: &Value, source: Source) -> NormalizedData {
    let entries = unwrap_entries(raw, &["sessions", "data"]);
    let sessions = entries
        .iter()
        .map(|entry| SessionSummary {
            session_id: str_field(entry, &["sessionId", "sessionID"]),
            source,
            last_activity: str_field(entry, &["lastActivity"]),
            total_tokens: token_total(entry),
            total_cost_usd: cost_of(entry),
            models_used: string_list(entry, MODEL_ALIASES),
            parent_session_id: opt_str(entry, &["parentSessionId", "parentID"]),
        })
        .collect();

    NormalizedData {
        sessions,
        ..Default::default()
    }
}

/// Blocks report: one row per billing block. The token total falls back to
/// the nested `tokenCounts` sub-object when no flat total is present.
pub fn normalize_blocks(raw: &Value) -> NormalizedData {
    let entries = unwrap_entries(raw, &["blocks", "data"]);
    let blocks = entries
        .iter()
        .map(|entry| {
            let total_tokens = match opt_uint(entry, &["totalTokens"]) {
                Some(total) if total > 0 => total,
                _ => entry
                    .get("tokenCounts")
                    .map(derived_tokens)
                    .unwrap_or_else(|| derived_tokens(entry)),
            };
            BlockSummary {
                block_id: str_field(entry, &["id", "blockId"]),
                start_time: str_field(entry, &["startTime"]),
                end_time: str_field(entry, &["endTime"]),
                is_active: entry
                    .get("isActive")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                total_tokens,
                cost_usd: float_field(entry, &["costUSD", "totalCost"]),
                models: string_list(entry, &["models", "modelsUsed"]),
            }
        })
        .collect();

    NormalizedData {
        blocks,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_daily_series_and_latest_entry_summary() {
        let raw = json!([
            { "date": "2024-01-01", "inputTokens": 10, "outputTokens": 5 },
            { "date": "2024-01-02", "totalTokens": 20, "totalCost": 1.5 },
        ]);
        let data = normalize_daily(&raw);

        assert_eq!(
            data.series,
            vec![
                SeriesPoint {
                    label: "2024-01-01".to_string(),
                    cost_usd: 0.0,
                    total_tokens: 15,
                },
                SeriesPoint {
                    label: "2024-01-02".to_string(),
                    cost_usd: 1.5,
                    total_tokens: 20,
                },
            ]
        );

        let summary = data.summary.unwrap();
        assert_eq!(summary.start, "2024-01-02");
        assert_eq!(summary.total_tokens, 20);
        assert!((summary.total_cost_usd - 1.5).abs() < f64::EPSILON);
        assert!(data.sessions.is_empty());
        assert!(data.blocks.is_empty());
    }

    #[test]
    fn test_daily_accepts_envelope_wrapper() {
        let bare = json!([{ "date": "2024-01-01", "totalTokens": 7 }]);
        let wrapped = json!({ "daily": [{ "date": "2024-01-01", "totalTokens": 7 }] });
        assert_eq!(normalize_daily(&bare).series, normalize_daily(&wrapped).series);
    }

    #[test]
    fn test_daily_empty_has_no_summary() {
        let data = normalize_daily(&json!([]));
        assert!(data.summary.is_none());
        assert!(data.series.is_empty());
    }

    #[test]
    fn test_weekly_empty_yields_zero_summary_not_none() {
        let data = normalize_weekly(&json!({ "weekly": [] }));
        let summary = data.summary.expect("weekly summary is never None");
        assert_eq!(summary.start, "");
        assert_eq!(summary.total_tokens, 0);
        assert_eq!(summary.total_cost_usd, 0.0);
    }

    #[test]
    fn test_weekly_prefers_explicit_totals_object() {
        let raw = json!({
            "weekly": [
                { "week": "2024-01-07", "inputTokens": 100, "outputTokens": 50, "totalCost": 2.0 },
            ],
            "totals": { "inputTokens": 999, "outputTokens": 1, "totalTokens": 1000, "totalCost": 9.0 },
        });
        let summary = normalize_weekly(&raw).summary.unwrap();
        assert_eq!(summary.total_tokens, 1000);
        assert_eq!(summary.total_input_tokens, 999);
        assert!((summary.total_cost_usd - 9.0).abs() < f64::EPSILON);
        assert_eq!(summary.start, "2024-01-07");
    }

    #[test]
    fn test_weekly_recomputes_totals_when_absent() {
        let raw = json!([
            { "week": "2024-01-07", "inputTokens": 10, "outputTokens": 5 },
            { "week": "2024-01-14", "totalTokens": 30, "costUSD": 0.5 },
        ]);
        let summary = normalize_weekly(&raw).summary.unwrap();
        assert_eq!(summary.total_tokens, 45);
        assert!((summary.total_cost_usd - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.start, "2024-01-07");
    }

    #[test]
    fn test_monthly_totals_under_summary_key() {
        let raw = json!({
            "monthly": [{ "month": "2024-02", "totalTokens": 10 }],
            "summary": { "totalTokens": 500, "totalCostUSD": 3.25 },
        });
        let summary = normalize_monthly(&raw).summary.unwrap();
        assert_eq!(summary.total_tokens, 500);
        assert!((summary.total_cost_usd - 3.25).abs() < f64::EPSILON);
        assert_eq!(summary.start, "2024-02");
    }

    #[test]
    fn test_zero_explicit_total_is_rederived() {
        let raw = json!([{
            "date": "2024-01-01",
            "totalTokens": 0,
            "inputTokens": 3,
            "outputTokens": 4,
            "cacheCreationTokens": 2,
            "cacheReadTokens": 1,
        }]);
        assert_eq!(normalize_daily(&raw).series[0].total_tokens, 10);
    }

    #[test]
    fn test_session_alias_equivalence() {
        let via_opencode = json!({ "sessions": [{
            "sessionID": "x",
            "lastActivity": "2024-01-05",
            "models": ["m1"],
            "parentID": "p1",
            "totalTokens": 12,
            "costUSD": 0.2,
        }]});
        let via_claude = json!({ "sessions": [{
            "sessionId": "x",
            "lastActivity": "2024-01-05",
            "modelsUsed": ["m1"],
            "parentSessionId": "p1",
            "totalTokens": 12,
            "totalCost": 0.2,
        }]});

        let left = normalize_sessions(&via_opencode, Source::Claude).sessions;
        let right = normalize_sessions(&via_claude, Source::Claude).sessions;
        assert_eq!(left, right);
        assert_eq!(left[0].session_id, "x");
        assert_eq!(left[0].parent_session_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_sessions_tagged_with_requesting_source() {
        let raw = json!([{ "sessionId": "s", "lastActivity": "2024-01-01" }]);
        let data = normalize_sessions(&raw, Source::Opencode);
        assert_eq!(data.sessions[0].source, Source::Opencode);
        // null parent resolves to no parent at all
        assert!(data.sessions[0].parent_session_id.is_none());
    }

    #[test]
    fn test_blocks_token_total_from_nested_counts() {
        let raw = json!({ "blocks": [{
            "id": "b-1",
            "startTime": "2024-01-01T00:00:00Z",
            "endTime": "2024-01-01T05:00:00Z",
            "isActive": true,
            "tokenCounts": {
                "inputTokens": 5,
                "outputTokens": 10,
                "cacheCreationInputTokens": 3,
                "cacheReadInputTokens": 2,
            },
            "costUSD": 0.75,
            "models": ["opus"],
        }]});
        let blocks = normalize_blocks(&raw).blocks;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_id, "b-1");
        assert!(blocks[0].is_active);
        assert_eq!(blocks[0].total_tokens, 20);
        assert_eq!(blocks[0].models, vec!["opus".to_string()]);
    }

    #[test]
    fn test_shape_drift_defaults_to_zero_not_panic() {
        let raw = json!([{ "unexpected": { "deeply": ["nested"] } }]);
        let data = normalize_daily(&raw);
        assert_eq!(data.series[0].total_tokens, 0);
        assert_eq!(data.series[0].label, "");

        let sessions = normalize_sessions(&json!({ "sessions": [{}] }), Source::Claude);
        assert_eq!(sessions.sessions[0].session_id, "");
        assert!(sessions.sessions[0].models_used.is_empty());
    }
}
