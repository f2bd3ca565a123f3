use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use super::empty_state;
use super::periods::week_start;
use super::pricing::PricingData;
use super::types::CostMode;

/// One assistant message's worth of usage from a JSONL transcript, with its
/// cost already resolved per the requested cost mode.
#[derive(Debug, Clone)]
struct UsageEvent {
    date: NaiveDate,
    model: Option<String>,
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    cost_usd: f64,
}

/// All usage events recorded in one session transcript.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    session_id: String,
    events: Vec<UsageEvent>,
}

/// A per-day usage bucket. Serializes camelCase so scanner output flows
/// through the same normalizers as CLI payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub models_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRecord {
    pub week: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub models_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub models_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub last_activity: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub models_used: Vec<String>,
}

/// Scan every `*.jsonl` transcript under the configured Claude projects
/// directories. Files with no assistant usage entries are skipped.
pub fn scan_sessions(mode: CostMode, pricing: &PricingData) -> Vec<SessionEvents> {
    let mut sessions = Vec::new();
    for dir in empty_state::claude_project_dirs() {
        if !dir.exists() {
            continue;
        }
        for path in collect_jsonl_files(&dir) {
            let session_id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };
            if let Some(events) = parse_session_file(&path, mode, pricing) {
                sessions.push(SessionEvents { session_id, events });
            }
        }
    }
    sessions
}

/// Collect all .jsonl files recursively under a directory.
fn collect_jsonl_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_jsonl_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                files.push(path);
            }
        }
    }
    files
}

/// Parse one transcript, keeping only assistant entries that carry usage and
/// a parsable timestamp.
fn parse_session_file(path: &Path, mode: CostMode, pricing: &PricingData) -> Option<Vec<UsageEvent>> {
    let file = std::fs::File::open(path).ok()?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        if line.trim().is_empty() {
            continue;
        }
        // Quick filter before paying for a full JSON parse.
        if !line.contains("\"type\":\"assistant\"") {
            continue;
        }

        let entry: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if entry.get("type").and_then(|v| v.as_str()) != Some("assistant") {
            continue;
        }
        let message = match entry.get("message") {
            Some(m) => m,
            None => continue,
        };
        let usage = match message.get("usage") {
            Some(u) => u,
            None => continue,
        };
        let date = match entry
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(date_from_timestamp)
        {
            Some(d) => d,
            None => continue,
        };

        let field = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
        let input_tokens = field("input_tokens");
        let output_tokens = field("output_tokens");
        let cache_creation_tokens = field("cache_creation_input_tokens");
        let cache_read_tokens = field("cache_read_input_tokens");

        let model = message
            .get("model")
            .and_then(|v| v.as_str())
            .map(String::from);
        let recorded_cost = entry.get("costUSD").and_then(|v| v.as_f64());
        let cost_usd = resolve_cost(
            mode,
            recorded_cost,
            model.as_deref(),
            pricing,
            input_tokens,
            output_tokens,
            cache_creation_tokens,
            cache_read_tokens,
        );

        events.push(UsageEvent {
            date,
            model,
            input_tokens,
            output_tokens,
            cache_creation_tokens,
            cache_read_tokens,
            cost_usd,
        });
    }

    if events.is_empty() {
        None
    } else {
        Some(events)
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_cost(
    mode: CostMode,
    recorded: Option<f64>,
    model: Option<&str>,
    pricing: &PricingData,
    input: u64,
    output: u64,
    cache_creation: u64,
    cache_read: u64,
) -> f64 {
    let calculated = || {
        model
            .map(|m| pricing.cost_for(m, input, output, cache_creation, cache_read))
            .unwrap_or(0.0)
    };
    match mode {
        CostMode::Display => recorded.unwrap_or(0.0),
        CostMode::Calculate => calculated(),
        CostMode::Auto => recorded.unwrap_or_else(calculated),
    }
}

/// Extract a calendar date from an ISO 8601 timestamp like
/// `2026-02-05T18:48:19.274Z`.
fn date_from_timestamp(ts: &str) -> Option<NaiveDate> {
    if ts.len() < 10 {
        return None;
    }
    NaiveDate::parse_from_str(&ts[..10], "%Y-%m-%d").ok()
}

#[derive(Debug, Default)]
struct Bucket {
    input_tokens: u64,
    output_tokens: u64,
    cache_creation_tokens: u64,
    cache_read_tokens: u64,
    cost_usd: f64,
    models: BTreeSet<String>,
}

impl Bucket {
    fn add(&mut self, event: &UsageEvent) {
        self.input_tokens += event.input_tokens;
        self.output_tokens += event.output_tokens;
        self.cache_creation_tokens += event.cache_creation_tokens;
        self.cache_read_tokens += event.cache_read_tokens;
        self.cost_usd += event.cost_usd;
        if let Some(model) = &event.model {
            self.models.insert(model.clone());
        }
    }

    fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_creation_tokens + self.cache_read_tokens
    }
}

fn bucket_by<F>(sessions: &[SessionEvents], key_of: F) -> BTreeMap<String, Bucket>
where
    F: Fn(&UsageEvent) -> String,
{
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    for session in sessions {
        for event in &session.events {
            buckets.entry(key_of(event)).or_default().add(event);
        }
    }
    buckets
}

/// Per-day buckets in chronological order.
pub fn daily_records(sessions: &[SessionEvents]) -> Vec<DailyRecord> {
    bucket_by(sessions, |e| e.date.format("%Y-%m-%d").to_string())
        .into_iter()
        .map(|(date, b)| DailyRecord {
            date,
            input_tokens: b.input_tokens,
            output_tokens: b.output_tokens,
            cache_creation_tokens: b.cache_creation_tokens,
            cache_read_tokens: b.cache_read_tokens,
            total_tokens: b.total_tokens(),
            total_cost: b.cost_usd,
            models_used: b.models.into_iter().collect(),
        })
        .collect()
}

/// Per-week buckets, labeled by the week's start date under the configured
/// week-start weekday.
pub fn weekly_records(sessions: &[SessionEvents], start: Weekday) -> Vec<WeeklyRecord> {
    bucket_by(sessions, |e| {
        week_start(e.date, start).format("%Y-%m-%d").to_string()
    })
    .into_iter()
    .map(|(week, b)| WeeklyRecord {
        week,
        input_tokens: b.input_tokens,
        output_tokens: b.output_tokens,
        cache_creation_tokens: b.cache_creation_tokens,
        cache_read_tokens: b.cache_read_tokens,
        total_tokens: b.total_tokens(),
        total_cost: b.cost_usd,
        models_used: b.models.into_iter().collect(),
    })
    .collect()
}

/// Per-month (`YYYY-MM`) buckets.
pub fn monthly_records(sessions: &[SessionEvents]) -> Vec<MonthlyRecord> {
    bucket_by(sessions, |e| e.date.format("%Y-%m").to_string())
        .into_iter()
        .map(|(month, b)| MonthlyRecord {
            month,
            input_tokens: b.input_tokens,
            output_tokens: b.output_tokens,
            cache_creation_tokens: b.cache_creation_tokens,
            cache_read_tokens: b.cache_read_tokens,
            total_tokens: b.total_tokens(),
            total_cost: b.cost_usd,
            models_used: b.models.into_iter().collect(),
        })
        .collect()
}

/// One record per session, most recent transcript activity as
/// `lastActivity`, ordered by that date.
pub fn session_records(sessions: &[SessionEvents]) -> Vec<SessionRecord> {
    let mut records: Vec<SessionRecord> = sessions
        .iter()
        .map(|session| {
            let mut bucket = Bucket::default();
            let mut last: Option<NaiveDate> = None;
            for event in &session.events {
                bucket.add(event);
                last = Some(last.map_or(event.date, |d| d.max(event.date)));
            }
            SessionRecord {
                session_id: session.session_id.clone(),
                last_activity: last
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                input_tokens: bucket.input_tokens,
                output_tokens: bucket.output_tokens,
                cache_creation_tokens: bucket.cache_creation_tokens,
                cache_read_tokens: bucket.cache_read_tokens,
                total_tokens: bucket.total_tokens(),
                total_cost: bucket.cost_usd,
                models_used: bucket.models.into_iter().collect(),
            }
        })
        .collect();
    records.sort_by(|a, b| a.last_activity.cmp(&b.last_activity));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(date: NaiveDate, model: &str, input: u64, output: u64, cost: f64) -> UsageEvent {
        UsageEvent {
            date,
            model: Some(model.to_string()),
            input_tokens: input,
            output_tokens: output,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            cost_usd: cost,
        }
    }

    fn session(id: &str, events: Vec<UsageEvent>) -> SessionEvents {
        SessionEvents {
            session_id: id.to_string(),
            events,
        }
    }

    #[test]
    fn test_daily_records_group_by_calendar_date() {
        let sessions = vec![
            session(
                "s1",
                vec![
                    event(day(2024, 1, 1), "claude-sonnet-4", 10, 5, 0.1),
                    event(day(2024, 1, 2), "claude-sonnet-4", 20, 10, 0.2),
                ],
            ),
            session("s2", vec![event(day(2024, 1, 1), "claude-opus-4", 1, 1, 0.5)]),
        ];

        let records = daily_records(&sessions);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2024-01-01");
        assert_eq!(records[0].total_tokens, 17);
        assert!((records[0].total_cost - 0.6).abs() < 1e-9);
        assert_eq!(
            records[0].models_used,
            vec!["claude-opus-4".to_string(), "claude-sonnet-4".to_string()]
        );
        assert_eq!(records[1].date, "2024-01-02");
    }

    #[test]
    fn test_weekly_records_respect_week_start() {
        // Wed 2024-01-03 and Mon 2024-01-01 fall in the same monday-start
        // week; sunday-start splits nothing here but shifts the label.
        let sessions = vec![session(
            "s1",
            vec![
                event(day(2024, 1, 1), "m", 1, 0, 0.0),
                event(day(2024, 1, 3), "m", 2, 0, 0.0),
            ],
        )];

        let monday = weekly_records(&sessions, Weekday::Mon);
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].week, "2024-01-01");
        assert_eq!(monday[0].total_tokens, 3);

        let sunday = weekly_records(&sessions, Weekday::Sun);
        assert_eq!(sunday[0].week, "2023-12-31");
    }

    #[test]
    fn test_monthly_records_label_year_month() {
        let sessions = vec![session(
            "s1",
            vec![
                event(day(2024, 1, 31), "m", 5, 0, 0.0),
                event(day(2024, 2, 1), "m", 7, 0, 0.0),
            ],
        )];
        let records = monthly_records(&sessions);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].month, "2024-01");
        assert_eq!(records[1].month, "2024-02");
        assert_eq!(records[1].total_tokens, 7);
    }

    #[test]
    fn test_session_records_track_last_activity() {
        let sessions = vec![session(
            "abc",
            vec![
                event(day(2024, 1, 5), "m", 1, 1, 0.1),
                event(day(2024, 1, 2), "m", 1, 1, 0.1),
            ],
        )];
        let records = session_records(&sessions);
        assert_eq!(records[0].session_id, "abc");
        assert_eq!(records[0].last_activity, "2024-01-05");
        assert_eq!(records[0].total_tokens, 4);
    }

    #[test]
    fn test_parse_session_file_extracts_usage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("11111111-2222.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"{{"type":"assistant","timestamp":"2024-03-01T10:00:00.000Z","message":{{"model":"claude-sonnet-4","usage":{{"input_tokens":100,"output_tokens":50,"cache_creation_input_tokens":10,"cache_read_input_tokens":5}}}}}}"#
        )
        .unwrap();
        writeln!(file, r#"{{"type":"user","message":{{"content":"hi"}}}}"#).unwrap();
        writeln!(file, "not json at all").unwrap();

        let pricing = PricingData::load_offline();
        let events = parse_session_file(&path, CostMode::Calculate, &pricing).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input_tokens, 100);
        assert_eq!(events[0].date, day(2024, 3, 1));
        assert!(events[0].cost_usd > 0.0);
    }

    #[test]
    fn test_parse_session_file_without_usage_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.jsonl");
        std::fs::write(&path, "{\"type\":\"summary\"}\n").unwrap();
        let pricing = PricingData::load_offline();
        assert!(parse_session_file(&path, CostMode::Auto, &pricing).is_none());
    }

    #[test]
    fn test_cost_mode_resolution() {
        let pricing = PricingData::load_offline();
        let calc = |mode, recorded| {
            resolve_cost(mode, recorded, Some("claude-opus-4"), &pricing, 1000, 0, 0, 0)
        };
        // display: recorded value or nothing
        assert_eq!(calc(CostMode::Display, Some(0.5)), 0.5);
        assert_eq!(calc(CostMode::Display, None), 0.0);
        // calculate: always from the table, ignoring recorded
        assert!(calc(CostMode::Calculate, Some(99.0)) < 1.0);
        // auto: recorded wins, table fills the gap
        assert_eq!(calc(CostMode::Auto, Some(0.5)), 0.5);
        assert!(calc(CostMode::Auto, None) > 0.0);
    }

    #[test]
    fn test_date_from_timestamp() {
        assert_eq!(
            date_from_timestamp("2026-02-05T18:48:19.274Z"),
            Some(day(2026, 2, 5))
        );
        assert_eq!(date_from_timestamp("bad"), None);
        assert_eq!(date_from_timestamp(""), None);
    }
}
