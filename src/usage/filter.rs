use serde_json::{json, Value};

use super::periods::PeriodWindow;
use super::types::Period;

/// Restrict an opencode report to the resolved window.
///
/// The opencode CLI returns all historical buckets per period with no date
/// filter of its own, so windowing happens here. Lenient by design: a missing
/// or malformed entry array filters down to empty rather than failing.
pub fn filter_report(raw: &Value, period: Period, window: &PeriodWindow) -> Value {
    match period {
        Period::Daily => {
            let kept: Vec<Value> = entries_of(raw, "daily")
                .into_iter()
                .filter(|entry| {
                    entry
                        .get("date")
                        .and_then(Value::as_str)
                        .map(|date| in_window(date, window))
                        .unwrap_or(false)
                })
                .collect();
            json!({ "daily": kept })
        }
        Period::Weekly => {
            // No per-week date filter is possible upstream; serve the most
            // recent bucket and ignore the window bounds.
            let entries = entries_of(raw, "weekly");
            let latest: Vec<Value> = entries.last().cloned().into_iter().collect();
            json!({ "weekly": latest })
        }
        Period::Monthly => {
            let entries = entries_of(raw, "monthly");
            let target = target_month(&window.since);
            let kept: Vec<Value> = entries
                .iter()
                .filter(|entry| entry.get("month").and_then(Value::as_str) == Some(&target))
                .cloned()
                .collect();
            if kept.is_empty() {
                // No bucket for the current month: fall back to the most
                // recent one rather than rendering an empty chart.
                let latest: Vec<Value> = entries.last().cloned().into_iter().collect();
                json!({ "monthly": latest })
            } else {
                json!({ "monthly": kept })
            }
        }
        Period::Session => {
            let kept: Vec<Value> = entries_of(raw, "sessions")
                .into_iter()
                .filter(|entry| {
                    entry
                        .get("lastActivity")
                        .and_then(Value::as_str)
                        .map(|ts| in_window(&ts.chars().take(10).collect::<String>(), window))
                        .unwrap_or(false)
                })
                .collect();
            json!({ "sessions": kept })
        }
        Period::Blocks => raw.clone(),
    }
}

fn entries_of(raw: &Value, key: &str) -> Vec<Value> {
    raw.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Compare a date string against the window after normalizing to `YYYYMMDD`.
fn in_window(date: &str, window: &PeriodWindow) -> bool {
    let compact: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
    compact.as_str() >= window.since.as_str() && compact.as_str() <= window.until.as_str()
}

/// `YYYY-MM` of the window's `since` date.
fn target_month(since: &str) -> String {
    if since.len() >= 6 {
        format!("{}-{}", &since[..4], &since[4..6])
    } else {
        since.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(since: &str, until: &str) -> PeriodWindow {
        PeriodWindow {
            since: since.to_string(),
            until: until.to_string(),
        }
    }

    #[test]
    fn test_daily_keeps_only_in_window_entries() {
        let raw = json!({
            "daily": [
                { "date": "2023-12-31", "totalTokens": 1 },
                { "date": "2024-01-02", "totalTokens": 2 },
                { "date": "2024-01-08", "totalTokens": 3 },
            ]
        });
        let filtered = filter_report(&raw, Period::Daily, &window("20240101", "20240107"));
        let kept = filtered["daily"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["date"], "2024-01-02");
    }

    #[test]
    fn test_daily_window_bounds_are_inclusive() {
        let raw = json!({
            "daily": [
                { "date": "2024-01-01" },
                { "date": "2024-01-07" },
            ]
        });
        let filtered = filter_report(&raw, Period::Daily, &window("20240101", "20240107"));
        assert_eq!(filtered["daily"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_weekly_keeps_latest_bucket_only() {
        let raw = json!({
            "weekly": [
                { "week": "2023-12-24" },
                { "week": "2023-12-31" },
                { "week": "2024-01-07" },
            ]
        });
        let filtered = filter_report(&raw, Period::Weekly, &window("20240101", "20240107"));
        let kept = filtered["weekly"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["week"], "2024-01-07");
    }

    #[test]
    fn test_monthly_matches_target_month() {
        let raw = json!({
            "monthly": [
                { "month": "2024-01" },
                { "month": "2024-02" },
            ]
        });
        let filtered = filter_report(&raw, Period::Monthly, &window("20240201", "20240215"));
        let kept = filtered["monthly"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["month"], "2024-02");
    }

    #[test]
    fn test_monthly_falls_back_to_latest_bucket() {
        let raw = json!({
            "monthly": [
                { "month": "2024-01" },
                { "month": "2024-02" },
            ]
        });
        let filtered = filter_report(&raw, Period::Monthly, &window("20240301", "20240315"));
        let kept = filtered["monthly"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["month"], "2024-02");
    }

    #[test]
    fn test_session_filters_on_last_activity_prefix() {
        let raw = json!({
            "sessions": [
                { "sessionID": "a", "lastActivity": "2024-01-03T10:00:00Z" },
                { "sessionID": "b", "lastActivity": "2023-11-20T10:00:00Z" },
                { "sessionID": "c" },
            ]
        });
        let filtered = filter_report(&raw, Period::Session, &window("20240101", "20240107"));
        let kept = filtered["sessions"].as_array().unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["sessionID"], "a");
    }

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let raw = json!({ "something": "else" });
        let filtered = filter_report(&raw, Period::Daily, &window("20240101", "20240107"));
        assert!(filtered["daily"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_blocks_passes_through_unchanged() {
        let raw = json!({ "blocks": [{ "id": "b1" }] });
        let filtered = filter_report(&raw, Period::Blocks, &window("20240101", "20240107"));
        assert_eq!(filtered, raw);
    }
}
