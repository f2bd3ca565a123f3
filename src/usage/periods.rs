use chrono::{Datelike, Days, Local, NaiveDate, Weekday};

use super::types::Period;

/// Inclusive calendar window for one reporting period, `YYYYMMDD` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodWindow {
    pub since: String,
    pub until: String,
}

pub const DEFAULT_WEEK_START: Weekday = Weekday::Sun;

/// Resolve the reporting window for `period` relative to today.
///
/// Week-start names are matched case-insensitively; anything unrecognized
/// (including `None`) falls back to sunday rather than failing, since the
/// value usually comes straight from persisted client settings.
pub fn resolve_window(period: Period, week_start_day: Option<&str>) -> PeriodWindow {
    resolve_window_at(Local::now().date_naive(), period, week_start_day)
}

/// Same as [`resolve_window`] but relative to an explicit date.
pub fn resolve_window_at(
    today: NaiveDate,
    period: Period,
    week_start_day: Option<&str>,
) -> PeriodWindow {
    let until = format_yyyymmdd(today);
    let since = match period {
        Period::Daily => today,
        Period::Weekly => week_start(today, parse_week_start(week_start_day)),
        Period::Monthly | Period::Session | Period::Blocks => month_start(today),
    };

    PeriodWindow {
        since: format_yyyymmdd(since),
        until,
    }
}

pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `YYYYMMDD` -> `YYYY-MM-DD`. Input is trusted to come from
/// [`format_yyyymmdd`]; anything shorter is returned unchanged.
pub fn yyyymmdd_to_iso(compact: &str) -> String {
    if compact.len() == 8 {
        format!("{}-{}-{}", &compact[..4], &compact[4..6], &compact[6..8])
    } else {
        compact.to_string()
    }
}

/// Parse a weekday name, silently defaulting to sunday when absent or
/// unrecognized.
pub fn parse_week_start(name: Option<&str>) -> Weekday {
    match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
        Some("monday") => Weekday::Mon,
        Some("tuesday") => Weekday::Tue,
        Some("wednesday") => Weekday::Wed,
        Some("thursday") => Weekday::Thu,
        Some("friday") => Weekday::Fri,
        Some("saturday") => Weekday::Sat,
        Some("sunday") => Weekday::Sun,
        _ => DEFAULT_WEEK_START,
    }
}

/// Most recent occurrence of `start` on or before `date`.
pub fn week_start(date: NaiveDate, start: Weekday) -> NaiveDate {
    let diff =
        (date.weekday().num_days_from_sunday() + 7 - start.num_days_from_sunday()) % 7;
    date.checked_sub_days(Days::new(diff as u64)).unwrap_or(date)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
