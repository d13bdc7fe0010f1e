//! Aggregation windows
//!
//! A window is a run of local calendar days in the user's timezone,
//! mapped to a half-open UTC range `[start, end)` for querying.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub kind: WindowKind,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Days of the window up to and including today (0 for future windows)
    pub days_elapsed: u32,
    pub days_in_window: u32,
}

/// The user's local calendar date at `now`
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// UTC instant at which `date` begins in `tz`
pub fn local_midnight_utc(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Midnight skipped by a DST jump; the day starts an hour later
        LocalResult::None => match tz.from_local_datetime(&(midnight + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&midnight),
        },
    }
}

pub fn days_in_month(year: i32, month: u32) -> EngineResult<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::validation(format!("{}/{} is not a valid month", month, year)))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| EngineError::validation(format!("{}/{} is out of range", month, year)))?;
    Ok((next - first).num_days() as u32)
}

impl Window {
    fn span(
        kind: WindowKind,
        tz: Tz,
        first_day: NaiveDate,
        last_day: NaiveDate,
        days_elapsed: u32,
    ) -> Self {
        let days_in_window = ((last_day - first_day).num_days() + 1) as u32;
        let after_last = last_day.succ_opt().unwrap_or(last_day);
        Self {
            kind,
            first_day,
            last_day,
            start: local_midnight_utc(tz, first_day),
            end: local_midnight_utc(tz, after_last),
            days_elapsed,
            days_in_window,
        }
    }

    /// Today in the user's timezone
    pub fn day(tz: Tz, now: DateTime<Utc>) -> Self {
        let today = local_today(tz, now);
        Self::span(WindowKind::Day, tz, today, today, 1)
    }

    /// The ISO week (Monday to Sunday) containing today
    pub fn week(tz: Tz, now: DateTime<Utc>) -> Self {
        let today = local_today(tz, now);
        let offset = today.weekday().num_days_from_monday();
        let monday = today - Duration::days(offset as i64);
        let sunday = monday + Duration::days(6);
        Self::span(WindowKind::Week, tz, monday, sunday, offset + 1)
    }

    /// A calendar month; defaults to the current local month and year
    pub fn month(
        tz: Tz,
        now: DateTime<Utc>,
        month: Option<u32>,
        year: Option<i32>,
    ) -> EngineResult<Self> {
        let today = local_today(tz, now);
        let month = month.unwrap_or(today.month());
        let year = year.unwrap_or(today.year());
        if !(1..=12).contains(&month) {
            return Err(EngineError::validation(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }

        let length = days_in_month(year, month)?;
        let first_day = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| EngineError::validation(format!("{}/{} is not a valid month", month, year)))?;
        let last_day = first_day + Duration::days(length as i64 - 1);

        let days_elapsed = if today < first_day {
            0
        } else if today > last_day {
            length
        } else {
            today.day()
        };

        Ok(Self::span(WindowKind::Month, tz, first_day, last_day, days_elapsed))
    }

    /// "10/2026" for months, ISO dates otherwise
    pub fn label(&self) -> String {
        match self.kind {
            WindowKind::Day => self.first_day.to_string(),
            WindowKind::Week => format!("{} to {}", self.first_day, self.last_day),
            WindowKind::Month => format!("{}/{}", self.first_day.month(), self.first_day.year()),
        }
    }
}
