//! Next-run computation per cadence.
//!
//! Deterministic: the same cadence, instant, and timezone always produce the
//! same next-run timestamp, and the result is strictly after the input. The
//! polling driver that looks up due schedules and calls the orchestrator
//! lives outside this crate.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::schedule::Cadence;

/// Local wall-clock hour check-ins land on for date-anchored cadences.
const RUN_HOUR: u32 = 9;

/// Fallback applied when a stored cadence string cannot be parsed.
const FALLBACK_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextRun {
    pub at: DateTime<Utc>,
    /// True when the cadence was unknown and the safe default was applied.
    /// Callers log this as a warning; it is never fatal.
    pub fallback_applied: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler;

impl Scheduler {
    pub fn new() -> Self {
        Self
    }

    /// Computes the next eligible run strictly after `now`.
    pub fn next_run(&self, cadence: Cadence, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
        let local_now = now.with_timezone(&tz);

        match cadence {
            Cadence::Once => now + Duration::hours(1),
            Cadence::Daily => at_run_hour(tz, local_now.date_naive() + Duration::days(1)),
            Cadence::Weekly => {
                let days_until_monday =
                    match local_now.date_naive().weekday().num_days_from_monday() {
                        0 => 7,
                        offset => 7 - offset as i64,
                    };
                at_run_hour(tz, local_now.date_naive() + Duration::days(days_until_monday))
            }
            Cadence::Biweekly => at_run_hour(tz, local_now.date_naive() + Duration::days(14)),
            Cadence::Monthly => at_run_hour(tz, first_of_next_month(local_now.date_naive())),
        }
    }

    /// Parses a stored cadence string and falls back to now + 7 days on
    /// unknown values, reporting the fallback so the caller can log it.
    pub fn next_run_raw(&self, raw_cadence: &str, now: DateTime<Utc>, tz: Tz) -> NextRun {
        match raw_cadence.parse::<Cadence>() {
            Ok(cadence) => NextRun { at: self.next_run(cadence, now, tz), fallback_applied: false },
            Err(_) => {
                NextRun { at: now + Duration::days(FALLBACK_DAYS), fallback_applied: true }
            }
        }
    }
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date + Duration::days(28))
}

/// Resolves `date` at the local run hour to a UTC instant. DST transitions
/// are resolved to the earlier candidate; a nonexistent local time (spring
/// gap) falls back to interpreting the wall clock as UTC.
fn at_run_hour(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(RUN_HOUR, 0, 0).unwrap_or_else(|| date.and_time(NaiveTime::MIN));

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}
