//! Weekly-schedule availability lookup.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};

use crate::interpreter::WeeklySchedule;

/// Converts a UTC instant into the schedule's local wall-clock time.
pub fn localize(schedule: &WeeklySchedule, at: DateTime<Utc>) -> NaiveDateTime {
    (at + Duration::minutes(i64::from(schedule.utc_offset_minutes))).naive_utc()
}

/// True if some window on the same weekday contains `local` (inclusive on both ends).
///
/// An empty schedule is never available.
pub fn is_available(schedule: &WeeklySchedule, local: NaiveDateTime) -> bool {
    let day = local.weekday().num_days_from_sunday() as u8;
    let time = local.time();

    schedule
        .windows
        .iter()
        .filter(|w| w.day_of_week == day)
        .any(|w| w.start <= time && time <= w.end)
}

/// `is_available` evaluated at a UTC instant.
pub fn is_available_at(schedule: &WeeklySchedule, at: DateTime<Utc>) -> bool {
    is_available(schedule, localize(schedule, at))
}
