//! Pure "what is happening now" resolution against an injected wall clock.
//!
//! Nothing here looks at holidays: callers that need the holiday override
//! compose these functions with [`crate::holiday`].

use chrono::{NaiveDate, NaiveDateTime};
use remindme_core::{ClassInfo, ClockTime, WeeklySchedule, Weekday};

/// Today's entries, or an empty slice if the weekday has none.
pub fn todays_schedule(schedule: &WeeklySchedule, now: NaiveDateTime) -> &[ClassInfo] {
    schedule.day(Weekday::of(now.date()))
}

/// Index of the entry whose `[start, end)` window contains `now`.
///
/// Free blocks count: they occupy their window like any class.
pub fn current_class_index(todays: &[ClassInfo], now: NaiveDateTime) -> Option<usize> {
    let minute = ClockTime::from_naive(now.time()).minute_of_day();
    todays.iter().position(|class| class.covers(minute))
}

/// First entry of tomorrow's weekday (Saturday wraps to Sunday).
pub fn next_day_first_class(schedule: &WeeklySchedule, now: NaiveDateTime) -> Option<&ClassInfo> {
    schedule.day(Weekday::of(now.date()).succ()).first()
}

/// First entry that is an actual class rather than a free block.
pub fn first_real_class(classes: &[ClassInfo]) -> Option<&ClassInfo> {
    classes.iter().find(|class| !class.is_free())
}

pub fn tomorrow(now: NaiveDateTime) -> NaiveDate {
    now.date() + chrono::Duration::days(1)
}

/// `"9:00 AM - 10:30 AM"`.
pub fn format_window(class: &ClassInfo) -> String {
    format!(
        "{} - {}",
        class.start_time.to_12_hour(),
        class.end_time.to_12_hour()
    )
}
