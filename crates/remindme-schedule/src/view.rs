//! Day views with the holiday override applied.
//!
//! The time and holiday resolvers stay pure; this is the one place they are
//! composed, so a holiday always wins over whatever the weekday would show.

use chrono::{NaiveDate, NaiveDateTime};
use remindme_core::{ClassInfo, Holiday, WeeklySchedule, Weekday};

use crate::holiday::{holiday_for, HolidayCalendar};
use crate::time::current_class_index;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayView {
    /// The date is a holiday; the weekday's classes are not shown.
    Holiday(Holiday),
    NoClasses,
    Classes {
        classes: Vec<ClassInfo>,
        /// Index of the entry in progress, only ever set for today.
        current: Option<usize>,
    },
}

/// One tab of the week strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    pub day: Weekday,
    pub date: NaiveDate,
    pub view: DayView,
}

/// What to show for today.
pub fn today_view(
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    now: NaiveDateTime,
) -> DayView {
    day_view(schedule, holidays, now.date(), Some(now))
}

/// Every weekday present in the schedule, dated within the current
/// Sunday-started week.
pub fn week_view(
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    now: NaiveDateTime,
) -> Vec<DayEntry> {
    let today = now.date();
    let sunday = today - chrono::Duration::days(Weekday::of(today).days_from_sunday() as i64);

    schedule
        .days()
        .map(|(day, _)| {
            let date = sunday + chrono::Duration::days(day.days_from_sunday() as i64);
            let clock = (date == today).then_some(now);
            DayEntry {
                day,
                date,
                view: day_view(schedule, holidays, date, clock),
            }
        })
        .collect()
}

fn day_view(
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    date: NaiveDate,
    now: Option<NaiveDateTime>,
) -> DayView {
    if let Some(holiday) = holiday_for(holidays, date) {
        return DayView::Holiday(holiday.clone());
    }

    let classes = schedule.day(Weekday::of(date));
    if classes.is_empty() {
        return DayView::NoClasses;
    }

    DayView::Classes {
        classes: classes.to_vec(),
        current: now.and_then(|now| current_class_index(classes, now)),
    }
}
