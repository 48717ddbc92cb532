//! Pure derivation of the desired notification set.
//!
//! Given the settings, the group-specific schedule, the holiday calendar and
//! the current local time, [`plan`] returns what should be scheduled. It never
//! talks to the host; the engine diffs nothing and simply replaces whatever
//! it owns under each purpose tag with this output.

use chrono::NaiveDateTime;
use remindme_core::config::NotificationConfig;
use remindme_core::{ClassInfo, ClockTime, WeeklySchedule, Weekday};
use remindme_schedule::holiday::{is_holiday, HolidayCalendar};
use remindme_schedule::time::{first_real_class, format_window, next_day_first_class, tomorrow};

use crate::types::{
    NotificationContent, NotificationRequest, NotificationSettings, PurposeTag, Trigger,
};

pub const REMINDER_TITLE: &str = "Class Reminder for Tomorrow";
pub const ALARM_TITLE: &str = "Class Alarm";

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub evening_time: ClockTime,
    pub alarm_lead: chrono::Duration,
    pub channel_id: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for PlannerConfig {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            evening_time: config.evening_time,
            alarm_lead: config.alarm_lead(),
            channel_id: config.channel_id.clone(),
        }
    }
}

/// Desired notifications for `now`, at most one per purpose tag.
pub fn plan(
    settings: &NotificationSettings,
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    now: NaiveDateTime,
    config: &PlannerConfig,
) -> Vec<NotificationRequest> {
    let mut requests = Vec::with_capacity(2);
    if settings.notifications_enabled {
        requests.extend(evening_reminder(schedule, holidays, now, config));
    }
    if settings.alarms_enabled {
        requests.extend(pre_class_alarm(schedule, holidays, now, config));
    }
    requests
}

/// Daily reminder describing tomorrow's first real class.
///
/// Omitted when tomorrow has no classes, only free blocks, or is a holiday.
pub fn evening_reminder(
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    now: NaiveDateTime,
    config: &PlannerConfig,
) -> Option<NotificationRequest> {
    next_day_first_class(schedule, now)?;
    if is_holiday(holidays, tomorrow(now)) {
        return None;
    }
    let class = first_real_class(schedule.day(Weekday::of(tomorrow(now))))?;

    Some(NotificationRequest {
        trigger: Trigger::Daily {
            time: config.evening_time,
        },
        content: NotificationContent {
            tag: PurposeTag::EveningReminder,
            title: REMINDER_TITLE.to_string(),
            body: reminder_body(class),
            channel_id: config.channel_id.clone(),
        },
    })
}

/// One-shot alarm ahead of today's first real class.
///
/// Omitted on holidays and once the alarm instant is no longer in the future.
pub fn pre_class_alarm(
    schedule: &WeeklySchedule,
    holidays: &HolidayCalendar,
    now: NaiveDateTime,
    config: &PlannerConfig,
) -> Option<NotificationRequest> {
    let today = now.date();
    if is_holiday(holidays, today) {
        return None;
    }
    let class = first_real_class(schedule.day(Weekday::of(today)))?;
    let fire_at = today.and_time(class.start_time.to_naive()) - config.alarm_lead;
    if fire_at <= now {
        return None;
    }

    Some(NotificationRequest {
        trigger: Trigger::At { at: fire_at },
        content: NotificationContent {
            tag: PurposeTag::PreClassAlarm,
            title: ALARM_TITLE.to_string(),
            body: format!(
                "{} starts at {}\n{}",
                class.course_name,
                class.start_time.to_12_hour(),
                location(class)
            ),
            channel_id: config.channel_id.clone(),
        },
    })
}

fn reminder_body(class: &ClassInfo) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        class.course_name,
        format_window(class),
        location(class),
        class.instructor
    )
}

fn location(class: &ClassInfo) -> String {
    format!("{} - Room {}", class.building, class.room)
}
