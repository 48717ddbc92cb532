use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDateTime;
use remindme_core::ClockTime;
use serde::{Deserialize, Serialize};

/// Category of notification the engine owns. Host entries are cancelled and
/// re-created per tag; entries under any other tag are never touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurposeTag {
    /// "You have class tomorrow" at the configured evening time.
    EveningReminder,
    /// Ring ahead of today's first class.
    PreClassAlarm,
}

impl PurposeTag {
    pub const ALL: [PurposeTag; 2] = [PurposeTag::EveningReminder, PurposeTag::PreClassAlarm];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurposeTag::EveningReminder => "evening-reminder",
            PurposeTag::PreClassAlarm => "pre-class-alarm",
        }
    }
}

impl fmt::Display for PurposeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurposeTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "evening-reminder" => Ok(PurposeTag::EveningReminder),
            "pre-class-alarm" => Ok(PurposeTag::PreClassAlarm),
            other => Err(format!("unknown purpose tag: {other}")),
        }
    }
}

/// When a notification fires, in device-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once at the given local instant.
    At { at: NaiveDateTime },

    /// Fire every day at the given local time.
    Daily { time: ClockTime },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub tag: PurposeTag,
    pub title: String,
    pub body: String,
    /// Channel registered at initialization (Android-style).
    pub channel_id: String,
}

/// One entry of the desired notification set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub trigger: Trigger,
    pub content: NotificationContent,
}

/// User preferences persisted across launches. Each flag gates its own
/// category independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub notifications_enabled: bool,
    pub alarms_enabled: bool,
    /// Local time of the last pass that scheduled at least one entry.
    pub last_scheduled_at: Option<NaiveDateTime>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            alarms_enabled: true,
            last_scheduled_at: None,
        }
    }
}

/// Opaque id the host assigns to a scheduled entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostHandle(pub String);

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// High-importance channel the reminders and alarms are posted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    /// Off/on durations in milliseconds.
    pub vibration_pattern: Vec<u64>,
    pub bypass_dnd: bool,
}

impl ChannelSpec {
    pub fn class_alarm(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Class Alarms".to_string(),
            vibration_pattern: vec![0, 500, 500, 500],
            bypass_dnd: true,
        }
    }
}

/// Periodic wake-up registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundTask {
    pub name: String,
    pub interval: Duration,
    pub start_on_boot: bool,
}

pub const BACKGROUND_TASK_NAME: &str = "class-schedule-refresh";

/// Which purpose tags a replanning pass touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplanScope {
    tags: BTreeSet<PurposeTag>,
}

impl ReplanScope {
    pub fn all() -> Self {
        Self {
            tags: PurposeTag::ALL.into_iter().collect(),
        }
    }

    pub fn only(tag: PurposeTag) -> Self {
        Self {
            tags: BTreeSet::from([tag]),
        }
    }

    /// Union of two scopes, used when requests are coalesced.
    pub fn merge(mut self, other: ReplanScope) -> Self {
        self.tags.extend(other.tags);
        self
    }

    pub fn contains(&self, tag: PurposeTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = PurposeTag> + '_ {
        self.tags.iter().copied()
    }
}
