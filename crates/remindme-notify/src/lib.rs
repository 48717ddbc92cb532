//! `remindme-notify`: evening reminders and pre-class alarms.
//!
//! # Overview
//!
//! [`planner::plan`] derives the desired notification set from the
//! group-specific schedule, the holiday calendar, the user's toggles and the
//! current local time. The [`engine::NotificationScheduler`] owns the
//! lifecycle around it: permission, channel and background registration, and
//! replanning passes that cancel and re-create its own entries on an injected
//! [`host::NotificationHost`].
//!
//! # Purpose tags
//!
//! | Tag                | Trigger                              |
//! |--------------------|--------------------------------------|
//! | `evening-reminder` | Daily at the evening time (21:00)    |
//! | `pre-class-alarm`  | Once, ahead of today's first class   |

pub mod engine;
pub mod error;
pub mod host;
pub mod planner;
pub mod schedule;
pub mod settings;
pub mod types;

pub use engine::{Lifecycle, NotificationScheduler, NowProvider, ReplanOutcome, SchedulerStatus};
pub use error::{HostError, NotifyError, Result};
pub use host::NotificationHost;
pub use planner::{plan, PlannerConfig};
pub use schedule::compute_next_fire;
pub use settings::SettingsStore;
pub use types::{
    BackgroundTask, ChannelSpec, HostHandle, NotificationContent, NotificationRequest,
    NotificationSettings, PermissionStatus, PurposeTag, ReplanScope, Trigger,
};
