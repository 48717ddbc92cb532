//! `remindme-core`: shared data model, errors and configuration.
//!
//! Everything here is plain data: the weekly class schedule as published by
//! the remote feed, the user's selected [`types::Identity`], and the holiday
//! records that displace classes on their date.

pub mod config;
pub mod error;
pub mod types;

pub use config::RemindmeConfig;
pub use error::{CoreError, Result};
pub use types::{
    ClassInfo, ClassType, ClockTime, GroupTag, Holiday, Identity, ScheduleViolation, WeeklySchedule,
    Weekday,
};
