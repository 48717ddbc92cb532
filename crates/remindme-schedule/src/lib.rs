//! `remindme-schedule`: everything between the remote feed and a
//! group-specific weekly schedule.
//!
//! - [`partition`] filters a section's schedule down to one group.
//! - [`time`] and [`holiday`] answer "what is on now / tomorrow" against an
//!   injected clock; [`view`] composes them with the holiday override.
//! - [`store`] caches the selection over a [`kv::KeyValueStore`].
//! - [`sync`] reconciles the cache with a [`remote::ScheduleSource`].

pub mod db;
pub mod error;
pub mod holiday;
pub mod kv;
pub mod partition;
pub mod remote;
pub mod store;
pub mod sync;
pub mod time;
pub mod view;

pub use error::{Result, ScheduleError};
pub use holiday::{holiday_for, is_holiday, HolidayCalendar};
pub use kv::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
pub use partition::{partition, partition_all, GroupedSchedule};
pub use remote::{FetchedSchedule, HttpScheduleSource, ScheduleSource};
pub use store::ScheduleStore;
pub use sync::{HolidaySync, ScheduleSync, SyncReport};
pub use view::{today_view, week_view, DayEntry, DayView};
