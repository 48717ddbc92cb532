use std::sync::Arc;

use remindme_core::{Holiday, Identity, WeeklySchedule};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::holiday::HolidayCalendar;
use crate::kv::{load_json, store_json, KeyValueStore};

pub const IDENTITY_KEY: &str = "identity";
pub const FULL_SCHEDULE_KEY: &str = "full_schedule";
pub const GROUP_SCHEDULE_KEY: &str = "group_schedule";
pub const HOLIDAYS_KEY: &str = "holidays";

/// Cached copy of the user's selection, the schedule it was fetched for and
/// the holiday list.
///
/// Every read returns `None`/empty on first run or when the stored value no
/// longer decodes; callers treat that as "nothing cached yet".
pub struct ScheduleStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ScheduleStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn identity(&self) -> Result<Option<Identity>> {
        load_json(self.kv.as_ref(), IDENTITY_KEY)
    }

    /// The section's schedule as published, before group filtering.
    pub fn full_schedule(&self) -> Result<Option<WeeklySchedule>> {
        load_json(self.kv.as_ref(), FULL_SCHEDULE_KEY)
    }

    /// The schedule partitioned for the stored group.
    pub fn active_schedule(&self) -> Result<Option<WeeklySchedule>> {
        load_json(self.kv.as_ref(), GROUP_SCHEDULE_KEY)
    }

    pub fn holidays(&self) -> Result<HolidayCalendar> {
        let records: Option<Vec<Holiday>> = load_json(self.kv.as_ref(), HOLIDAYS_KEY)?;
        Ok(records.map(HolidayCalendar::new).unwrap_or_default())
    }

    /// Persist a new selection. The identity is written last so a partial
    /// write never leaves an identity pointing at another section's data.
    #[instrument(skip_all, fields(identity = %identity))]
    pub fn save_selection(
        &self,
        identity: &Identity,
        full: &WeeklySchedule,
        active: &WeeklySchedule,
    ) -> Result<()> {
        store_json(self.kv.as_ref(), FULL_SCHEDULE_KEY, full)?;
        store_json(self.kv.as_ref(), GROUP_SCHEDULE_KEY, active)?;
        store_json(self.kv.as_ref(), IDENTITY_KEY, identity)?;
        info!(classes = active.class_count(), "selection saved");
        Ok(())
    }

    pub fn save_full(&self, full: &WeeklySchedule) -> Result<()> {
        store_json(self.kv.as_ref(), FULL_SCHEDULE_KEY, full)
    }

    /// Replace the active schedule if it differs from the cached one.
    /// Returns whether anything was written.
    #[instrument(skip(self, schedule))]
    pub fn replace_active(&self, schedule: &WeeklySchedule) -> Result<bool> {
        if self.active_schedule()?.as_ref() == Some(schedule) {
            debug!("active schedule unchanged");
            return Ok(false);
        }
        store_json(self.kv.as_ref(), GROUP_SCHEDULE_KEY, schedule)?;
        info!(classes = schedule.class_count(), "active schedule replaced");
        Ok(true)
    }

    #[instrument(skip(self, holidays), fields(count = holidays.len()))]
    pub fn save_holidays(&self, holidays: &[Holiday]) -> Result<()> {
        store_json(self.kv.as_ref(), HOLIDAYS_KEY, holidays)
    }

    /// Forget the selection and everything fetched for it.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        for key in [IDENTITY_KEY, FULL_SCHEDULE_KEY, GROUP_SCHEDULE_KEY, HOLIDAYS_KEY] {
            self.kv.remove(key)?;
        }
        info!("schedule cache cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKeyValueStore;
    use chrono::NaiveDate;
    use remindme_core::{ClassInfo, ClassType, ClockTime, GroupTag, Weekday};

    fn store() -> (Arc<InMemoryKeyValueStore>, ScheduleStore) {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        (kv.clone(), ScheduleStore::new(kv))
    }

    fn schedule(course: &str) -> WeeklySchedule {
        WeeklySchedule::from_days([(
            Weekday::Monday,
            vec![ClassInfo {
                period: 1,
                start_time: ClockTime::saturating(9, 0),
                end_time: ClockTime::saturating(10, 0),
                course_name: course.to_string(),
                instructor: String::new(),
                building: String::new(),
                room: String::new(),
                group: GroupTag::all(),
                class_type: ClassType::Lecture,
            }],
        )])
    }

    #[test]
    fn first_run_reads_as_empty() {
        let (_, store) = store();
        assert!(store.identity().unwrap().is_none());
        assert!(store.active_schedule().unwrap().is_none());
        assert!(store.holidays().unwrap().is_empty());
    }

    #[test]
    fn selection_round_trips() {
        let (_, store) = store();
        let identity = Identity::parse("UNIV-CS-3-A", GroupTag::new("Group 1")).unwrap();
        store
            .save_selection(&identity, &schedule("Math"), &schedule("Math"))
            .unwrap();

        assert_eq!(store.identity().unwrap(), Some(identity));
        assert_eq!(store.full_schedule().unwrap(), Some(schedule("Math")));
        assert_eq!(store.active_schedule().unwrap(), Some(schedule("Math")));
    }

    #[test]
    fn replace_active_detects_changes() {
        let (_, store) = store();
        assert!(store.replace_active(&schedule("Math")).unwrap());
        assert!(!store.replace_active(&schedule("Math")).unwrap());
        assert!(store.replace_active(&schedule("Physics")).unwrap());
    }

    #[test]
    fn malformed_cache_is_treated_as_absent() {
        let (kv, store) = store();
        kv.set(GROUP_SCHEDULE_KEY, "[1, 2").unwrap();
        kv.set(HOLIDAYS_KEY, "\"nope\"").unwrap();
        assert!(store.active_schedule().unwrap().is_none());
        assert!(store.holidays().unwrap().is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let (_, store) = store();
        let identity = Identity::parse("UNIV-CS-3-A", GroupTag::new("Group 1")).unwrap();
        store
            .save_selection(&identity, &schedule("Math"), &schedule("Math"))
            .unwrap();
        store
            .save_holidays(&[Holiday {
                date: NaiveDate::from_ymd_opt(2026, 12, 16).unwrap(),
                name: "Victory Day".to_string(),
            }])
            .unwrap();
        assert_eq!(store.holidays().unwrap().len(), 1);

        store.clear().unwrap();
        assert!(store.identity().unwrap().is_none());
        assert!(store.full_schedule().unwrap().is_none());
        assert!(store.holidays().unwrap().is_empty());
    }
}
