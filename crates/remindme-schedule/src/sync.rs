use std::sync::Arc;

use remindme_core::{GroupTag, Identity, WeeklySchedule};
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::holiday::HolidayCalendar;
use crate::partition::partition_all;
use crate::remote::ScheduleSource;
use crate::store::ScheduleStore;

/// Outcome of re-fetching the stored selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// The schedule to show: fresh if the fetch worked, cached otherwise.
    /// `None` when nothing was ever selected.
    pub schedule: Option<WeeklySchedule>,
    /// The active schedule was rewritten.
    pub changed: bool,
    /// The fetch failed and `schedule` is the cached copy.
    pub sync_failed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySync {
    pub calendar: HolidayCalendar,
    pub sync_failed: bool,
}

/// Keeps the local cache in step with the remote source.
pub struct ScheduleSync {
    source: Arc<dyn ScheduleSource>,
    store: Arc<ScheduleStore>,
}

impl ScheduleSync {
    pub fn new(source: Arc<dyn ScheduleSource>, store: Arc<ScheduleStore>) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    /// Fetch the section for `identity`, keep its group's share and persist
    /// the new selection. Nothing is written if the fetch fails.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn select(&self, identity: &Identity) -> Result<WeeklySchedule> {
        let fetched = self.source.fetch_schedule(&identity.schedule_id()).await?;
        let full = fetched.schedule.normalized();
        for violation in full.violations() {
            warn!(%violation, "schedule entry out of order");
        }

        let active = group_share(&full, &identity.group);
        self.store.save_selection(identity, &full, &active)?;
        info!(classes = active.class_count(), "schedule selected");
        Ok(active)
    }

    /// Re-fetch the stored selection. A failed fetch is not an error: the
    /// cached schedule is served and the report says so.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<SyncReport> {
        let Some(identity) = self.store.identity()? else {
            return Ok(SyncReport::default());
        };

        let fetched = match self.source.fetch_schedule(&identity.schedule_id()).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "schedule sync failed, serving cache");
                return Ok(SyncReport {
                    schedule: self.store.active_schedule()?,
                    changed: false,
                    sync_failed: true,
                });
            }
        };

        let full = fetched.schedule.normalized();
        let active = group_share(&full, &identity.group);
        self.store.save_full(&full)?;
        let changed = self.store.replace_active(&active)?;
        if changed {
            info!(classes = active.class_count(), "schedule updated from remote");
        }
        Ok(SyncReport {
            schedule: Some(active),
            changed,
            sync_failed: false,
        })
    }

    /// Refresh the holiday list. Stale data is acceptable: on failure the
    /// cached list is returned.
    #[instrument(skip(self))]
    pub async fn refresh_holidays(&self) -> Result<HolidaySync> {
        match self.source.fetch_holidays().await {
            Ok(records) => {
                self.store.save_holidays(&records)?;
                Ok(HolidaySync {
                    calendar: HolidayCalendar::new(records),
                    sync_failed: false,
                })
            }
            Err(e) => {
                warn!(error = %e, "holiday sync failed, serving cache");
                Ok(HolidaySync {
                    calendar: self.store.holidays()?,
                    sync_failed: true,
                })
            }
        }
    }

    /// Published schedule ids, sorted and de-duplicated.
    pub async fn available_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.source.list_schedule_ids().await?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

/// Partition `full` for the default groups plus `group` and keep `group`'s
/// share.
fn group_share(full: &WeeklySchedule, group: &GroupTag) -> WeeklySchedule {
    let mut groups = GroupTag::defaults();
    if !groups.contains(group) {
        groups.push(group.clone());
    }
    let grouped = partition_all(full, &groups);
    for tag in grouped.groups() {
        let classes = grouped.for_group(tag).map_or(0, WeeklySchedule::class_count);
        debug!(group = %tag, classes, "group partitioned");
    }
    grouped.for_group(group).cloned().unwrap_or_default()
}
