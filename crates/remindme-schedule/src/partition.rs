use std::collections::BTreeMap;

use remindme_core::{GroupTag, WeeklySchedule};

/// Keep, for every day, the entries meant for `group`: its own classes plus
/// those tagged `All`. Relative order is preserved and every input day stays
/// a key, possibly with an empty list.
///
/// Partitioning an already partitioned schedule with the same tag is a no-op.
pub fn partition(schedule: &WeeklySchedule, group: &GroupTag) -> WeeklySchedule {
    WeeklySchedule::from_days(schedule.days().map(|(day, classes)| {
        let kept = classes
            .iter()
            .filter(|class| class.group.is_all() || class.group == *group)
            .cloned()
            .collect();
        (day, kept)
    }))
}

/// One weekly schedule per group, all derived from the same published source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedSchedule {
    groups: BTreeMap<GroupTag, WeeklySchedule>,
}

impl GroupedSchedule {
    pub fn for_group(&self, group: &GroupTag) -> Option<&WeeklySchedule> {
        self.groups.get(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupTag> {
        self.groups.keys()
    }
}

/// Partition `schedule` once for each tag in `groups`.
pub fn partition_all(schedule: &WeeklySchedule, groups: &[GroupTag]) -> GroupedSchedule {
    GroupedSchedule {
        groups: groups
            .iter()
            .map(|group| (group.clone(), partition(schedule, group)))
            .collect(),
    }
}
