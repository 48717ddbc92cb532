use std::collections::BTreeMap;

use chrono::NaiveDate;
use remindme_core::Holiday;
use tracing::warn;

/// Holiday records keyed by calendar date, at most one per date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    by_date: BTreeMap<NaiveDate, Holiday>,
}

impl HolidayCalendar {
    /// Build from records in any order. When the feed lists a date twice the
    /// first record is kept.
    pub fn new(records: impl IntoIterator<Item = Holiday>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Holiday> = BTreeMap::new();
        for holiday in records {
            if let Some(existing) = by_date.get(&holiday.date) {
                warn!(date = %holiday.date, kept = %existing.name, dropped = %holiday.name, "duplicate holiday date");
                continue;
            }
            by_date.insert(holiday.date, holiday);
        }
        Self { by_date }
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Records in date order.
    pub fn records(&self) -> impl Iterator<Item = &Holiday> {
        self.by_date.values()
    }
}

impl FromIterator<Holiday> for HolidayCalendar {
    fn from_iter<I: IntoIterator<Item = Holiday>>(iter: I) -> Self {
        Self::new(iter)
    }
}

pub fn is_holiday(calendar: &HolidayCalendar, date: NaiveDate) -> bool {
    calendar.by_date.contains_key(&date)
}

pub fn holiday_for(calendar: &HolidayCalendar, date: NaiveDate) -> Option<&Holiday> {
    calendar.by_date.get(&date)
}
