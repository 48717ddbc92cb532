use chrono::{Duration, NaiveDateTime};

use crate::types::Trigger;

/// Next local instant `trigger` fires strictly after `from`.
///
/// Returns `None` for a one-shot trigger whose instant has already passed.
pub fn compute_next_fire(trigger: &Trigger, from: NaiveDateTime) -> Option<NaiveDateTime> {
    match trigger {
        Trigger::At { at } => (*at > from).then_some(*at),

        Trigger::Daily { time } => {
            let candidate = from.date().and_time(time.to_naive());
            if candidate > from {
                Some(candidate)
            } else {
                Some(candidate + Duration::days(1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use remindme_core::ClockTime;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn one_shot_only_in_the_future() {
        let trigger = Trigger::At { at: at(8, 0) };
        assert_eq!(compute_next_fire(&trigger, at(7, 0)), Some(at(8, 0)));
        assert_eq!(compute_next_fire(&trigger, at(8, 0)), None);
        assert_eq!(compute_next_fire(&trigger, at(9, 0)), None);
    }

    #[test]
    fn daily_rolls_over_after_its_time() {
        let trigger = Trigger::Daily {
            time: ClockTime::saturating(21, 0),
        };
        assert_eq!(compute_next_fire(&trigger, at(20, 59)), Some(at(21, 0)));
        assert_eq!(
            compute_next_fire(&trigger, at(21, 0)),
            Some(at(21, 0) + Duration::days(1))
        );
    }
}
