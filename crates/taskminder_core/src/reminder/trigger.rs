//! Recurring reminder triggers.
//!
//! # Invariants
//! - `hour`/`minute` come from the task's local time-of-day.
//! - Weekly `weekday` uses 1 = Sunday ... 7 = Saturday.
//! - Monthly triggers never fire in months lacking `day` (no clamping to
//!   the last day of the month).

use crate::model::task::Repeat;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Months scanned when looking for the next monthly occurrence. Any day
/// 1..=31 occurs at least once within this window.
const MONTHLY_SCAN_LIMIT: u32 = 24;

/// Recurrence rule handed to the notification facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReminderTrigger {
    Daily {
        hour: u32,
        minute: u32,
    },
    Weekly {
        weekday: u32,
        hour: u32,
        minute: u32,
    },
    Monthly {
        day: u32,
        hour: u32,
        minute: u32,
    },
}

impl ReminderTrigger {
    /// Builds the trigger for a recurrence anchored at a local timestamp.
    ///
    /// Returns `None` for `Repeat::None`.
    pub fn for_recurrence(repeat: Repeat, anchor: NaiveDateTime) -> Option<Self> {
        let hour = anchor.hour();
        let minute = anchor.minute();
        match repeat {
            Repeat::None => None,
            Repeat::Daily => Some(Self::Daily { hour, minute }),
            Repeat::Weekly => Some(Self::Weekly {
                weekday: weekday_number(anchor.weekday()),
                hour,
                minute,
            }),
            Repeat::Monthly => Some(Self::Monthly {
                day: anchor.day(),
                hour,
                minute,
            }),
        }
    }

    pub fn hour(&self) -> u32 {
        match *self {
            Self::Daily { hour, .. } | Self::Weekly { hour, .. } | Self::Monthly { hour, .. } => {
                hour
            }
        }
    }

    pub fn minute(&self) -> u32 {
        match *self {
            Self::Daily { minute, .. }
            | Self::Weekly { minute, .. }
            | Self::Monthly { minute, .. } => minute,
        }
    }

    /// Returns the first local wall-clock occurrence strictly after `after`.
    pub fn next_fire_after(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        let start = after.date();
        match *self {
            Self::Daily { hour, minute } => (0..=1)
                .filter_map(|offset| start.checked_add_days(Days::new(offset)))
                .filter_map(|date| date.and_hms_opt(hour, minute, 0))
                .find(|candidate| *candidate > after),
            Self::Weekly {
                weekday,
                hour,
                minute,
            } => (0..=7)
                .filter_map(|offset| start.checked_add_days(Days::new(offset)))
                .filter(|date| weekday_number(date.weekday()) == weekday)
                .filter_map(|date| date.and_hms_opt(hour, minute, 0))
                .find(|candidate| *candidate > after),
            Self::Monthly { day, hour, minute } => (0..=MONTHLY_SCAN_LIMIT)
                .filter_map(|offset| month_with_offset(start, offset))
                .filter_map(|(year, month)| NaiveDate::from_ymd_opt(year, month, day))
                .filter_map(|date| date.and_hms_opt(hour, minute, 0))
                .find(|candidate| *candidate > after),
        }
    }
}

/// Weekday number as understood by the notification facility.
pub fn weekday_number(weekday: Weekday) -> u32 {
    weekday.num_days_from_sunday() + 1
}

fn month_with_offset(start: NaiveDate, offset: u32) -> Option<(i32, u32)> {
    let zero_based = start.month0() + offset;
    let year = start.year().checked_add(i32::try_from(zero_based / 12).ok()?)?;
    Some((year, zero_based % 12 + 1))
}

#[cfg(test)]
mod tests {
    use super::{weekday_number, ReminderTrigger};
    use crate::model::task::Repeat;
    use chrono::{NaiveDate, NaiveDateTime, Weekday};

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn builds_trigger_per_recurrence() {
        // 2026-01-10 is a Saturday.
        let anchor = at(2026, 1, 10, 14, 30);
        assert_eq!(ReminderTrigger::for_recurrence(Repeat::None, anchor), None);
        assert_eq!(
            ReminderTrigger::for_recurrence(Repeat::Daily, anchor),
            Some(ReminderTrigger::Daily {
                hour: 14,
                minute: 30
            })
        );
        assert_eq!(
            ReminderTrigger::for_recurrence(Repeat::Weekly, anchor),
            Some(ReminderTrigger::Weekly {
                weekday: 7,
                hour: 14,
                minute: 30
            })
        );
        assert_eq!(
            ReminderTrigger::for_recurrence(Repeat::Monthly, anchor),
            Some(ReminderTrigger::Monthly {
                day: 10,
                hour: 14,
                minute: 30
            })
        );
    }

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        assert_eq!(weekday_number(Weekday::Sun), 1);
        assert_eq!(weekday_number(Weekday::Mon), 2);
        assert_eq!(weekday_number(Weekday::Sat), 7);
    }

    #[test]
    fn daily_next_fire_rolls_to_tomorrow_once_passed() {
        let trigger = ReminderTrigger::Daily { hour: 9, minute: 0 };
        assert_eq!(
            trigger.next_fire_after(at(2026, 3, 5, 8, 59)),
            Some(at(2026, 3, 5, 9, 0))
        );
        assert_eq!(
            trigger.next_fire_after(at(2026, 3, 5, 9, 0)),
            Some(at(2026, 3, 6, 9, 0))
        );
    }

    #[test]
    fn weekly_next_fire_finds_matching_weekday() {
        // Monday = 2; 2026-03-05 is a Thursday.
        let trigger = ReminderTrigger::Weekly {
            weekday: 2,
            hour: 18,
            minute: 15,
        };
        assert_eq!(
            trigger.next_fire_after(at(2026, 3, 5, 12, 0)),
            Some(at(2026, 3, 9, 18, 15))
        );
        assert_eq!(
            trigger.next_fire_after(at(2026, 3, 9, 18, 15)),
            Some(at(2026, 3, 16, 18, 15))
        );
    }

    #[test]
    fn monthly_next_fire_skips_months_without_that_day() {
        let trigger = ReminderTrigger::Monthly {
            day: 31,
            hour: 7,
            minute: 0,
        };
        assert_eq!(
            trigger.next_fire_after(at(2026, 1, 31, 8, 0)),
            Some(at(2026, 3, 31, 7, 0))
        );
        assert_eq!(
            trigger.next_fire_after(at(2026, 11, 15, 0, 0)),
            Some(at(2026, 12, 31, 7, 0))
        );
    }

    #[test]
    fn monthly_next_fire_crosses_year_boundary() {
        let trigger = ReminderTrigger::Monthly {
            day: 5,
            hour: 10,
            minute: 0,
        };
        assert_eq!(
            trigger.next_fire_after(at(2026, 12, 6, 0, 0)),
            Some(at(2027, 1, 5, 10, 0))
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let value = serde_json::to_value(ReminderTrigger::Weekly {
            weekday: 3,
            hour: 8,
            minute: 45,
        })
        .unwrap();
        assert_eq!(value["type"], "weekly");
        assert_eq!(value["weekday"], 3);
    }
}
