//! Due-test for the backup sweep.
//!
//! The sweep is the compensation path for timers that never fired (timer
//! drift, system sleep, reminders added while the process was suspended). It
//! backstops the scheduler; it never replaces it.

use chrono::{Datelike, NaiveDateTime, TimeDelta};

use crate::error::{Error, Result};
use crate::model::Reminder;
use crate::occurrence::{parse_local_datetime, parse_recurring_time, weekday_index};

/// Whether `reminder` should be surfaced by a sweep running at `now`.
///
/// One-off reminders are due once their stored instant has passed. Recurring
/// reminders are due only when `now` falls on an allowed weekday inside the
/// window `[recurring_time, recurring_time + period]`; the window keeps a
/// passed slot from re-firing on every sweep for the rest of the day.
pub fn due_at_sweep(reminder: &Reminder, now: NaiveDateTime, period: TimeDelta) -> Result<bool> {
    if reminder.completed {
        return Ok(false);
    }

    if !reminder.is_recurring {
        let due = parse_local_datetime(&reminder.datetime)?;
        return Ok(due <= now);
    }

    let days = reminder.recurring_days.as_deref().unwrap_or(&[]);
    if !days.contains(&weekday_index(now.weekday())) {
        return Ok(false);
    }
    let time = match reminder.recurring_time.as_deref() {
        Some(t) => parse_recurring_time(t)?,
        None => {
            return Err(Error::MalformedDatetime {
                value: String::new(),
            });
        }
    };

    let slot = now.date().and_time(time);
    Ok(now >= slot && now - slot <= period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reminder;
    use chrono::NaiveDate;

    fn period() -> TimeDelta {
        TimeDelta::seconds(60)
    }

    // 2024-01-01 was a Monday.
    fn monday_at(hour: u32, min: u32, sec: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, min, sec)
            .unwrap()
    }

    #[test]
    fn one_off_due_once_past() {
        let reminder = Reminder::one_off("Call dentist", "2024-01-01T09:00:00");
        assert!(!due_at_sweep(&reminder, monday_at(8, 59, 0), period()).unwrap());
        assert!(due_at_sweep(&reminder, monday_at(9, 0, 0), period()).unwrap());
        // One-off reminders stay due until dealt with, however late the sweep.
        assert!(due_at_sweep(&reminder, monday_at(15, 0, 0), period()).unwrap());
    }

    #[test]
    fn completed_is_never_due() {
        let mut reminder = Reminder::one_off("Call dentist", "2024-01-01T09:00:00");
        reminder.completed = true;
        assert!(!due_at_sweep(&reminder, monday_at(10, 0, 0), period()).unwrap());
    }

    #[test]
    fn recurring_due_inside_window() {
        let reminder = Reminder::recurring("Standup", vec![1], "09:00", monday_at(9, 0, 0));
        assert!(due_at_sweep(&reminder, monday_at(9, 0, 30), period()).unwrap());
        assert!(due_at_sweep(&reminder, monday_at(9, 1, 0), period()).unwrap());
    }

    #[test]
    fn recurring_not_due_after_window() {
        let reminder = Reminder::recurring("Standup", vec![1], "09:00", monday_at(9, 0, 0));
        assert!(!due_at_sweep(&reminder, monday_at(9, 1, 1), period()).unwrap());
        assert!(!due_at_sweep(&reminder, monday_at(14, 0, 0), period()).unwrap());
    }

    #[test]
    fn recurring_not_due_before_slot() {
        let reminder = Reminder::recurring("Standup", vec![1], "09:00", monday_at(9, 0, 0));
        assert!(!due_at_sweep(&reminder, monday_at(8, 59, 59), period()).unwrap());
    }

    #[test]
    fn recurring_not_due_on_other_weekday() {
        // Tuesday sweep for a Monday-only reminder.
        let reminder = Reminder::recurring("Standup", vec![1], "09:00", monday_at(9, 0, 0));
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 30)
            .unwrap();
        assert!(!due_at_sweep(&reminder, tuesday, period()).unwrap());
    }

    #[test]
    fn malformed_datetime_is_an_error() {
        let reminder = Reminder::one_off("Broken", "yesterday-ish");
        assert!(due_at_sweep(&reminder, monday_at(9, 0, 0), period()).is_err());
    }
}
