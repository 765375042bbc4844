//! Pure next-occurrence computation for one-off and recurring reminders.
//!
//! Everything here is deterministic given `now`; callers pass the local
//! wall-clock time in so the scheduler and tests agree on what "now" means.

use chrono::{DateTime, Datelike, Days, NaiveDateTime, NaiveTime, Weekday};

use crate::error::{Error, Result};
use crate::model::Reminder;

/// Weekday as the storage blob encodes it: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

/// Parse a stored datetime into local wall-clock time.
///
/// Accepts RFC 3339 with an offset, the same with a trailing `[Zone/Name]`
/// suffix (older state files carry e.g.
/// `2025-05-01T09:30:00+05:30[Asia/Calcutta]`), and bare
/// `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_local_datetime(value: &str) -> Result<NaiveDateTime> {
    // Strip a bracketed zone name; the offset before it is what matters.
    let trimmed = match value.find('[') {
        Some(idx) => &value[..idx],
        None => value,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    Err(Error::MalformedDatetime {
        value: value.to_string(),
    })
}

/// Parse an "HH:MM" (or "HH:MM:SS") time-of-day string.
pub fn parse_recurring_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| Error::MalformedDatetime {
            value: value.to_string(),
        })
}

/// Compute the next instant at which `reminder` is due, strictly after `now`.
///
/// One-off reminders return their stored instant if it is still in the
/// future, `None` once it has passed (the backup sweep decides what to do
/// with already-due ones). Recurring reminders scan today plus the next
/// seven days for the earliest allowed weekday at `recurring_time`; an empty
/// day set yields `None`. Malformed date or time strings are an error so the
/// caller can log and skip the record.
pub fn next_fire_instant(reminder: &Reminder, now: NaiveDateTime) -> Result<Option<NaiveDateTime>> {
    if !reminder.is_recurring {
        let due = parse_local_datetime(&reminder.datetime)?;
        return Ok((due > now).then_some(due));
    }

    let days = reminder.recurring_days.as_deref().unwrap_or(&[]);
    if days.is_empty() {
        return Ok(None);
    }
    let time = match reminder.recurring_time.as_deref() {
        Some(t) => parse_recurring_time(t)?,
        None => {
            return Err(Error::MalformedDatetime {
                value: String::new(),
            });
        }
    };

    // Today counts only if today-at-time is still ahead; offset 7 covers the
    // wrap back around to the same weekday next week.
    for offset in 0..=7u64 {
        let Some(date) = now.date().checked_add_days(Days::new(offset)) else {
            continue;
        };
        if !days.contains(&weekday_index(date.weekday())) {
            continue;
        }
        let candidate = date.and_time(time);
        if candidate > now {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
