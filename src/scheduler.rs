//! Per-reminder timer arena.
//!
//! The scheduler owns a map of reminder id -> pending single-fire timer and
//! reconciles it against the current reminder set on every change. It only
//! arms timers for instants strictly in the future; already-due reminders
//! are the backup sweep's job, which keeps bulk reconciliation from bursting
//! notifications. A firing timer sends `Event::ReminderDue` on the service
//! channel; the service re-checks the store before presenting, so an event
//! that raced a deletion is dropped there.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::model::Reminder;
use crate::occurrence::next_fire_instant;
use crate::service::Event;

struct TimerEntry {
    /// Instant the timer targets, kept for diagnostics and tests.
    due: NaiveDateTime,
    handle: JoinHandle<()>,
}

pub struct Scheduler {
    entries: HashMap<String, TimerEntry>,
    events: UnboundedSender<Event>,
}

impl Scheduler {
    pub fn new(events: UnboundedSender<Event>) -> Self {
        Self {
            entries: HashMap::new(),
            events,
        }
    }

    /// Bring the timer map in sync with `reminders`.
    ///
    /// Idempotent: a second call with an unchanged list arms nothing and
    /// cancels nothing. Cancellation of stale entries is synchronous; by the
    /// time this returns no removed timer can still fire.
    pub fn reconcile(&mut self, reminders: &[Reminder], now: NaiveDateTime) {
        let live: HashMap<&str, &Reminder> =
            reminders.iter().map(|r| (r.id.as_str(), r)).collect();

        // Drop entries whose reminder is gone or completed.
        self.entries.retain(|id, entry| {
            match live.get(id.as_str()) {
                Some(r) if !r.completed => true,
                _ => {
                    debug!(reminder = %id, "cancelling stale timer");
                    entry.handle.abort();
                    false
                }
            }
        });

        // Arm a timer for every untracked reminder with a future instant.
        for reminder in reminders {
            if reminder.completed || self.entries.contains_key(&reminder.id) {
                continue;
            }
            match next_fire_instant(reminder, now) {
                Ok(Some(due)) if due > now => {
                    let delta = (due - now).to_std().unwrap_or_default();
                    debug!(
                        reminder = %reminder.id,
                        title = %reminder.title,
                        in_ms = delta.as_millis() as u64,
                        "arming timer"
                    );
                    let events = self.events.clone();
                    let id = reminder.id.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(delta).await;
                        let _ = events.send(Event::ReminderDue(id));
                    });
                    self.entries.insert(reminder.id.clone(), TimerEntry { due, handle });
                }
                // Already due (or never due): leave it to the backup sweep.
                Ok(_) => {}
                Err(e) => {
                    warn!(reminder = %reminder.id, error = %e, "skipping unschedulable reminder");
                }
            }
        }
    }

    /// Forget the entry for a timer that just fired.
    pub fn on_fired(&mut self, id: &str) {
        if let Some(entry) = self.entries.remove(id) {
            entry.handle.abort();
        }
    }

    /// Cancel one timer by id. No-op for unknown or already-fired ids.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn armed_count(&self) -> usize {
        self.entries.len()
    }

    /// `(id, due instant)` pairs of the pending timers, for diagnostics.
    pub fn armed(&self) -> impl Iterator<Item = (&str, NaiveDateTime)> {
        self.entries.iter().map(|(id, e)| (id.as_str(), e.due))
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for entry in self.entries.values() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Reminder;
    use chrono::NaiveDate;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn monday_at(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn one_off(title: &str, datetime: &str) -> Reminder {
        Reminder::one_off(title, datetime)
    }

    /// Let spawned timer tasks get a turn on the paused runtime.
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn arms_only_future_reminders() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let future = one_off("soon", "2024-01-01T09:01:00");
        let past = one_off("late", "2024-01-01T08:00:00");
        scheduler.reconcile(&[future.clone(), past.clone()], monday_at(9, 0));

        assert!(scheduler.is_armed(&future.id));
        assert!(!scheduler.is_armed(&past.id));
        assert_eq!(scheduler.armed_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_exactly_once_at_due_instant() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let reminder = one_off("soon", "2024-01-01T09:00:01");
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        let Event::ReminderDue(id) = rx.try_recv().unwrap();
        assert_eq!(id, reminder.id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let reminder = one_off("soon", "2024-01-01T10:00:00");
        let now = monday_at(9, 0);
        scheduler.reconcile(std::slice::from_ref(&reminder), now);
        let due_before: Vec<_> = scheduler.armed().map(|(_, due)| due).collect();

        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 30));
        let due_after: Vec<_> = scheduler.armed().map(|(_, due)| due).collect();

        assert_eq!(scheduler.armed_count(), 1);
        assert_eq!(due_before, due_after);
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_cancels_before_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let reminder = one_off("soon", "2024-01-01T09:00:05");
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));
        assert!(scheduler.is_armed(&reminder.id));

        // Reminder disappears from the store.
        scheduler.reconcile(&[], monday_at(9, 0));
        assert!(!scheduler.is_armed(&reminder.id));

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_cancels_before_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let mut reminder = one_off("soon", "2024-01-01T09:00:05");
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));

        reminder.completed = true;
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));
        assert_eq!(scheduler.armed_count(), 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_reminder_is_never_armed() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let mut reminder = one_off("done already", "2024-01-01T10:00:00");
        reminder.completed = true;
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reminder_does_not_poison_the_pass() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let broken = one_off("broken", "not-a-date");
        let fine = one_off("fine", "2024-01-01T10:00:00");
        scheduler.reconcile(&[broken.clone(), fine.clone()], monday_at(9, 0));

        assert!(!scheduler.is_armed(&broken.id));
        assert!(scheduler.is_armed(&fine.id));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(tx);

        let reminder = one_off("soon", "2024-01-01T10:00:00");
        scheduler.reconcile(std::slice::from_ref(&reminder), monday_at(9, 0));

        assert!(scheduler.cancel(&reminder.id));
        assert!(!scheduler.cancel(&reminder.id));
        assert!(!scheduler.cancel("never-existed"));
    }
}
