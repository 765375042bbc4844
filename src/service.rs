//! The reminder event loop.
//!
//! `ReminderService` wires the store, scheduler, presenter and backup sweep
//! together and is the single owner of all of them. Every mutation, timer
//! firing, sweep tick and user action is handled to completion on one logic
//! task, so none of the components need internal locking.

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::{MAX_ACTIVE_NOTIFICATIONS, SWEEP_INTERVAL_MS};
use crate::error::Result;
use crate::model::{Priority, Project, Reminder, Todo};
use crate::presenter::{Platform, Presenter};
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::sweep::due_at_sweep;

#[derive(Debug, Clone)]
pub enum Event {
    /// A per-reminder timer reached its target instant.
    ReminderDue(String),
}

fn wall_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub struct ReminderService {
    store: Store,
    scheduler: Scheduler,
    presenter: Presenter,
    // Kept so the channel never closes while timers may still send.
    _events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    sweep_period: TimeDelta,
}

impl ReminderService {
    pub fn new(store: Store, platform: Box<dyn Platform>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            scheduler: Scheduler::new(tx.clone()),
            presenter: Presenter::new(MAX_ACTIVE_NOTIFICATIONS, platform),
            _events_tx: tx,
            events_rx: rx,
            sweep_period: TimeDelta::milliseconds(SWEEP_INTERVAL_MS as i64),
        }
    }

    // ========================================================================
    // Reminder operations (single mutation entry point -> reconcile)
    // ========================================================================

    pub fn create_one_off(&mut self, title: &str, datetime: &str) -> Result<Reminder> {
        self.create_one_off_at(title, datetime, wall_now())
    }

    pub fn create_one_off_at(
        &mut self,
        title: &str,
        datetime: &str,
        now: NaiveDateTime,
    ) -> Result<Reminder> {
        let reminder = self.store.create_one_off(title, datetime, now)?;
        self.after_mutation(now)?;
        Ok(reminder)
    }

    pub fn create_recurring(&mut self, title: &str, days: &[u8], time: &str) -> Result<Reminder> {
        self.create_recurring_at(title, days, time, wall_now())
    }

    pub fn create_recurring_at(
        &mut self,
        title: &str,
        days: &[u8],
        time: &str,
        now: NaiveDateTime,
    ) -> Result<Reminder> {
        let reminder = self.store.create_recurring(title, days, time, now)?;
        self.after_mutation(now)?;
        Ok(reminder)
    }

    /// Delete a reminder, cancelling any armed timer for it. Returns whether
    /// a record existed. The visible notification, if any, stays up until
    /// dismissed.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.store.delete_reminder(id);
        if removed {
            self.after_mutation(wall_now())?;
        }
        Ok(removed)
    }

    pub fn update_reminder(&mut self, id: &str, title: &str) -> Result<()> {
        self.store.update_reminder(id, title)?;
        self.after_mutation(wall_now())?;
        Ok(())
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let completed = self.store.toggle_reminder(id)?;
        self.after_mutation(wall_now())?;
        Ok(completed)
    }

    /// Mark completed in the store (cancelling its timer) and clear the
    /// visible notification. The only path that does both.
    pub fn complete(&mut self, id: &str) -> Result<()> {
        self.store.set_completed(id, true)?;
        self.after_mutation(wall_now())?;
        self.presenter.dismiss(id);
        Ok(())
    }

    /// Remove the visible notification only; `completed` is untouched.
    pub fn dismiss(&mut self, id: &str) -> bool {
        self.presenter.dismiss(id)
    }

    pub fn reminders(&self) -> &[Reminder] {
        self.store.reminders()
    }

    pub fn active_notifications(&self) -> Vec<Reminder> {
        self.presenter.active()
    }

    pub fn has_platform_permission(&self) -> Option<bool> {
        self.presenter.has_permission()
    }

    pub fn request_platform_permission(&mut self) -> bool {
        self.presenter.request_permission()
    }

    // ========================================================================
    // Todo / project passthrough (thin CRUD, no temporal logic)
    // ========================================================================

    pub fn todos(&self) -> &[Todo] {
        self.store.todos()
    }

    pub fn add_todo(
        &mut self,
        title: &str,
        priority: Priority,
        project_id: Option<String>,
    ) -> Result<Todo> {
        let todo = self.store.add_todo(title, priority, project_id)?;
        self.store.save()?;
        Ok(todo)
    }

    pub fn toggle_todo(&mut self, id: &str) -> Result<bool> {
        let completed = self.store.toggle_todo(id)?;
        self.store.save()?;
        Ok(completed)
    }

    pub fn delete_todo(&mut self, id: &str) -> Result<bool> {
        let removed = self.store.delete_todo(id);
        self.store.save()?;
        Ok(removed)
    }

    pub fn projects(&self) -> &[Project] {
        self.store.projects()
    }

    pub fn add_project(&mut self, title: &str) -> Result<Project> {
        let project = self.store.add_project(title)?;
        self.store.save()?;
        Ok(project)
    }

    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        let removed = self.store.delete_project(id);
        self.store.save()?;
        Ok(removed)
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    pub fn handle_event(&mut self, event: Event) {
        self.handle_event_at(event, wall_now());
    }

    pub fn handle_event_at(&mut self, event: Event, now: NaiveDateTime) {
        match event {
            Event::ReminderDue(id) => self.handle_due(&id, now),
        }
    }

    fn handle_due(&mut self, id: &str, now: NaiveDateTime) {
        self.scheduler.on_fired(id);
        // Re-check the store: the event may have raced a delete or completion.
        let Some(reminder) = self.store.reminder(id).cloned() else {
            debug!(reminder = %id, "due event for missing reminder, dropping");
            return;
        };
        if reminder.completed {
            return;
        }
        self.presenter.trigger(&reminder);
        // Re-reconcile right away so a recurring reminder's next occurrence
        // gets armed without waiting for an unrelated store mutation.
        self.reconcile_at(now);
    }

    /// Drain any queued events without blocking.
    pub fn process_pending(&mut self) {
        self.process_pending_at(wall_now());
    }

    pub fn process_pending_at(&mut self, now: NaiveDateTime) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event_at(event, now);
        }
    }

    pub fn reconcile_now(&mut self) {
        self.reconcile_at(wall_now());
    }

    pub fn reconcile_at(&mut self, now: NaiveDateTime) {
        self.scheduler.reconcile(self.store.reminders(), now);
    }

    fn after_mutation(&mut self, now: NaiveDateTime) -> Result<()> {
        self.store.save()?;
        self.reconcile_at(now);
        Ok(())
    }

    // ========================================================================
    // Backup sweep
    // ========================================================================

    pub fn sweep(&mut self) {
        self.sweep_at(wall_now());
    }

    /// Surface every non-completed, non-active reminder that became due but
    /// was never presented (missed or never-armed timer).
    pub fn sweep_at(&mut self, now: NaiveDateTime) {
        let due: Vec<Reminder> = self
            .store
            .reminders()
            .iter()
            .filter(|r| !r.completed && !self.presenter.is_active(&r.id))
            .filter(|r| match due_at_sweep(r, now, self.sweep_period) {
                Ok(due) => due,
                Err(e) => {
                    warn!(reminder = %r.id, error = %e, "skipping unsweepable reminder");
                    false
                }
            })
            .cloned()
            .collect();

        for reminder in due {
            debug!(reminder = %reminder.id, "backup sweep surfacing missed reminder");
            self.presenter.trigger(&reminder);
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn armed_timers(&self) -> Vec<(String, NaiveDateTime)> {
        self.scheduler
            .armed()
            .map(|(id, due)| (id.to_string(), due))
            .collect()
    }

    pub fn is_timer_armed(&self, id: &str) -> bool {
        self.scheduler.is_armed(id)
    }

    /// Drive the service forever: arm timers for the current store, then
    /// interleave timer firings with the periodic backup sweep.
    pub async fn run(&mut self) {
        self.reconcile_now();

        let mut sweep = tokio::time::interval(std::time::Duration::from_millis(SWEEP_INTERVAL_MS));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick is immediate; use it to recover anything that became
        // due while the process was down.
        sweep.tick().await;
        self.sweep();

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                _ = sweep.tick() => self.sweep(),
            }
        }
    }
}
