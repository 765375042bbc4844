//! Persistent application state: reminders plus the thin todo/project CRUD.
//!
//! The whole state is one versioned JSON blob written atomically. The store
//! is a plain state container; all timing logic lives in the scheduler,
//! sweep and occurrence modules.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Priority, Project, Reminder, Todo};
use crate::occurrence::{parse_local_datetime, parse_recurring_time};

pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The persisted blob. Field names are camelCase to match existing state
/// files; unknown fields from newer writers are ignored on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub projects: Vec<Project>,
    pub todos: Vec<Todo>,
    pub reminders: Vec<Reminder>,
    pub selected_project: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            name: String::new(),
            projects: Vec::new(),
            todos: Vec::new(),
            reminders: Vec::new(),
            selected_project: None,
        }
    }
}

pub struct Store {
    state: AppState,
    path: Option<PathBuf>,
}

impl Store {
    /// Open the store at `path`. A missing file loads as empty state; a
    /// corrupt file is an error for the caller to surface at startup.
    pub fn load(path: &Path) -> Result<Store> {
        let state = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Store {
            state,
            path: Some(path.to_path_buf()),
        })
    }

    /// A store with no backing file; `save` is a no-op. Used by tests and the
    /// service when persistence is handled elsewhere.
    pub fn in_memory() -> Store {
        Store {
            state: AppState::default(),
            path: None,
        }
    }

    /// Write the blob atomically: serialize to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    // ========================================================================
    // Reminders
    // ========================================================================

    /// Snapshot in insertion order.
    pub fn reminders(&self) -> &[Reminder] {
        &self.state.reminders
    }

    pub fn reminder(&self, id: &str) -> Option<&Reminder> {
        self.state.reminders.iter().find(|r| r.id == id)
    }

    /// Create a one-off reminder due at `datetime`. Rejects empty titles,
    /// unparseable datetimes and instants that are not strictly after `now`.
    pub fn create_one_off(
        &mut self,
        title: &str,
        datetime: &str,
        now: NaiveDateTime,
    ) -> Result<Reminder> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let due = parse_local_datetime(datetime)
            .map_err(|_| Error::Validation("Please select a valid date".to_string()))?;
        if due <= now {
            return Err(Error::Validation("Please select a future date".to_string()));
        }

        let reminder = Reminder::one_off(title, datetime);
        self.state.reminders.push(reminder.clone());
        Ok(reminder)
    }

    /// Create a recurring reminder on `days` (0 = Sunday .. 6 = Saturday) at
    /// `time` ("HH:MM"). The stored `datetime` records today at `time` for
    /// display; scheduling only reads the day set and time.
    pub fn create_recurring(
        &mut self,
        title: &str,
        days: &[u8],
        time: &str,
        now: NaiveDateTime,
    ) -> Result<Reminder> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        if days.is_empty() {
            return Err(Error::Validation(
                "Please select at least one day of the week".to_string(),
            ));
        }
        if let Some(day) = days.iter().find(|d| **d > 6) {
            return Err(Error::Validation(format!(
                "Day {} is out of range (0-6)",
                day
            )));
        }
        let parsed = parse_recurring_time(time)
            .map_err(|_| Error::Validation("Please enter a valid time (HH:MM)".to_string()))?;

        let mut sorted: Vec<u8> = days.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let reminder = Reminder::recurring(title, sorted, time, now.date().and_time(parsed));
        self.state.reminders.push(reminder.clone());
        Ok(reminder)
    }

    pub fn set_completed(&mut self, id: &str, completed: bool) -> Result<()> {
        let reminder = self
            .state
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        reminder.completed = completed;
        reminder.touch();
        Ok(())
    }

    /// Flip `completed`, returning the new value.
    pub fn toggle_reminder(&mut self, id: &str) -> Result<bool> {
        let reminder = self
            .state
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        reminder.completed = !reminder.completed;
        reminder.touch();
        Ok(reminder.completed)
    }

    /// Rename a reminder. Its schedule is untouched.
    pub fn update_reminder(&mut self, id: &str, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let reminder = self
            .state
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        reminder.title = title.trim().to_string();
        reminder.touch();
        Ok(())
    }

    /// Returns whether a record was actually removed.
    pub fn delete_reminder(&mut self, id: &str) -> bool {
        let before = self.state.reminders.len();
        self.state.reminders.retain(|r| r.id != id);
        self.state.reminders.len() != before
    }

    // ========================================================================
    // Todos
    // ========================================================================

    pub fn todos(&self) -> &[Todo] {
        &self.state.todos
    }

    pub fn add_todo(
        &mut self,
        title: &str,
        priority: Priority,
        project_id: Option<String>,
    ) -> Result<Todo> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let todo = Todo::new(title, priority, project_id);
        self.state.todos.push(todo.clone());
        Ok(todo)
    }

    pub fn toggle_todo(&mut self, id: &str) -> Result<bool> {
        let todo = self
            .state
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        todo.completed = !todo.completed;
        todo.updated_at = crate::model::now_string();
        Ok(todo.completed)
    }

    pub fn update_todo(&mut self, id: &str, title: &str, priority: Priority) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let todo = self
            .state
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        todo.title = title.trim().to_string();
        todo.priority = priority;
        todo.updated_at = crate::model::now_string();
        Ok(())
    }

    pub fn delete_todo(&mut self, id: &str) -> bool {
        let before = self.state.todos.len();
        self.state.todos.retain(|t| t.id != id);
        self.state.todos.len() != before
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    pub fn add_project(&mut self, title: &str) -> Result<Project> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let project = Project::new(title);
        self.state.projects.push(project.clone());
        Ok(project)
    }

    pub fn update_project(&mut self, id: &str, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::Validation("Please enter a title".to_string()));
        }
        let project = self
            .state
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        project.title = title.trim().to_string();
        project.updated_at = crate::model::now_string();
        Ok(())
    }

    /// Deleting a project also deletes its todos and clears the selection if
    /// it pointed at the project.
    pub fn delete_project(&mut self, id: &str) -> bool {
        let before = self.state.projects.len();
        self.state.projects.retain(|p| p.id != id);
        if self.state.projects.len() == before {
            return false;
        }
        self.state
            .todos
            .retain(|t| t.project_id.as_deref() != Some(id));
        if self.state.selected_project.as_deref() == Some(id) {
            self.state.selected_project = None;
        }
        true
    }

    pub fn set_name(&mut self, name: &str) {
        self.state.name = name.to_string();
    }

    pub fn set_selected_project(&mut self, project_id: Option<String>) {
        self.state.selected_project = project_id;
    }

    /// Reset to empty state (used by the `clear` binary).
    pub fn clear(&mut self) {
        self.state = AppState::default();
    }
}
