use chrono::{Local, NaiveDateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current local wall-clock time as the string form used in persisted records.
pub fn now_string() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// A user-created alert, either one-time or recurring.
///
/// Serialized field names are camelCase with the recurring fields optional,
/// so state files written by earlier versions keep loading. A reminder is
/// one-off (`datetime` is the due instant) or
/// recurring (`recurring_days` + `recurring_time` are authoritative and
/// `datetime` only records "today at recurring_time" from creation day);
/// never both. The constructors enforce that shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub datetime: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_days: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_time: Option<String>,
}

impl Reminder {
    pub fn one_off(title: &str, datetime: &str) -> Self {
        let now = now_string();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            datetime: datetime.to_string(),
            completed: false,
            created_at: now.clone(),
            updated_at: now,
            is_recurring: false,
            recurring_days: None,
            recurring_time: None,
        }
    }

    /// `creation_instant` is today's date at `time`. It is display-only for
    /// recurring reminders; scheduling never reads it.
    pub fn recurring(title: &str, days: Vec<u8>, time: &str, creation_instant: NaiveDateTime) -> Self {
        let now = now_string();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            datetime: creation_instant.format("%Y-%m-%dT%H:%M:%S").to_string(),
            completed: false,
            created_at: now.clone(),
            updated_at: now,
            is_recurring: true,
            recurring_days: Some(days),
            recurring_time: Some(time.to_string()),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Todo {
    pub fn new(title: &str, priority: Priority, project_id: Option<String>) -> Self {
        let now = now_string();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            completed: false,
            priority,
            project_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    pub fn new(title: &str) -> Self {
        let now = now_string();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
