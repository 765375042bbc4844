//! Seed binary for populating the chime store with initial data.
//!
//! Usage: cargo run --bin seed
//!
//! Reads from seed.toml in the project root and inserts reminders, todos and
//! projects into the state file.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Deserialize;
use std::fs;

use chime::config::Config;
use chime::model::Priority;
use chime::store::Store;

#[derive(Debug, Deserialize)]
struct SeedData {
    #[serde(default)]
    reminders: Vec<SeedReminder>,
    #[serde(default)]
    todos: Vec<SeedTodo>,
    #[serde(default)]
    projects: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedReminder {
    title: String,

    // One-off: an absolute datetime
    #[serde(default)]
    datetime: Option<String>,

    // Recurring: weekday names plus a time
    #[serde(default)]
    days: Option<Vec<String>>,
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedTodo {
    title: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

fn day_index(name: &str) -> Option<u8> {
    match name.to_lowercase().as_str() {
        "sun" | "sunday" => Some(0),
        "mon" | "monday" => Some(1),
        "tue" | "tuesday" => Some(2),
        "wed" | "wednesday" => Some(3),
        "thu" | "thursday" => Some(4),
        "fri" | "friday" => Some(5),
        "sat" | "saturday" => Some(6),
        _ => None,
    }
}

/// Split day names into resolved indices and the names nothing matched.
fn day_indices(days: &[String]) -> (Vec<u8>, Vec<String>) {
    let mut indices = Vec::new();
    let mut unknown = Vec::new();
    for day in days {
        match day_index(day) {
            Some(i) => indices.push(i),
            None => unknown.push(day.clone()),
        }
    }
    (indices, unknown)
}

fn priority_from(name: Option<&str>) -> Priority {
    match name {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        _ => Priority::Medium,
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = Config::load();
    let contents = fs::read_to_string("seed.toml").context("could not read seed.toml")?;
    let seed: SeedData = toml::from_str(&contents).context("invalid seed.toml")?;

    let mut store = Store::load(&config.store_path)?;
    let now = Local::now().naive_local();

    let mut inserted = 0;

    for title in &seed.projects {
        store.add_project(title)?;
        inserted += 1;
    }

    for todo in &seed.todos {
        let project_id = todo.project.as_ref().and_then(|name| {
            store
                .projects()
                .iter()
                .find(|p| &p.title == name)
                .map(|p| p.id.clone())
        });
        store.add_todo(&todo.title, priority_from(todo.priority.as_deref()), project_id)?;
        inserted += 1;
    }

    for reminder in &seed.reminders {
        match (&reminder.datetime, &reminder.days, &reminder.time) {
            (Some(datetime), None, None) => {
                store.create_one_off(&reminder.title, datetime, now)?;
            }
            (None, Some(days), Some(time)) => {
                let (indices, unknown) = day_indices(days);
                for day in &unknown {
                    println!("Unknown day '{}' for '{}', ignoring it", day, reminder.title);
                }
                if indices.is_empty() {
                    println!("Skipping '{}': no recognizable days", reminder.title);
                    continue;
                }
                store.create_recurring(&reminder.title, &indices, time, now)?;
            }
            _ => {
                println!(
                    "Skipping '{}': needs either datetime or days+time",
                    reminder.title
                );
                continue;
            }
        }
        inserted += 1;
    }

    store.save()?;
    println!(
        "Seeded {} records into {}",
        inserted,
        config.store_path.display()
    );

    Ok(())
}
