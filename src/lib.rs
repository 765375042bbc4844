//! Personal task-and-reminder manager.
//!
//! The core is the reminder scheduling and delivery pipeline: the [`store`]
//! holds the records, [`occurrence`] computes when a reminder fires next,
//! the [`scheduler`] arms one cancellable timer per upcoming reminder, the
//! [`sweep`] periodically backstops timers that never fired, and the
//! [`presenter`] keeps the capped set of visible notifications and drives
//! the OS notification and sound side effects. [`service`] ties them into a
//! single-task event loop.

pub mod config;
pub mod error;
pub mod model;
pub mod occurrence;
pub mod presenter;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod sweep;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Priority, Project, Reminder, Todo};
pub use service::ReminderService;
pub use store::Store;
