//! Cor-Tech: volunteer assistant for a community association.
//!
//! Two independent parts share the same external collaborators:
//!
//! - **Reminder scheduler**: a background task that wakes hourly and, once per
//!   day from the configured hour, emails every active weekly reminder whose
//!   day matches today.
//! - **Draft-and-confirm workflow**: a conversational assistant that may
//!   propose emails, which are held as editable drafts and only sent after
//!   explicit human confirmation.
//!
//! # Architecture
//!
//! - [`store`]: tasks and reminders collections (Notion, in-memory)
//! - [`notify`]: email (Brevo) and SMS (webhook) dispatch
//! - [`records`]: typed reminders and tasks over the store
//! - [`scheduler`]: the daily reminder loop and its start latch
//! - [`assistant`]: chat model, directive parsing, sessions, workflow
//! - [`console`] and [`app`]: the interactive front end

pub mod app;
pub mod assistant;
pub mod config;
pub mod console;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod records;
pub mod scheduler;
pub mod store;

pub use app::{App, Flow, Reply};
pub use assistant::{DraftWorkflow, EmailDraft, Session};
pub use config::AssistantConfig;
pub use error::{AssistantError, Result};
pub use scheduler::{ReminderScheduler, SchedulerLatch};
