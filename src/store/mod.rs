//! Record store abstraction (tasks and reminders collections).
//!
//! The store is an external, independently synchronized service. Callers only
//! need two operations: create a record with typed fields, and query a
//! collection with an equality conjunction over named properties.

pub mod memory;
pub mod notion;

pub use memory::MemoryStore;
pub use notion::NotionStore;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// The two collections the assistant persists into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Tasks,
    Reminders,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tasks => write!(f, "tasks"),
            Self::Reminders => write!(f, "reminders"),
        }
    }
}

/// Typed property value.
///
/// The variants mirror the property kinds the collections use, so a value
/// round-trips through the remote API without losing its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Primary title text.
    Title(String),
    /// Free rich text.
    Text(String),
    /// One option out of a fixed set.
    Select(String),
    /// Workflow status option.
    Status(String),
    /// Boolean flag.
    Checkbox(bool),
}

impl FieldValue {
    /// Text content of any string-valued kind.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Title(s) | Self::Text(s) | Self::Select(s) | Self::Status(s) => Some(s),
            Self::Checkbox(_) => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Checkbox(b) => Some(*b),
            _ => None,
        }
    }
}

/// Named property values of one record.
pub type Fields = BTreeMap<String, FieldValue>;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Store-assigned identifier.
    pub id: String,
    pub fields: Fields,
}

impl Record {
    /// String value of a property, if present and string-valued.
    #[must_use]
    pub fn text(&self, property: &str) -> Option<&str> {
        self.fields.get(property).and_then(FieldValue::as_str)
    }

    /// Boolean value of a property, if present and a checkbox.
    #[must_use]
    pub fn flag(&self, property: &str) -> Option<bool> {
        self.fields.get(property).and_then(FieldValue::as_bool)
    }
}

/// Conjunction of property equality clauses. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(String, FieldValue)>,
}

impl Filter {
    /// Filter that matches every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an `property == value` clause.
    #[must_use]
    pub fn eq(mut self, property: impl Into<String>, value: FieldValue) -> Self {
        self.clauses.push((property.into(), value));
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[(String, FieldValue)] {
        &self.clauses
    }

    /// Whether `fields` satisfies every clause.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.clauses
            .iter()
            .all(|(property, expected)| fields.get(property) == Some(expected))
    }
}

/// Record store contract shared by the scheduler and the task/reminder forms.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record and return its store-assigned ID.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String>;

    /// Return every record of `collection` matching `filter`.
    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>>;
}
