//! Domain records persisted in the store: weekly reminders and tasks.
//!
//! Property names and option labels are the French ones the shared
//! workspace uses (`Jour = "Lundi"`, `Priorite = "Haute"`, ...).

use crate::error::{AssistantError, Result};
use crate::store::{Collection, FieldValue, Fields, Filter, Record, RecordStore};
use std::fmt;
use std::str::FromStr;

/// Property names of the reminders collection.
pub mod reminder_props {
    pub const MESSAGE: &str = "Message";
    pub const RECIPIENT: &str = "Destinataire";
    pub const DAY: &str = "Jour";
    pub const ACTIVE: &str = "Actif";
}

/// Property names of the tasks collection.
pub mod task_props {
    pub const NAME: &str = "Nom";
    pub const OWNER: &str = "Responsable";
    pub const PRIORITY: &str = "Priorite";
    pub const FREQUENCY: &str = "Frequence";
    pub const STATUS: &str = "Statut";
}

/// Day of the week, labelled in French.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Persisted label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Monday => "Lundi",
            Self::Tuesday => "Mardi",
            Self::Wednesday => "Mercredi",
            Self::Thursday => "Jeudi",
            Self::Friday => "Vendredi",
            Self::Saturday => "Samedi",
            Self::Sunday => "Dimanche",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Weekday {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AssistantError::Store(format!("unknown day '{wanted}'")))
    }
}

/// A weekly reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    /// Store ID (empty until persisted).
    pub id: String,
    pub message: String,
    pub recipient: String,
    pub day: Weekday,
    pub active: bool,
}

impl Reminder {
    /// New active reminder, not yet persisted.
    #[must_use]
    pub fn new(message: impl Into<String>, recipient: impl Into<String>, day: Weekday) -> Self {
        Self {
            id: String::new(),
            message: message.into(),
            recipient: recipient.into(),
            day,
            active: true,
        }
    }

    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            reminder_props::MESSAGE.to_owned(),
            FieldValue::Title(self.message.clone()),
        );
        fields.insert(
            reminder_props::RECIPIENT.to_owned(),
            FieldValue::Text(self.recipient.clone()),
        );
        fields.insert(
            reminder_props::DAY.to_owned(),
            FieldValue::Select(self.day.label().to_owned()),
        );
        fields.insert(
            reminder_props::ACTIVE.to_owned(),
            FieldValue::Checkbox(self.active),
        );
        fields
    }

    /// Decode a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Store`] naming the first missing or empty property.
    pub fn from_record(record: &Record) -> Result<Self> {
        let required = |prop: &str| {
            record
                .text(prop)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| {
                    AssistantError::Store(format!("reminder {} has no {prop}", record.id))
                })
        };
        Ok(Self {
            id: record.id.clone(),
            message: required(reminder_props::MESSAGE)?,
            recipient: required(reminder_props::RECIPIENT)?,
            day: required(reminder_props::DAY)?.parse()?,
            active: record.flag(reminder_props::ACTIVE).unwrap_or(false),
        })
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Medium => "Moyenne",
            Self::High => "Haute",
            Self::Urgent => "Urgente",
        }
    }
}

impl FromStr for Priority {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "moyenne" | "medium" => Ok(Self::Medium),
            "haute" | "high" => Ok(Self::High),
            "urgente" | "urgent" => Ok(Self::Urgent),
            other => Err(AssistantError::Store(format!("unknown priority '{other}'"))),
        }
    }
}

/// Task recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    #[default]
    OneOff,
    Weekly,
}

impl Frequency {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::OneOff => "Ponctuel",
            Self::Weekly => "Hebdo",
        }
    }
}

impl FromStr for Frequency {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ponctuel" | "one-off" | "oneoff" => Ok(Self::OneOff),
            "hebdo" | "weekly" => Ok(Self::Weekly),
            other => Err(AssistantError::Store(format!("unknown frequency '{other}'"))),
        }
    }
}

/// Initial status of every new task.
pub const TASK_INITIAL_STATUS: &str = "À faire";

/// A volunteer task. Written once, never read back by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub owner: String,
    pub priority: Priority,
    pub frequency: Frequency,
}

impl Task {
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            task_props::NAME.to_owned(),
            FieldValue::Title(self.name.clone()),
        );
        fields.insert(
            task_props::OWNER.to_owned(),
            FieldValue::Text(self.owner.clone()),
        );
        fields.insert(
            task_props::PRIORITY.to_owned(),
            FieldValue::Select(self.priority.label().to_owned()),
        );
        fields.insert(
            task_props::FREQUENCY.to_owned(),
            FieldValue::Select(self.frequency.label().to_owned()),
        );
        fields.insert(
            task_props::STATUS.to_owned(),
            FieldValue::Status(TASK_INITIAL_STATUS.to_owned()),
        );
        fields
    }
}

/// Persist a new task.
///
/// # Errors
///
/// Propagates the store error.
pub async fn add_task(store: &dyn RecordStore, task: &Task) -> Result<String> {
    store.create(Collection::Tasks, task.to_fields()).await
}

/// Persist a new reminder (always created active).
///
/// # Errors
///
/// Propagates the store error.
pub async fn add_reminder(store: &dyn RecordStore, reminder: &Reminder) -> Result<String> {
    let mut reminder = reminder.clone();
    reminder.active = true;
    store
        .create(Collection::Reminders, reminder.to_fields())
        .await
}

/// Filter selecting active reminders.
#[must_use]
pub fn active_filter() -> Filter {
    Filter::all().eq(reminder_props::ACTIVE, FieldValue::Checkbox(true))
}

/// Filter selecting active reminders for one weekday.
#[must_use]
pub fn day_filter(day: Weekday) -> Filter {
    active_filter().eq(
        reminder_props::DAY,
        FieldValue::Select(day.label().to_owned()),
    )
}

/// Decoded query result: usable reminders plus records that failed to decode.
#[derive(Debug, Default)]
pub struct ReminderBatch {
    pub reminders: Vec<Reminder>,
    pub malformed: Vec<AssistantError>,
}

fn decode_all(records: &[Record]) -> ReminderBatch {
    let mut batch = ReminderBatch::default();
    for record in records {
        match Reminder::from_record(record) {
            Ok(r) => batch.reminders.push(r),
            Err(e) => batch.malformed.push(e),
        }
    }
    batch
}

/// Every active reminder.
///
/// # Errors
///
/// Propagates the store error; undecodable records land in `malformed`.
pub async fn active_reminders(store: &dyn RecordStore) -> Result<ReminderBatch> {
    let records = store
        .query(Collection::Reminders, &active_filter())
        .await?;
    Ok(decode_all(&records))
}

/// Active reminders scheduled for `day`.
///
/// # Errors
///
/// Propagates the store error; undecodable records land in `malformed`.
pub async fn reminders_for_day(store: &dyn RecordStore, day: Weekday) -> Result<ReminderBatch> {
    let records = store
        .query(Collection::Reminders, &day_filter(day))
        .await?;
    Ok(decode_all(&records))
}
