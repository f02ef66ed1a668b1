//! Optional per-reminder-per-day dispatch ledger.
//!
//! The in-memory "last checked" date only survives as long as the process.
//! When a ledger path is configured, every successful reminder dispatch is
//! appended to a JSONL file keyed by reminder ID and date, and the scheduler
//! skips reminders already recorded for today. This closes the re-send gap
//! after a same-day restart; it does not make late-added reminders fire.
//! Each check keeps only today's keys and drops older lines from the file.

use crate::error::{AssistantError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    key: String,
    recorded_at: String,
}

/// Dedupe key for one reminder on one day.
#[must_use]
pub fn dispatch_key(reminder_id: &str, date: NaiveDate) -> String {
    format!("reminder:{reminder_id}:{date}")
}

/// File-backed set of dispatch keys.
pub struct DispatchLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl DispatchLedger {
    /// Open (or lazily create) a ledger at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Scheduler`] if an existing ledger cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut ledger = Self {
            path: path.into(),
            seen: HashSet::new(),
        };
        ledger.refresh_from_disk()?;
        Ok(ledger)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `key` has already been recorded.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key.trim())
    }

    /// Record `key` once. Returns `true` when newly inserted.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Scheduler`] for empty keys or write failures.
    pub fn record(&mut self, key: &str) -> Result<bool> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(AssistantError::Scheduler(
                "dispatch key must not be empty".to_owned(),
            ));
        }
        if self.seen.contains(trimmed) {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AssistantError::Scheduler(format!("failed to create ledger directory: {e}"))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AssistantError::Scheduler(format!("failed to open ledger: {e}")))?;

        let entry = LedgerEntry {
            key: trimmed.to_owned(),
            recorded_at: chrono::Local::now().to_rfc3339(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| AssistantError::Scheduler(format!("failed to encode ledger entry: {e}")))?;
        writeln!(file, "{json}")
            .map_err(|e| AssistantError::Scheduler(format!("failed to append ledger entry: {e}")))?;

        self.seen.insert(trimmed.to_owned());
        Ok(true)
    }

    /// Reload keys written by this or a previous process.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Scheduler`] if the file exists but cannot be read.
    pub fn refresh_from_disk(&mut self) -> Result<()> {
        let entries = self.read_entries()?;
        self.seen = entries.into_iter().map(|entry| entry.key).collect();
        Ok(())
    }

    /// Reload only the keys recorded for `date`, compacting the file when
    /// it still holds entries from other days.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Scheduler`] if the file cannot be read or rewritten.
    pub fn refresh_for(&mut self, date: NaiveDate) -> Result<()> {
        let suffix = format!(":{date}");
        let entries = self.read_entries()?;
        let total = entries.len();
        let kept: Vec<LedgerEntry> = entries
            .into_iter()
            .filter(|entry| entry.key.ends_with(&suffix))
            .collect();

        if kept.len() < total {
            self.rewrite(&kept)?;
            tracing::debug!(
                "compacted dispatch ledger {}: dropped {} stale entries",
                self.path.display(),
                total - kept.len()
            );
        }
        self.seen = kept.into_iter().map(|entry| entry.key).collect();
        Ok(())
    }

    fn read_entries(&self) -> Result<Vec<LedgerEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AssistantError::Scheduler(format!(
                    "failed to read ledger: {e}"
                )));
            }
        };

        let mut entries = Vec::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEntry>(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        "ignoring malformed ledger line in {}: {e}",
                        self.path.display()
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Replace the file with `entries` via a sibling temp file and rename.
    fn rewrite(&self, entries: &[LedgerEntry]) -> Result<()> {
        let mut content = String::new();
        for entry in entries {
            let json = serde_json::to_string(entry).map_err(|e| {
                AssistantError::Scheduler(format!("failed to encode ledger entry: {e}"))
            })?;
            content.push_str(&json);
            content.push('\n');
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| AssistantError::Scheduler(format!("failed to write ledger: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AssistantError::Scheduler(format!("failed to replace ledger: {e}")))?;
        Ok(())
    }
}
