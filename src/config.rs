//! Configuration types for the assistant.
//!
//! Everything here is non-secret and may live in a TOML file. API keys and
//! addresses are resolved separately by [`crate::credentials`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CORTECH_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Organization name used in reminder subjects and signatures.
    pub organization: OrganizationConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Email / SMS delivery settings.
    pub notify: NotifyConfig,
    /// Record store settings.
    pub store: StoreConfig,
    /// Reminder scheduler settings.
    pub scheduler: SchedulerConfig,
}

/// Organization identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationConfig {
    /// Short display name (e.g. in "Rappel <name> : ...").
    pub name: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: "Cor-Tech".to_owned(),
        }
    }
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL (chat completions live under `/v1/chat/completions`).
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature (None = provider default).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate (None = provider default).
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai".to_owned(),
            model: "mistral-large-latest".to_owned(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

/// Email and SMS delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Transactional mail API base URL.
    pub mail_api_url: String,
    /// Display name of the sender.
    pub sender_name: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            mail_api_url: "https://api.brevo.com".to_owned(),
            sender_name: "IA Cor-Tech".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Record store API base URL.
    pub base_url: String,
    /// API version header value.
    pub api_version: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.notion.com".to_owned(),
            api_version: "2022-06-28".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether the background scheduler is started at all.
    pub enabled: bool,
    /// Seconds between wakes.
    pub wake_interval_secs: u64,
    /// Local hour (0-23) from which the daily check may run.
    pub check_hour: u32,
    /// Optional per-reminder-per-day dispatch ledger (JSONL).
    ///
    /// When unset, duplicate suppression is purely in-memory and a restart
    /// on the same day may re-send reminders.
    pub ledger_path: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wake_interval_secs: 3600,
            check_hour: 9,
            ledger_path: None,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::AssistantError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `$CORTECH_CONFIG` or the default path; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed or is invalid.
    pub fn load() -> crate::error::Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_config_path);
        if !path.exists() {
            tracing::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        tracing::info!("loading config from {}", path.display());
        Self::from_file(&path)
    }

    /// Returns the default config file path: `<config dir>/cortech/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/cortech-config"))
            .join("cortech")
            .join("config.toml")
    }

    /// Reject values the scheduler and clients cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AssistantError::Config`] describing the first bad value.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AssistantError;

        if self.scheduler.check_hour > 23 {
            return Err(AssistantError::Config(format!(
                "scheduler.check_hour must be 0-23, got {}",
                self.scheduler.check_hour
            )));
        }
        if self.scheduler.wake_interval_secs == 0 {
            return Err(AssistantError::Config(
                "scheduler.wake_interval_secs must be positive".to_owned(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(AssistantError::Config("llm.model is empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.check_hour, 9);
        assert_eq!(config.scheduler.wake_interval_secs, 3600);
        assert!(config.scheduler.ledger_path.is_none());
        assert_eq!(config.llm.model, "mistral-large-latest");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AssistantConfig = toml::from_str(
            r#"
            [scheduler]
            check_hour = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.check_hour, 7);
        assert_eq!(config.scheduler.wake_interval_secs, 3600);
        assert_eq!(config.organization.name, "Cor-Tech");
    }

    #[test]
    fn out_of_range_hour_is_rejected() {
        let mut config = AssistantConfig::default();
        config.scheduler.check_hour = 24;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("check_hour"), "got: {err}");
    }

    #[test]
    fn from_file_reads_nested_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[organization]\nname = \"Labo Ludik\"\n\n[scheduler]\nledger_path = \"/var/lib/cortech/ledger.jsonl\"\n",
        )
        .unwrap();

        let loaded = AssistantConfig::from_file(&path).unwrap();
        assert_eq!(loaded.organization.name, "Labo Ludik");
        assert_eq!(
            loaded.scheduler.ledger_path,
            Some(PathBuf::from("/var/lib/cortech/ledger.jsonl"))
        );
        assert!(loaded.scheduler.enabled);
    }
}
