//! Batch resolution of every secret the assistant needs.

use crate::credentials::SecretSource;
use crate::error::{AssistantError, Result};
use std::fmt;

/// Names of the secrets as they appear in the environment.
pub struct SecretNames;

impl SecretNames {
    pub const NOTION_KEY: &'static str = "NOTION_KEY";
    pub const NOTION_DB_TASKS: &'static str = "NOTION_DB_TASKS_ID";
    pub const NOTION_DB_REMINDERS: &'static str = "NOTION_DB_RAPPELS_ID";
    pub const MISTRAL_API_KEY: &'static str = "MISTRAL_API_KEY";
    pub const BREVO_KEY: &'static str = "BREVO_KEY";
    pub const SENDER_EMAIL: &'static str = "SENDER_EMAIL";
    pub const TEST_RECIPIENT: &'static str = "TEST_DESTINATAIRE";
    pub const SMS_GATEWAY_URL: &'static str = "MACRODROID_URL";

    /// Every secret that must be present for startup.
    pub const REQUIRED: [&'static str; 7] = [
        Self::NOTION_KEY,
        Self::NOTION_DB_TASKS,
        Self::NOTION_DB_REMINDERS,
        Self::MISTRAL_API_KEY,
        Self::BREVO_KEY,
        Self::SENDER_EMAIL,
        Self::TEST_RECIPIENT,
    ];
}

/// Resolved secrets ready for runtime use.
///
/// The custom [`Debug`] redacts every key so the struct can be logged.
#[derive(Clone)]
pub struct LoadedCredentials {
    /// Record store integration token.
    pub notion_key: String,
    /// Database ID of the tasks collection.
    pub tasks_database_id: String,
    /// Database ID of the reminders collection.
    pub reminders_database_id: String,
    /// Language model API key.
    pub mistral_api_key: String,
    /// Transactional mail API key.
    pub brevo_key: String,
    /// Sender address for outgoing mail.
    pub sender_email: String,
    /// Default / fallback recipient for test mails and the reminder form.
    pub test_recipient: String,
    /// SMS gateway webhook (`None` if not configured).
    pub sms_gateway_url: Option<String>,
}

impl fmt::Debug for LoadedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedCredentials")
            .field("notion_key", &redact(&self.notion_key))
            .field("tasks_database_id", &self.tasks_database_id)
            .field("reminders_database_id", &self.reminders_database_id)
            .field("mistral_api_key", &redact(&self.mistral_api_key))
            .field("brevo_key", &redact(&self.brevo_key))
            .field("sender_email", &self.sender_email)
            .field("test_recipient", &self.test_recipient)
            .field(
                "sms_gateway_url",
                &self.sms_gateway_url.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn redact(s: &str) -> &str {
    if s.is_empty() { "" } else { "[REDACTED]" }
}

/// Resolve all secrets, failing on the first batch of missing required ones.
///
/// Blank values count as missing. The error lists every missing name so an
/// operator can fix the environment in one pass.
///
/// # Errors
///
/// Returns [`AssistantError::Config`] when any required secret is absent.
pub fn load_credentials(source: &dyn SecretSource) -> Result<LoadedCredentials> {
    let lookup = |name: &str| {
        source
            .get(name)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    let missing: Vec<&str> = SecretNames::REQUIRED
        .iter()
        .copied()
        .filter(|name| lookup(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(AssistantError::Config(format!(
            "missing required secrets: {}",
            missing.join(", ")
        )));
    }

    let required = |name: &str| lookup(name).unwrap_or_default();
    Ok(LoadedCredentials {
        notion_key: required(SecretNames::NOTION_KEY),
        tasks_database_id: required(SecretNames::NOTION_DB_TASKS),
        reminders_database_id: required(SecretNames::NOTION_DB_REMINDERS),
        mistral_api_key: required(SecretNames::MISTRAL_API_KEY),
        brevo_key: required(SecretNames::BREVO_KEY),
        sender_email: required(SecretNames::SENDER_EMAIL),
        test_recipient: required(SecretNames::TEST_RECIPIENT),
        sms_gateway_url: lookup(SecretNames::SMS_GATEWAY_URL),
    })
}
