//! Transactional email through the Brevo SMTP API.

use crate::config::NotifyConfig;
use crate::error::{AssistantError, Result};
use crate::notify::{DispatchReport, Dispatcher, html_envelope};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Brevo mail sender.
#[derive(Clone)]
pub struct BrevoMailer {
    api_key: String,
    base_url: String,
    sender_name: String,
    sender_email: String,
    client: reqwest::Client,
}

impl BrevoMailer {
    /// Build a mailer.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the HTTP client cannot be built.
    pub fn new(
        config: &NotifyConfig,
        api_key: impl Into<String>,
        sender_email: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(format!("cannot build mail client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: config.mail_api_url.trim_end_matches('/').to_owned(),
            sender_name: config.sender_name.clone(),
            sender_email: sender_email.into(),
            client,
        })
    }

    /// JSON payload for one message.
    #[must_use]
    pub fn build_payload(&self, subject: &str, body: &str, recipient: &str) -> serde_json::Value {
        serde_json::json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [{ "email": recipient }],
            "subject": subject,
            "htmlContent": html_envelope(body),
        })
    }
}

#[async_trait]
impl Dispatcher for BrevoMailer {
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> DispatchReport {
        if recipient.trim().is_empty() {
            return DispatchReport::failed("recipient address is empty");
        }

        let url = format!("{}/v3/smtp/email", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&self.build_payload(subject, body, recipient))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
                debug!("mail to {recipient} accepted");
                DispatchReport::sent(format!("accepted for {recipient}"))
            }
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                warn!("mail to {recipient} rejected: {status}");
                DispatchReport::failed(format!("mail API returned {status}: {text}"))
            }
            Err(e) => {
                warn!("mail to {recipient} failed: {e}");
                DispatchReport::failed(format!("mail request failed: {e}"))
            }
        }
    }
}
