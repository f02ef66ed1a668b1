//! SMS through an Android webhook gateway (MacroDroid-style trigger URL).
//!
//! The phone receives `param1` (number) and `param2` (text) and sends the SMS
//! itself. The gateway gives no delivery receipt, so success means the
//! trigger URL answered with a 2xx status.

use crate::error::{AssistantError, Result};
use crate::notify::DispatchReport;
use std::time::Duration;
use tracing::warn;

/// Webhook-based SMS sender. Without a URL every send fails fast.
#[derive(Clone)]
pub struct SmsGateway {
    url: Option<String>,
    client: reqwest::Client,
}

impl SmsGateway {
    /// Build a gateway client.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Config`] if the HTTP client cannot be built.
    pub fn new(url: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AssistantError::Config(format!("cannot build SMS client: {e}")))?;
        Ok(Self {
            url: url.filter(|u| !u.trim().is_empty()),
            client,
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Send `message` to `number`.
    pub async fn send_sms(&self, number: &str, message: &str) -> DispatchReport {
        let Some(url) = &self.url else {
            return DispatchReport::failed("no SMS gateway configured");
        };
        let number = clean_number(number);
        if number.is_empty() {
            return DispatchReport::failed("phone number is empty");
        }

        let response = self
            .client
            .get(url)
            .query(&[("param1", number.as_str()), ("param2", message)])
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                DispatchReport::sent(format!("SMS trigger accepted for {number}"))
            }
            Ok(resp) => {
                warn!("SMS gateway returned {}", resp.status());
                DispatchReport::failed(format!("SMS gateway returned {}", resp.status()))
            }
            Err(e) => {
                warn!("SMS gateway request failed: {e}");
                DispatchReport::failed(format!("SMS gateway request failed: {e}"))
            }
        }
    }
}

/// Strip the spaces and dots people type into phone numbers.
#[must_use]
pub fn clean_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn numbers_lose_spaces_and_dots() {
        assert_eq!(clean_number("06 12.34 56 78"), "0612345678");
        assert_eq!(clean_number("+33 6 12"), "+33612");
    }

    #[tokio::test]
    async fn unconfigured_gateway_reports_failure() {
        let gateway = SmsGateway::new(Some("   ".to_owned()), 5).unwrap();
        assert!(!gateway.is_configured());
        let report = gateway.send_sms("0612", "hi").await;
        assert!(!report.success);
        assert!(report.diagnostic.contains("no SMS gateway"));
    }
}
