//! Outbound notifications (email, SMS).
//!
//! A [`Dispatcher`] sends one message to one recipient and reports whether it
//! worked. Implementations never return an error; failures are folded into
//! the [`DispatchReport`] diagnostic.

pub mod brevo;
pub mod sms;

pub use brevo::BrevoMailer;
pub use sms::SmsGateway;

use async_trait::async_trait;

/// Outcome of a single dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub success: bool,
    /// Human-readable detail (provider status, transport error, ...).
    pub diagnostic: String,
}

impl DispatchReport {
    #[must_use]
    pub fn sent(diagnostic: impl Into<String>) -> Self {
        Self {
            success: true,
            diagnostic: diagnostic.into(),
        }
    }

    #[must_use]
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Notification sender shared by the scheduler and the draft workflow.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send `body` (HTML fragment) with `subject` to a single `recipient`.
    async fn send(&self, subject: &str, body: &str, recipient: &str) -> DispatchReport;
}

/// Wrap an HTML fragment in a minimal document envelope.
#[must_use]
pub fn html_envelope(body: &str) -> String {
    format!("<html><body>{body}</body></html>")
}
