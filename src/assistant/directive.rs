//! Email directive embedded in model replies.
//!
//! The model proposes an email by emitting a JSON object between two
//! sentinel lines. The block is untrusted free text: it is located, its
//! literal line breaks are collapsed to spaces, and only then strictly parsed.
//! Only the first block of a reply is honored.

use serde::Deserialize;
use std::fmt;

/// Opening sentinel.
pub const DRAFT_OPEN: &str = "---EMAIL_START---";
/// Closing sentinel.
pub const DRAFT_CLOSE: &str = "---EMAIL_END---";

/// An editable email proposal awaiting human confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    #[serde(rename = "destinataire", alias = "recipient")]
    pub recipient: String,
    #[serde(rename = "sujet", alias = "subject")]
    pub subject: String,
    /// HTML body fragment.
    #[serde(rename = "corps_html", alias = "body")]
    pub body: String,
}

impl EmailDraft {
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// A directive block that could not be turned into a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveError {
    /// Block content exactly as the model wrote it (before normalization).
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed email draft ({}): {}", self.reason, self.raw)
    }
}

impl std::error::Error for DirectiveError {}

impl From<DirectiveError> for crate::error::AssistantError {
    fn from(e: DirectiveError) -> Self {
        Self::Directive(e.to_string())
    }
}

/// Result of scanning a reply for a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveScan<'a> {
    /// No opening sentinel: the reply is plain conversation.
    Absent,
    /// Content between the first opening sentinel and the next closing one.
    Block(&'a str),
    /// Opening sentinel without a closing one; carries everything after it.
    Unterminated(&'a str),
}

/// Locate the first directive block in `reply`.
#[must_use]
pub fn scan(reply: &str) -> DirectiveScan<'_> {
    let Some(start) = reply.find(DRAFT_OPEN) else {
        return DirectiveScan::Absent;
    };
    let rest = &reply[start + DRAFT_OPEN.len()..];
    match rest.find(DRAFT_CLOSE) {
        Some(end) => DirectiveScan::Block(&rest[..end]),
        None => DirectiveScan::Unterminated(rest),
    }
}

/// Collapse every literal line break (CRLF, CR or LF) to one space.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Normalize and strictly parse a directive block.
///
/// # Errors
///
/// Returns a [`DirectiveError`] carrying the raw block when the JSON is
/// invalid, a field is missing, or the recipient is not an address.
pub fn parse_block(raw: &str) -> Result<EmailDraft, DirectiveError> {
    let fail = |reason: String| DirectiveError {
        raw: raw.to_owned(),
        reason,
    };

    let normalized = normalize(raw);
    let mut draft: EmailDraft =
        serde_json::from_str(normalized.trim()).map_err(|e| fail(e.to_string()))?;

    draft.recipient = draft.recipient.trim().to_owned();
    if !looks_like_email(&draft.recipient) {
        return Err(fail(format!("invalid recipient '{}'", draft.recipient)));
    }
    Ok(draft)
}

/// Find and parse the directive of `reply`; `None` when there is none.
#[must_use]
pub fn extract_draft(reply: &str) -> Option<Result<EmailDraft, DirectiveError>> {
    match scan(reply) {
        DirectiveScan::Absent => None,
        DirectiveScan::Block(raw) => Some(parse_block(raw)),
        DirectiveScan::Unterminated(raw) => Some(Err(DirectiveError {
            raw: raw.to_owned(),
            reason: format!("missing closing marker {DRAFT_CLOSE}"),
        })),
    }
}

/// Minimal single-address shape check: `local@domain.tld`, no spaces, no lists.
#[must_use]
pub fn looks_like_email(s: &str) -> bool {
    if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == ',' || c == ';') {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}
