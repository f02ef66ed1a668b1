//! Per-user conversation state.

use crate::assistant::directive::EmailDraft;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry, optionally carrying a generated image URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ConversationMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            image_url: None,
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            image_url: None,
        }
    }

    #[must_use]
    pub fn assistant_image(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            image_url: Some(url.into()),
        }
    }
}

/// Editable field of a pending draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Recipient,
    Subject,
    Body,
}

impl FromStr for DraftField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "destinataire" | "recipient" | "to" => Ok(Self::Recipient),
            "sujet" | "subject" => Ok(Self::Subject),
            "corps" | "corps_html" | "body" => Ok(Self::Body),
            other => Err(format!(
                "unknown draft field '{other}' (expected destinataire, sujet or corps)"
            )),
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recipient => "destinataire",
            Self::Subject => "sujet",
            Self::Body => "corps",
        })
    }
}

/// Transcript plus at most one pending draft.
///
/// Sessions are owned values; two sessions never share state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: String,
    history: Vec<ConversationMessage>,
    pending_draft: Option<EmailDraft>,
}

/// What a front end shows for a session: the draft panel first, then the transcript.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    pub draft_panel: Option<&'a EmailDraft>,
    pub transcript: &'a [ConversationMessage],
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    #[must_use]
    pub fn pending_draft(&self) -> Option<&EmailDraft> {
        self.pending_draft.as_ref()
    }

    #[must_use]
    pub fn has_pending_draft(&self) -> bool {
        self.pending_draft.is_some()
    }

    pub(crate) fn push(&mut self, message: ConversationMessage) {
        self.history.push(message);
    }

    /// Replace any pending draft with `draft`.
    pub(crate) fn set_draft(&mut self, draft: EmailDraft) {
        self.pending_draft = Some(draft);
    }

    pub(crate) fn take_draft(&mut self) -> Option<EmailDraft> {
        self.pending_draft.take()
    }

    /// Overwrite one field of the pending draft. Returns `false` when none is pending.
    pub fn edit_draft(&mut self, field: DraftField, value: impl Into<String>) -> bool {
        let Some(draft) = self.pending_draft.as_mut() else {
            return false;
        };
        let value = value.into();
        match field {
            DraftField::Recipient => draft.recipient = value.trim().to_owned(),
            DraftField::Subject => draft.subject = value,
            DraftField::Body => draft.body = value,
        }
        true
    }

    /// Clear the transcript and any pending draft.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_draft = None;
    }

    #[must_use]
    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            draft_panel: self.pending_draft.as_ref(),
            transcript: &self.history,
        }
    }
}
