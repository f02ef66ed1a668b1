//! Draft-and-confirm email workflow.
//!
//! The model may only *propose* an email. A proposal becomes the session's
//! pending draft, and nothing is sent until the user confirms it, possibly
//! after editing every field. Model output is never dispatched directly.

use crate::assistant::directive::{DirectiveError, EmailDraft, extract_draft};
use crate::assistant::intent::{Intent, IntentClassifier, KeywordClassifier};
use crate::assistant::llm::{ChatMessage, ChatModel};
use crate::assistant::prompt::{IMAGE_PROMPT_INSTRUCTION, image_url, system_prompt};
use crate::assistant::session::{ConversationMessage, Role, Session};
use crate::notify::Dispatcher;
use std::sync::Arc;
use tracing::{info, warn};

/// Assistant note appended when a draft becomes pending.
pub const DRAFT_READY_NOTE: &str =
    "📧 Brouillon d'email prêt. Vérifie-le, modifie-le si besoin, puis confirme l'envoi.";

/// Assistant note appended with a generated image.
pub const IMAGE_NOTE: &str = "Visuel généré.";

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Plain reply, appended to the transcript.
    Reply(String),
    /// A directive was parsed and is now the pending draft.
    DraftReady(EmailDraft),
    /// A directive was present but unusable; nothing was stored.
    MalformedDraft(DirectiveError),
    /// An image was generated and appended to the transcript.
    Image { url: String },
    /// The model could not be reached; no assistant message was appended.
    Failed { diagnostic: String },
}

/// Result of confirming the pending draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Sent { recipient: String },
    /// Dispatch failed; the (edited) draft remains pending.
    Failed { diagnostic: String },
    NoPendingDraft,
}

/// Drives a [`Session`] through chat turns and draft confirmation.
pub struct DraftWorkflow {
    model: Arc<dyn ChatModel>,
    dispatcher: Arc<dyn Dispatcher>,
    classifier: Box<dyn IntentClassifier>,
    system_prompt: String,
}

impl DraftWorkflow {
    pub fn new(
        model: Arc<dyn ChatModel>,
        dispatcher: Arc<dyn Dispatcher>,
        organization: &str,
    ) -> Self {
        Self {
            model,
            dispatcher,
            classifier: Box::new(KeywordClassifier::default()),
            system_prompt: system_prompt(organization),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Handle one user prompt.
    ///
    /// The prompt is appended to the transcript before the model is called,
    /// so a failed call leaves it visible for the user to retry.
    pub async fn submit(&self, session: &mut Session, prompt: &str) -> TurnOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return TurnOutcome::Failed {
                diagnostic: "empty prompt".to_owned(),
            };
        }
        session.push(ConversationMessage::user(prompt));

        match self.classifier.classify(prompt) {
            Intent::ImageRequest => self.generate_image(session, prompt).await,
            Intent::Conversation => {
                let messages = self.model_messages(session);
                match self.model.complete(&messages).await {
                    Ok(reply) => self.handle_reply(session, &reply),
                    Err(e) => {
                        warn!("session {}: model call failed: {e}", session.id());
                        TurnOutcome::Failed {
                            diagnostic: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Apply a model reply to the session.
    pub fn handle_reply(&self, session: &mut Session, reply: &str) -> TurnOutcome {
        match extract_draft(reply) {
            None => {
                session.push(ConversationMessage::assistant(reply));
                TurnOutcome::Reply(reply.to_owned())
            }
            Some(Ok(draft)) => {
                info!(
                    "session {}: draft ready for {}",
                    session.id(),
                    draft.recipient
                );
                session.set_draft(draft.clone());
                session.push(ConversationMessage::assistant(DRAFT_READY_NOTE));
                TurnOutcome::DraftReady(draft)
            }
            Some(Err(e)) => {
                warn!("session {}: {}", session.id(), e.reason);
                TurnOutcome::MalformedDraft(e)
            }
        }
    }

    async fn generate_image(&self, session: &mut Session, prompt: &str) -> TurnOutcome {
        let messages = [
            ChatMessage::system(IMAGE_PROMPT_INSTRUCTION),
            ChatMessage::user(prompt),
        ];
        match self.model.complete(&messages).await {
            Ok(description) => {
                let url = image_url(&description);
                session.push(ConversationMessage::assistant_image(IMAGE_NOTE, url.clone()));
                TurnOutcome::Image { url }
            }
            Err(e) => {
                warn!("session {}: image prompt failed: {e}", session.id());
                TurnOutcome::Failed {
                    diagnostic: e.to_string(),
                }
            }
        }
    }

    /// System prompt followed by the text transcript. Image entries are left out.
    fn model_messages(&self, session: &Session) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(self.system_prompt.as_str()))
            .chain(
                session
                    .history()
                    .iter()
                    .filter(|m| m.image_url.is_none())
                    .map(|m| match m.role {
                        Role::User => ChatMessage::user(m.text.as_str()),
                        Role::Assistant => ChatMessage::assistant(m.text.as_str()),
                    }),
            )
            .collect()
    }

    /// Dispatch `edited` in place of the pending draft.
    ///
    /// Success clears the draft and appends one confirmation. Failure keeps
    /// `edited` pending and appends nothing.
    pub async fn confirm(&self, session: &mut Session, edited: EmailDraft) -> ConfirmOutcome {
        if session.take_draft().is_none() {
            return ConfirmOutcome::NoPendingDraft;
        }

        let report = self
            .dispatcher
            .send(&edited.subject, &edited.body, &edited.recipient)
            .await;

        if report.success {
            info!("session {}: email sent to {}", session.id(), edited.recipient);
            session.push(ConversationMessage::assistant(format!(
                "✅ Email envoyé à {}.",
                edited.recipient
            )));
            ConfirmOutcome::Sent {
                recipient: edited.recipient,
            }
        } else {
            warn!(
                "session {}: email to {} failed: {}",
                session.id(),
                edited.recipient,
                report.diagnostic
            );
            session.set_draft(edited);
            ConfirmOutcome::Failed {
                diagnostic: report.diagnostic,
            }
        }
    }

    /// Confirm the pending draft as it currently stands.
    pub async fn confirm_pending(&self, session: &mut Session) -> ConfirmOutcome {
        match session.pending_draft().cloned() {
            Some(draft) => self.confirm(session, draft).await,
            None => ConfirmOutcome::NoPendingDraft,
        }
    }

    /// Discard the pending draft. Returns whether one was pending.
    pub fn cancel(&self, session: &mut Session) -> bool {
        session.take_draft().is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::assistant::directive::{DRAFT_CLOSE, DRAFT_OPEN};
    use crate::error::{AssistantError, Result};
    use crate::notify::DispatchReport;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records what it was sent.
    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn with(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AssistantError::Llm("script exhausted".into())))
        }
    }

    struct StubDispatcher {
        succeed: bool,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl StubDispatcher {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                sent: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl Dispatcher for StubDispatcher {
        async fn send(&self, subject: &str, body: &str, recipient: &str) -> DispatchReport {
            self.sent
                .lock()
                .unwrap()
                .push((subject.into(), body.into(), recipient.into()));
            if self.succeed {
                DispatchReport::sent("201")
            } else {
                DispatchReport::failed("HTTP 400: invalid sender")
            }
        }
    }

    fn directive(json: &str) -> String {
        format!("Voilà :\n{DRAFT_OPEN}\n{json}\n{DRAFT_CLOSE}")
    }

    fn good_directive() -> String {
        directive(r#"{"destinataire":"a@b.com","sujet":"S","corps_html":"<p>x</p>"}"#)
    }

    fn workflow(model: Arc<ScriptedModel>, dispatcher: Arc<StubDispatcher>) -> DraftWorkflow {
        DraftWorkflow::new(model, dispatcher, "Cor-Tech")
    }

    fn session_with_draft(wf: &DraftWorkflow) -> Session {
        let mut s = Session::new("t");
        wf.handle_reply(&mut s, &good_directive());
        assert!(s.has_pending_draft());
        s
    }

    #[tokio::test]
    async fn plain_reply_is_appended_and_draft_untouched() {
        let model = ScriptedModel::with(vec![Ok("Salut !".into())]);
        let wf = workflow(model, StubDispatcher::new(true));
        let mut s = session_with_draft(&wf);
        let before = s.pending_draft().cloned();

        let outcome = wf.submit(&mut s, "bonjour").await;

        assert_eq!(outcome, TurnOutcome::Reply("Salut !".into()));
        assert_eq!(s.pending_draft().cloned(), before);
        let last = s.history().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Salut !");
    }

    #[tokio::test]
    async fn directive_with_newlines_becomes_pending_draft() {
        let reply = directive(
            "{\"destinataire\":\"a@b.com\",\"sujet\":\"S\",\"corps_html\":\"<p>l1\nl2</p>\"}",
        );
        let model = ScriptedModel::with(vec![Ok(reply)]);
        let wf = workflow(model, StubDispatcher::new(true));
        let mut s = Session::new("t");

        let outcome = wf.submit(&mut s, "envoie un mail à a@b.com").await;

        let TurnOutcome::DraftReady(draft) = outcome else {
            panic!("expected a draft");
        };
        assert_eq!(draft.body, "<p>l1 l2</p>");
        assert_eq!(s.pending_draft(), Some(&draft));
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history()[1].text, DRAFT_READY_NOTE);
    }

    #[tokio::test]
    async fn malformed_directive_adds_nothing() {
        let model = ScriptedModel::with(vec![Ok(directive("{pas du json"))]);
        let wf = workflow(model, StubDispatcher::new(true));
        let mut s = Session::new("t");

        let outcome = wf.submit(&mut s, "mail").await;

        let TurnOutcome::MalformedDraft(err) = outcome else {
            panic!("expected malformed draft");
        };
        assert!(err.raw.contains("{pas du json"));
        assert!(!s.has_pending_draft());
        assert_eq!(s.history().len(), 1, "only the user prompt is recorded");
    }

    #[tokio::test]
    async fn new_directive_overwrites_pending_draft() {
        let second = directive(r#"{"destinataire":"z@y.fr","sujet":"2","corps_html":"2"}"#);
        let wf = workflow(ScriptedModel::with(vec![]), StubDispatcher::new(true));
        let mut s = session_with_draft(&wf);
        wf.handle_reply(&mut s, &second);
        assert_eq!(s.pending_draft().unwrap().recipient, "z@y.fr");
    }

    #[tokio::test]
    async fn model_failure_appends_no_assistant_message() {
        let model = ScriptedModel::with(vec![Err(AssistantError::Llm("HTTP 503".into()))]);
        let wf = workflow(model, StubDispatcher::new(true));
        let mut s = Session::new("t");

        let outcome = wf.submit(&mut s, "bonjour").await;

        assert!(matches!(outcome, TurnOutcome::Failed { ref diagnostic } if diagnostic.contains("503")));
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.history()[0].role, Role::User);
    }

    #[tokio::test]
    async fn blank_prompt_is_ignored() {
        let model = ScriptedModel::with(vec![]);
        let wf = workflow(model.clone(), StubDispatcher::new(true));
        let mut s = Session::new("t");
        assert!(matches!(wf.submit(&mut s, "   ").await, TurnOutcome::Failed { .. }));
        assert!(s.history().is_empty());
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_clears_draft_without_dispatch() {
        let dispatcher = StubDispatcher::new(true);
        let wf = workflow(ScriptedModel::with(vec![]), dispatcher.clone());
        let mut s = session_with_draft(&wf);
        let history_len = s.history().len();

        assert!(wf.cancel(&mut s));
        assert!(s.view().draft_panel.is_none());
        assert_eq!(s.history().len(), history_len);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
        assert!(!wf.cancel(&mut s));
    }

    #[tokio::test]
    async fn successful_confirm_sends_edits_and_appends_one_message() {
        let dispatcher = StubDispatcher::new(true);
        let wf = workflow(ScriptedModel::with(vec![]), dispatcher.clone());
        let mut s = session_with_draft(&wf);
        let history_len = s.history().len();

        let edited = EmailDraft::new("c@d.org", "Nouveau sujet", "<p>modifié</p>");
        let outcome = wf.confirm(&mut s, edited).await;

        assert_eq!(
            outcome,
            ConfirmOutcome::Sent {
                recipient: "c@d.org".into()
            }
        );
        assert!(!s.has_pending_draft());
        assert_eq!(s.history().len(), history_len + 1);
        assert!(s.history().last().unwrap().text.contains("c@d.org"));
        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            &[(
                "Nouveau sujet".to_owned(),
                "<p>modifié</p>".to_owned(),
                "c@d.org".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn failed_confirm_keeps_edited_draft_and_appends_nothing() {
        let wf = workflow(ScriptedModel::with(vec![]), StubDispatcher::new(false));
        let mut s = session_with_draft(&wf);
        let history_len = s.history().len();

        let edited = EmailDraft::new("c@d.org", "S2", "B2");
        let outcome = wf.confirm(&mut s, edited.clone()).await;

        assert!(matches!(outcome, ConfirmOutcome::Failed { ref diagnostic } if diagnostic.contains("400")));
        assert_eq!(s.pending_draft(), Some(&edited));
        assert_eq!(s.history().len(), history_len);
    }

    #[tokio::test]
    async fn confirm_without_draft_does_not_dispatch() {
        let dispatcher = StubDispatcher::new(true);
        let wf = workflow(ScriptedModel::with(vec![]), dispatcher.clone());
        let mut s = Session::new("t");
        assert_eq!(wf.confirm_pending(&mut s).await, ConfirmOutcome::NoPendingDraft);
        assert_eq!(
            wf.confirm(&mut s, EmailDraft::new("a@b.com", "s", "b")).await,
            ConfirmOutcome::NoPendingDraft
        );
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_request_builds_url_and_is_hidden_from_model() {
        let model = ScriptedModel::with(vec![
            Ok("retro poster".into()),
            Ok("Avec plaisir".into()),
        ]);
        let wf = workflow(model.clone(), StubDispatcher::new(true));
        let mut s = Session::new("t");

        let outcome = wf.submit(&mut s, "Fais une affiche").await;
        assert_eq!(
            outcome,
            TurnOutcome::Image {
                url: "https://image.pollinations.ai/prompt/retro%20poster?nologo=true".into()
            }
        );
        assert_eq!(s.history()[1].text, IMAGE_NOTE);

        wf.submit(&mut s, "merci").await;
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0][0].content, IMAGE_PROMPT_INSTRUCTION);
        let chat = &seen[1];
        assert!(chat[0].content.contains("Cor-Tech"));
        assert!(chat.iter().all(|m| m.content != IMAGE_NOTE));
        assert_eq!(chat.last().unwrap().content, "merci");
    }
}
