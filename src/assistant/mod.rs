//! Conversational assistant with human-confirmed email drafts.
//!
//! - [`directive`]: sentinel-delimited email proposals in model replies
//! - [`session`]: per-user transcript and pending draft
//! - [`intent`]: chat vs. image routing
//! - [`llm`]: chat-completion model seam
//! - [`workflow`]: the draft-and-confirm state machine

pub mod directive;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod workflow;

pub use directive::{DRAFT_CLOSE, DRAFT_OPEN, DirectiveError, EmailDraft, extract_draft};
pub use intent::{Intent, IntentClassifier, KeywordClassifier};
pub use llm::{ChatMessage, ChatModel, ChatRole, MistralClient};
pub use session::{ConversationMessage, DraftField, Role, Session, SessionView};
pub use workflow::{ConfirmOutcome, DraftWorkflow, TurnOutcome};
