//! Error types for the assistant.

/// Top-level error type for the assistant and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Configuration or missing-secret error.
    #[error("config error: {0}")]
    Config(String),

    /// Language model request or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Notification delivery error (email / SMS).
    #[error("notify error: {0}")]
    Notify(String),

    /// Record store error (create / query).
    #[error("store error: {0}")]
    Store(String),

    /// Scheduler error (ledger persistence, check execution).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Malformed email directive in a model reply.
    #[error("directive error: {0}")]
    Directive(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
