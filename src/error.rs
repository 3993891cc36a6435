//! Error types for bcos-core.

use thiserror::Error;

/// Result type alias using bcos-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an analysis run.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input: missing company name, unknown mode, duplicate task ID, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation was applied against an illegal state (e.g. a task status
    /// transition out of a terminal state).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A structural requirement was violated before work could start.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// An external data provider failed (network, timeout, malformed response).
    #[error("provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    /// A skill returned an unsuccessful result or raised.
    #[error("skill failure: {0}")]
    Skill(String),

    /// The validator rejected a skill's output.
    #[error("validation rejected: {0}")]
    ValidationRejected(String),

    /// The executor detected a repeated action signature.
    #[error("loop detected: '{signature}' repeated {count} times")]
    Loop { signature: String, count: usize },

    /// The cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Unexpected internal invariant violation.
    #[error("internal error: {0}")]
    Fatal(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error during state persistence.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a provider error.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a skill-failure error.
    pub fn skill(message: impl Into<String>) -> Self {
        Self::Skill(message.into())
    }

    /// Create a loop-detection error.
    pub fn loop_detected(signature: impl Into<String>, count: usize) -> Self {
        Self::Loop {
            signature: signature.into(),
            count,
        }
    }

    /// Whether this error is captured at a task boundary (the run continues)
    /// rather than aborting the phase.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. }
                | Self::Skill(_)
                | Self::ValidationRejected(_)
                | Self::Loop { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::skill("bad").is_recoverable());
        assert!(Error::provider("exa", "timeout").is_recoverable());
        assert!(Error::loop_detected("skill:swot-analyzer", 4).is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
        assert!(!Error::Fatal("oops".into()).is_recoverable());
        assert!(!Error::precondition("phase 1 missing").is_recoverable());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = Error::precondition("phase 1 context is empty");
        assert!(err.to_string().starts_with("precondition failed"));

        let err = Error::loop_detected("skill:company-intelligence", 4);
        assert!(err.to_string().contains("repeated 4 times"));
    }
}
