//! Error type for engine operations.
//!
//! Every port method returns `Result<_, EngineError>`. Drivers map their
//! transport and API errors into these variants so the core can classify
//! failures without inspecting message text.

use std::time::Duration;

/// Error reported by a container engine.
///
/// The payload of each variant is the engine's own message and is passed
/// through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The target resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with the current engine state (in use,
    /// duplicate name, active endpoints, ...).
    #[error("{0}")]
    Conflict(String),

    /// The engine rejected a parameter (bad reference format, unknown driver).
    #[error("{0}")]
    InvalidParameter(String),

    /// The engine refuses the operation outright.
    #[error("{0}")]
    Forbidden(String),

    /// The engine could not be reached or the connection broke.
    #[error("{0}")]
    Connection(String),

    /// The engine itself gave up waiting.
    #[error("engine timed out after {0:?}")]
    Timeout(Duration),

    /// Any other engine-side failure.
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Convenience constructor for [`EngineError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Convenience constructor for [`EngineError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Convenience constructor for [`EngineError::Connection`].
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// The engine's message, exactly as reported.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns `true` if the target of the call does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for transient errors a caller may choose to retry.
    ///
    /// Informational only: nothing in Wharf retries on its own.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("malformed engine response: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn message_passes_through_unchanged() {
        let err = EngineError::conflict("network with name web already exists");
        assert_eq!(err.message(), "network with name web already exists");
        assert_eq!(err.to_string(), "network with name web already exists");
    }

    #[test]
    fn not_found_is_classified() {
        assert!(EngineError::not_found("No such image: x1").is_not_found());
        assert!(!EngineError::conflict("in use").is_not_found());
        assert!(!EngineError::Internal("boom".into()).is_not_found());
    }

    #[test]
    fn connection_and_timeout_are_retryable() {
        assert!(EngineError::connection("connection reset").is_retryable());
        assert!(EngineError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!EngineError::not_found("gone").is_retryable());
        assert!(!EngineError::Forbidden("predefined".into()).is_retryable());
    }

    #[test]
    fn timeout_display() {
        let err = EngineError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "engine timed out after 5s");
    }

    #[test]
    fn from_serde_json_error() {
        let bad = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: EngineError = bad.into();
        assert!(matches!(err, EngineError::Internal(ref m) if m.starts_with("malformed")));
    }
}
