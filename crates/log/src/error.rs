//! Errors raised while installing the logger

/// Error type for logger operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The filter directives could not be parsed
    #[error("invalid filter '{filter}': {reason}")]
    Filter {
        /// The rejected directives
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;
