//! Error taxonomy of the core.
//!
//! Engine failures are folded into a small, stable set of classes:
//!
//! | Class              | Produced by                                   |
//! |--------------------|-----------------------------------------------|
//! | `Enumeration`      | a listing failed (engine error or abort)      |
//! | `NotFound`         | a mutation target does not exist              |
//! | `Rejected`         | the engine refused a mutation for any reason  |
//! | `DeadlineExceeded` | the scope's deadline passed or it was cancelled |
//!
//! Nothing in the core retries; every failure is surfaced once.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wharf_ports::{EngineError, ResourceKind};

use crate::gateway::Mutation;
use crate::scope::ScopeError;

/// Coarse classification shared by [`EnumerationError`] and [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// A listing failed.
    Enumeration,
    /// The mutation target does not exist.
    NotFound,
    /// The engine refused the mutation.
    Rejected,
    /// The scope ran out of time or was cancelled.
    DeadlineExceeded,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumeration => write!(f, "enumeration"),
            Self::NotFound => write!(f, "not_found"),
            Self::Rejected => write!(f, "rejected"),
            Self::DeadlineExceeded => write!(f, "deadline_exceeded"),
        }
    }
}

/// The single terminal error of an enumeration run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnumerationError {
    /// The engine failed to list, before or while producing summaries.
    #[error("failed to list {kind}s: {source}")]
    Source {
        /// Resource kind being listed.
        kind: ResourceKind,
        /// The engine's error.
        source: EngineError,
    },

    /// The scope's deadline passed before the listing finished.
    #[error("listing {kind}s exceeded its deadline of {budget:?}")]
    DeadlineExceeded {
        /// Resource kind being listed.
        kind: ResourceKind,
        /// The scope's budget.
        budget: Duration,
    },

    /// The scope was cancelled or released before the listing finished.
    #[error("listing {kind}s was cancelled")]
    Cancelled {
        /// Resource kind being listed.
        kind: ResourceKind,
    },

    /// The producer task ended abnormally.
    #[error("listing {kind}s aborted: {reason}")]
    Aborted {
        /// Resource kind being listed.
        kind: ResourceKind,
        /// What the runtime reported.
        reason: String,
    },
}

impl EnumerationError {
    pub(crate) fn from_scope(kind: ResourceKind, err: ScopeError) -> Self {
        match err {
            ScopeError::DeadlineExceeded { budget } => Self::DeadlineExceeded { kind, budget },
            ScopeError::Cancelled => Self::Cancelled { kind },
        }
    }

    /// Resource kind of the failed listing.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Source { kind, .. }
            | Self::DeadlineExceeded { kind, .. }
            | Self::Cancelled { kind }
            | Self::Aborted { kind, .. } => *kind,
        }
    }

    /// Human-facing detail: the engine's own message for engine failures.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Source { source, .. } => source.message(),
            other => other.to_string(),
        }
    }

    /// Cancellation is observed as deadline expiry.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Cancelled { .. })
    }

    /// Classification for logs and responses.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        if self.is_deadline_exceeded() {
            ErrorClass::DeadlineExceeded
        } else {
            ErrorClass::Enumeration
        }
    }
}

/// Failure of a single mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The target does not exist.
    #[error("{source}")]
    NotFound {
        /// The attempted mutation.
        mutation: Mutation,
        /// The target as given by the caller.
        target: String,
        /// The engine's error.
        source: EngineError,
    },

    /// The engine refused the mutation (conflict, invalid state, any
    /// other failure). Displays the engine's message unchanged.
    #[error("{source}")]
    Rejected {
        /// The attempted mutation.
        mutation: Mutation,
        /// The engine's error.
        source: EngineError,
    },

    /// The scope's deadline passed (or it was cancelled) before the
    /// engine answered.
    #[error("{mutation} exceeded its deadline of {budget:?}")]
    DeadlineExceeded {
        /// The attempted mutation.
        mutation: Mutation,
        /// The scope's budget.
        budget: Duration,
    },
}

impl GatewayError {
    pub(crate) fn from_engine(mutation: Mutation, target: Option<&str>, source: EngineError) -> Self {
        if source.is_not_found() {
            Self::NotFound {
                mutation,
                target: target.unwrap_or_default().to_owned(),
                source,
            }
        } else {
            Self::Rejected { mutation, source }
        }
    }

    /// The mutation that failed.
    #[must_use]
    pub fn mutation(&self) -> Mutation {
        match self {
            Self::NotFound { mutation, .. }
            | Self::Rejected { mutation, .. }
            | Self::DeadlineExceeded { mutation, .. } => *mutation,
        }
    }

    /// Classification for logs and responses.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Rejected { .. } => ErrorClass::Rejected,
            Self::DeadlineExceeded { .. } => ErrorClass::DeadlineExceeded,
        }
    }

    /// Returns `true` for [`GatewayError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_detail_is_engine_message() {
        let err = EnumerationError::Source {
            kind: ResourceKind::Image,
            source: EngineError::connection("connection reset"),
        };
        assert_eq!(err.detail(), "connection reset");
        assert_eq!(err.to_string(), "failed to list images: connection reset");
        assert_eq!(err.class(), ErrorClass::Enumeration);
        assert_eq!(err.kind(), ResourceKind::Image);
    }

    #[test]
    fn cancellation_is_classified_as_deadline() {
        let cancelled = EnumerationError::from_scope(ResourceKind::Network, ScopeError::Cancelled);
        assert_eq!(cancelled, EnumerationError::Cancelled { kind: ResourceKind::Network });
        assert!(cancelled.is_deadline_exceeded());
        assert_eq!(cancelled.class(), ErrorClass::DeadlineExceeded);

        let expired = EnumerationError::from_scope(
            ResourceKind::Network,
            ScopeError::DeadlineExceeded { budget: Duration::from_secs(100) },
        );
        assert!(expired.is_deadline_exceeded());
        assert_eq!(
            expired.to_string(),
            "listing networks exceeded its deadline of 100s"
        );
    }

    #[test]
    fn engine_not_found_becomes_not_found() {
        let err = GatewayError::from_engine(
            Mutation::RemoveImage,
            Some("x1"),
            EngineError::not_found("No such image: x1"),
        );
        assert!(err.is_not_found());
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.to_string(), "No such image: x1");
    }

    #[test]
    fn other_engine_errors_become_rejected_verbatim() {
        for source in [
            EngineError::conflict("network with name web already exists"),
            EngineError::Forbidden("bridge is a pre-defined network and cannot be removed".into()),
            EngineError::Internal("boom".into()),
            EngineError::connection("connection refused"),
        ] {
            let message = source.message();
            let err = GatewayError::from_engine(Mutation::CreateNetwork, None, source);
            assert_eq!(err.class(), ErrorClass::Rejected);
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn deadline_display() {
        let err = GatewayError::DeadlineExceeded {
            mutation: Mutation::PruneImages,
            budget: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "prune_images exceeded its deadline of 2s");
        assert_eq!(err.mutation(), Mutation::PruneImages);
    }
}
