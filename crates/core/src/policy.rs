//! Capability checks for callers.
//!
//! The core never consults a [`Policy`]; the request layer checks the
//! caller's [`Principal`] against the [`Operation`] before it invokes the
//! enumerator or the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};
use wharf_ports::ResourceKind;

use crate::gateway::Mutation;

/// Permission level of a principal. `Read < Execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// May list resources.
    Read,
    /// May also change resources.
    Execute,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Execute => write!(f, "execute"),
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Display name, used in logs.
    pub name: String,
    /// Granted level.
    pub permission: Permission,
}

impl Principal {
    /// Create a principal.
    pub fn new(name: impl Into<String>, permission: Permission) -> Self {
        Self {
            name: name.into(),
            permission,
        }
    }
}

/// What a principal wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Enumerate resources of a kind.
    List(ResourceKind),
    /// Perform a mutation.
    Mutate(Mutation),
}

impl Operation {
    /// Lowest permission that allows this operation.
    #[must_use]
    pub fn required_permission(&self) -> Permission {
        match self {
            Self::List(_) => Permission::Read,
            Self::Mutate(_) => Permission::Execute,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(kind) => write!(f, "list_{kind}s"),
            Self::Mutate(mutation) => write!(f, "{mutation}"),
        }
    }
}

/// A policy refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The principal's level is below what the operation needs.
    #[error("{principal} ({granted}) is not allowed to {operation}: requires {required}")]
    Denied {
        /// Name of the refused principal.
        principal: String,
        /// The refused operation.
        operation: Operation,
        /// Level the principal holds.
        granted: Permission,
        /// Level the operation requires.
        required: Permission,
    },
}

/// Decides whether a principal may perform an operation.
pub trait Policy: Send + Sync {
    /// `Ok(())` to allow, [`PolicyError`] to deny.
    fn check(&self, principal: &Principal, operation: &Operation) -> Result<(), PolicyError>;
}

/// Allows an operation when the principal's level is at least the
/// operation's required level.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionPolicy;

impl Policy for PermissionPolicy {
    fn check(&self, principal: &Principal, operation: &Operation) -> Result<(), PolicyError> {
        let required = operation.required_permission();
        if principal.permission >= required {
            Ok(())
        } else {
            Err(PolicyError::Denied {
                principal: principal.name.clone(),
                operation: *operation,
                granted: principal.permission,
                required,
            })
        }
    }
}
