#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Wharf Core
//!
//! Deadline-bound enumeration and mutation of container engine resources.
//!
//! This crate knows nothing about HTTP, identity extraction or the engine
//! protocol. It works against the ports in `wharf-ports` and provides:
//!
//! - [`ExecutionScope`]: one deadline and cancellation signal per operation,
//!   released exactly once when dropped
//! - [`Enumerator`] / [`Enumeration`]: one producer task per run, relaying
//!   summaries in source order and at most one terminal [`EnumerationError`]
//! - [`MutationGateway`]: single engine calls under a deadline, with failures
//!   folded into [`GatewayError`]
//! - [`Policy`]: the capability check the request layer runs first
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wharf_core::{Enumerator, ExecutionScope, DEFAULT_BUDGET};
//! use wharf_ports::{ImageSummary, ListFilter};
//!
//! let enumerator = Enumerator::new(Arc::clone(&engine));
//! let scope = ExecutionScope::new("list-images", DEFAULT_BUDGET);
//! let images: Vec<ImageSummary> = enumerator.list(&scope, ListFilter::all().dangling(true)).await?;
//! ```

pub mod enumerator;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod scope;

pub use enumerator::{DEFAULT_RELAY_CAPACITY, Enumeration, Enumerator};
pub use error::{EnumerationError, ErrorClass, GatewayError};
pub use gateway::{Mutation, MutationGateway};
pub use policy::{Operation, Permission, PermissionPolicy, Policy, PolicyError, Principal};
pub use scope::{
    DEFAULT_BUDGET, ExecutionScope, ScopeBinding, ScopeError, ScopeObserver, ScopeState,
    can_transition,
};
