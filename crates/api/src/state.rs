//! Shared handler state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use wharf_core::{
    DEFAULT_BUDGET, Enumerator, ExecutionScope, MutationGateway, Operation, PermissionPolicy,
    Policy, Principal,
};
use wharf_ports::{ImageOps, ImageSummary, NetworkOps, NetworkResource, ResourceSource};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Everything the router needs from an engine driver.
pub trait Engine:
    ResourceSource<ImageSummary> + ResourceSource<NetworkResource> + ImageOps + NetworkOps + 'static
{
}

impl<T> Engine for T where
    T: ResourceSource<ImageSummary>
        + ResourceSource<NetworkResource>
        + ImageOps
        + NetworkOps
        + 'static
{
}

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) enumerator: Enumerator<dyn Engine>,
    pub(crate) gateway: MutationGateway<dyn Engine>,
    policy: Arc<dyn Policy>,
    enumeration_timeout: Duration,
    mutation_timeout: Duration,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("enumerator", &self.enumerator)
            .field("enumeration_timeout", &self.enumeration_timeout)
            .field("mutation_timeout", &self.mutation_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State over `engine` with the default budgets and [`PermissionPolicy`].
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            enumerator: Enumerator::new(Arc::clone(&engine)),
            gateway: MutationGateway::new(engine),
            policy: Arc::new(PermissionPolicy),
            enumeration_timeout: DEFAULT_BUDGET,
            mutation_timeout: DEFAULT_BUDGET,
        }
    }

    /// State over `engine` with budgets and relay capacity from `config`.
    pub fn from_config(engine: Arc<dyn Engine>, config: &ApiConfig) -> Self {
        Self {
            enumerator: Enumerator::with_capacity(Arc::clone(&engine), config.relay_capacity),
            ..Self::new(engine)
        }
        .with_timeouts(config.enumeration_timeout, config.mutation_timeout)
    }

    /// Replace the policy.
    pub fn with_policy(mut self, policy: impl Policy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the per-request budgets.
    pub fn with_timeouts(mut self, enumeration: Duration, mutation: Duration) -> Self {
        self.enumeration_timeout = enumeration;
        self.mutation_timeout = mutation;
        self
    }

    pub(crate) fn authorize(
        &self,
        principal: &Principal,
        operation: Operation,
    ) -> Result<(), ApiError> {
        self.policy.check(principal, &operation).map_err(|err| {
            tracing::info!(principal = %principal.name, %operation, "operation denied");
            ApiError::from(err)
        })
    }

    /// A fresh scope for one listing request.
    pub(crate) fn enumeration_scope(&self, label: &str) -> ExecutionScope {
        ExecutionScope::new(label, self.enumeration_timeout)
    }

    /// A fresh scope for one mutation request.
    pub(crate) fn mutation_scope(&self, label: &str) -> ExecutionScope {
        ExecutionScope::new(label, self.mutation_timeout)
    }
}
