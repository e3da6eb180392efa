//! Deadline-bound, single-call mutations.
//!
//! Every operation is one engine call raced against the scope. The
//! gateway settles the scope, logs the outcome and folds the engine's
//! error into [`GatewayError`]. It never retries: `remove` and
//! `disconnect` are close to idempotent at the engine, `create` and
//! `connect` are not, so that decision stays with the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wharf_ports::{
    EngineError, ImageDeleteResponseItem, ImageOps, ImagePruneReport, ImageRemoveOptions,
    NetworkCreateOptions, NetworkCreateResponse, NetworkOps, NetworkPruneReport, ResourceKind,
};

use crate::error::GatewayError;
use crate::scope::{ExecutionScope, ScopeError, ScopeState};

/// The state-changing operations the gateway performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    /// Remove (or untag) an image.
    RemoveImage,
    /// Add a tag to an image.
    TagImage,
    /// Delete unused dangling images.
    PruneImages,
    /// Remove a network.
    RemoveNetwork,
    /// Attach a container to a network.
    ConnectNetwork,
    /// Detach a container from a network.
    DisconnectNetwork,
    /// Create a network.
    CreateNetwork,
    /// Delete unused networks.
    PruneNetworks,
}

impl Mutation {
    /// The resource kind this mutation acts on.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::RemoveImage | Self::TagImage | Self::PruneImages => ResourceKind::Image,
            Self::RemoveNetwork
            | Self::ConnectNetwork
            | Self::DisconnectNetwork
            | Self::CreateNetwork
            | Self::PruneNetworks => ResourceKind::Network,
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RemoveImage => "remove_image",
            Self::TagImage => "tag_image",
            Self::PruneImages => "prune_images",
            Self::RemoveNetwork => "remove_network",
            Self::ConnectNetwork => "connect_network",
            Self::DisconnectNetwork => "disconnect_network",
            Self::CreateNetwork => "create_network",
            Self::PruneNetworks => "prune_networks",
        };
        f.write_str(name)
    }
}

/// Executes single mutations against an engine under a scope's deadline.
pub struct MutationGateway<S: ?Sized> {
    engine: Arc<S>,
}

impl<S: ?Sized> Clone for MutationGateway<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S: ?Sized> fmt::Debug for MutationGateway<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationGateway").finish_non_exhaustive()
    }
}

impl<S: ?Sized> MutationGateway<S> {
    /// Wrap an engine.
    pub fn new(engine: Arc<S>) -> Self {
        Self { engine }
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<S> {
        &self.engine
    }

    /// Run one engine call inside `scope` and translate the outcome.
    async fn execute<T, F>(
        &self,
        scope: &ExecutionScope,
        mutation: Mutation,
        target: Option<&str>,
        call: F,
    ) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        let target_field = target.unwrap_or("-");
        match scope.run(call).await {
            Ok(Ok(value)) => {
                scope.settle(ScopeState::Completed);
                tracing::info!(scope = scope.label(), %mutation, target = target_field, "mutation completed");
                Ok(value)
            }
            Ok(Err(engine_err)) => {
                scope.settle(ScopeState::Failed);
                let err = GatewayError::from_engine(mutation, target, engine_err);
                tracing::warn!(
                    scope = scope.label(),
                    %mutation,
                    target = target_field,
                    class = %err.class(),
                    error = %err,
                    "mutation failed"
                );
                Err(err)
            }
            Err(scope_err) => {
                scope.settle(match scope_err {
                    ScopeError::Cancelled => ScopeState::Cancelled,
                    ScopeError::DeadlineExceeded { .. } => ScopeState::Failed,
                });
                tracing::warn!(
                    scope = scope.label(),
                    %mutation,
                    target = target_field,
                    budget = ?scope.budget(),
                    reason = %scope_err,
                    "mutation did not finish in time"
                );
                Err(GatewayError::DeadlineExceeded {
                    mutation,
                    budget: scope.budget(),
                })
            }
        }
    }
}

impl<S: ImageOps + ?Sized> MutationGateway<S> {
    /// Remove an image. A missing image yields [`GatewayError::NotFound`].
    pub async fn remove_image(
        &self,
        scope: &ExecutionScope,
        image: &str,
        options: ImageRemoveOptions,
    ) -> Result<Vec<ImageDeleteResponseItem>, GatewayError> {
        self.execute(
            scope,
            Mutation::RemoveImage,
            Some(image),
            self.engine.remove_image(image, options),
        )
        .await
    }

    /// Tag an image.
    pub async fn tag_image(
        &self,
        scope: &ExecutionScope,
        image: &str,
        tag: &str,
    ) -> Result<(), GatewayError> {
        self.execute(
            scope,
            Mutation::TagImage,
            Some(image),
            self.engine.tag_image(image, tag),
        )
        .await
    }

    /// Prune dangling images.
    pub async fn prune_images(&self, scope: &ExecutionScope) -> Result<ImagePruneReport, GatewayError> {
        self.execute(scope, Mutation::PruneImages, None, self.engine.prune_images())
            .await
    }
}

impl<S: NetworkOps + ?Sized> MutationGateway<S> {
    /// Remove a network.
    pub async fn remove_network(
        &self,
        scope: &ExecutionScope,
        network: &str,
    ) -> Result<(), GatewayError> {
        self.execute(
            scope,
            Mutation::RemoveNetwork,
            Some(network),
            self.engine.remove_network(network),
        )
        .await
    }

    /// Connect `container` to `network`.
    pub async fn connect_network(
        &self,
        scope: &ExecutionScope,
        network: &str,
        container: &str,
    ) -> Result<(), GatewayError> {
        self.execute(
            scope,
            Mutation::ConnectNetwork,
            Some(network),
            self.engine.connect_network(network, container),
        )
        .await
    }

    /// Disconnect `container` from `network`.
    pub async fn disconnect_network(
        &self,
        scope: &ExecutionScope,
        network: &str,
        container: &str,
        force: bool,
    ) -> Result<(), GatewayError> {
        self.execute(
            scope,
            Mutation::DisconnectNetwork,
            Some(network),
            self.engine.disconnect_network(network, container, force),
        )
        .await
    }

    /// Create a network named `name`.
    pub async fn create_network(
        &self,
        scope: &ExecutionScope,
        name: &str,
        options: NetworkCreateOptions,
    ) -> Result<NetworkCreateResponse, GatewayError> {
        self.execute(
            scope,
            Mutation::CreateNetwork,
            None,
            self.engine.create_network(name, options),
        )
        .await
    }

    /// Prune unused networks.
    pub async fn prune_networks(
        &self,
        scope: &ExecutionScope,
    ) -> Result<NetworkPruneReport, GatewayError> {
        self.execute(scope, Mutation::PruneNetworks, None, self.engine.prune_networks())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mutation_kinds() {
        assert_eq!(Mutation::TagImage.kind(), ResourceKind::Image);
        assert_eq!(Mutation::PruneImages.kind(), ResourceKind::Image);
        assert_eq!(Mutation::ConnectNetwork.kind(), ResourceKind::Network);
        assert_eq!(Mutation::CreateNetwork.kind(), ResourceKind::Network);
    }

    #[test]
    fn mutation_display_matches_serde() {
        for mutation in [
            Mutation::RemoveImage,
            Mutation::DisconnectNetwork,
            Mutation::PruneNetworks,
        ] {
            let json = serde_json::to_string(&mutation).unwrap();
            assert_eq!(json, format!("\"{mutation}\""));
        }
    }
}
