//! Network operations port.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::model::{NetworkCreateOptions, NetworkCreateResponse, NetworkPruneReport};

/// State-changing network operations.
///
/// `network` may be a network id, id prefix or name.
#[async_trait]
pub trait NetworkOps: Send + Sync {
    /// Remove a network.
    async fn remove_network(&self, network: &str) -> Result<(), EngineError>;

    /// Attach a container to a network.
    async fn connect_network(&self, network: &str, container: &str) -> Result<(), EngineError>;

    /// Detach a container from a network.
    async fn disconnect_network(
        &self,
        network: &str,
        container: &str,
        force: bool,
    ) -> Result<(), EngineError>;

    /// Create a network named `name`.
    async fn create_network(
        &self,
        name: &str,
        options: NetworkCreateOptions,
    ) -> Result<NetworkCreateResponse, EngineError>;

    /// Delete every unused, user-defined network.
    async fn prune_networks(&self) -> Result<NetworkPruneReport, EngineError>;
}
