//! `/networks` handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use wharf_core::{Mutation, Operation};
use wharf_ports::{
    ListFilter, NetworkCreateOptions, NetworkCreateResponse, NetworkPruneReport, NetworkResource,
    ResourceKind,
};

use super::{Message, accept};
use crate::error::ApiError;
use crate::extract::CurrentPrincipal;
use crate::request::{ConnectNetworkRequest, CreateNetworkRequest, DisconnectNetworkRequest};
use crate::state::AppState;

/// `GET /networks`
pub async fn list(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<NetworkResource>>, ApiError> {
    state.authorize(&principal, Operation::List(ResourceKind::Network))?;

    let scope = state.enumeration_scope("list-networks");
    let networks = state
        .enumerator
        .list::<NetworkResource>(&scope, ListFilter::all())
        .await?;
    Ok(Json(networks))
}

/// `POST /networks` with `{name, driver}`
pub async fn create(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    body: Result<Json<CreateNetworkRequest>, JsonRejection>,
) -> Result<Json<NetworkCreateResponse>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::CreateNetwork))?;
    let body = accept(body)?;

    let scope = state.mutation_scope("create-network");
    let response = state
        .gateway
        .create_network(&scope, &body.name, NetworkCreateOptions::for_driver(body.driver))
        .await?;
    Ok(Json(response))
}

/// `POST /networks/prune`
pub async fn prune(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<NetworkPruneReport>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::PruneNetworks))?;

    let scope = state.mutation_scope("prune-networks");
    let report = state.gateway.prune_networks(&scope).await?;
    Ok(Json(report))
}

/// `DELETE /networks/{id}`
pub async fn remove(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::RemoveNetwork))?;

    let scope = state.mutation_scope("remove-network");
    state.gateway.remove_network(&scope, &id).await?;
    Ok(Json(Message::new(format!("{id} network removed"))))
}

/// `POST /networks/{id}/connect` with `{containerId}`
pub async fn connect(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    body: Result<Json<ConnectNetworkRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::ConnectNetwork))?;
    let body = accept(body)?;

    let scope = state.mutation_scope("connect-network");
    state
        .gateway
        .connect_network(&scope, &id, &body.container_id)
        .await?;
    Ok(Json(Message::new(format!(
        "{} connection created with {id}",
        body.container_id
    ))))
}

/// `POST /networks/{id}/disconnect` with `{containerId, force?}`
pub async fn disconnect(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    body: Result<Json<DisconnectNetworkRequest>, JsonRejection>,
) -> Result<Json<Message>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::DisconnectNetwork))?;
    let body = accept(body)?;

    let scope = state.mutation_scope("disconnect-network");
    state
        .gateway
        .disconnect_network(&scope, &id, &body.container_id, body.force.unwrap_or(false))
        .await?;
    Ok(Json(Message::new(format!(
        "{} connection lost with {id}",
        body.container_id
    ))))
}
