//! `/images` handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use wharf_core::{Mutation, Operation};
use wharf_ports::{ImageDeleteResponseItem, ImagePruneReport, ImageSummary, ResourceKind};

use super::accept;
use crate::error::ApiError;
use crate::extract::CurrentPrincipal;
use crate::request::{ImageListQuery, RemoveImageRequest, TagImageRequest};
use crate::state::AppState;

/// `GET /images?dangling=<bool>`
pub async fn list(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    query: Result<Query<ImageListQuery>, QueryRejection>,
) -> Result<Json<Vec<ImageSummary>>, ApiError> {
    state.authorize(&principal, Operation::List(ResourceKind::Image))?;
    let Query(query) = query.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;

    let scope = state.enumeration_scope("list-images");
    let images = state
        .enumerator
        .list::<ImageSummary>(&scope, query.filter())
        .await?;
    Ok(Json(images))
}

/// `POST /images/prune`
pub async fn prune(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<ImagePruneReport>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::PruneImages))?;

    let scope = state.mutation_scope("prune-images");
    let report = state.gateway.prune_images(&scope).await?;
    Ok(Json(report))
}

/// `DELETE /images/{id}` with `{force?, pruneChildren?}`
pub async fn remove(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    body: Result<Json<RemoveImageRequest>, JsonRejection>,
) -> Result<Json<Vec<ImageDeleteResponseItem>>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::RemoveImage))?;
    let body = accept(body)?;

    let scope = state.mutation_scope("remove-image");
    let items = state
        .gateway
        .remove_image(&scope, &id, body.options())
        .await?;
    Ok(Json(items))
}

/// `POST /images/{id}/tag` with `{tag}`
pub async fn tag(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<String>,
    body: Result<Json<TagImageRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    state.authorize(&principal, Operation::Mutate(Mutation::TagImage))?;
    let body = accept(body)?;

    let scope = state.mutation_scope("tag-image");
    state.gateway.tag_image(&scope, &id, &body.tag).await?;
    Ok(Json(format!("{id} tagged successfully")))
}
