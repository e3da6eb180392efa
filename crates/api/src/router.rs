//! Route table.

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::handlers::{images, networks};
use crate::state::AppState;

/// Build the application router.
///
/// Handlers read the caller from the request extensions; the layer that
/// authenticates requests must be added on top of the returned router.
pub fn app(state: AppState) -> Router {
    let images = Router::new()
        .route("/", get(images::list))
        .route("/prune", post(images::prune))
        .route("/{id}", delete(images::remove))
        .route("/{id}/tag", post(images::tag));

    let networks = Router::new()
        .route("/", get(networks::list).post(networks::create))
        .route("/prune", post(networks::prune))
        .route("/{id}", delete(networks::remove))
        .route("/{id}/connect", post(networks::connect))
        .route("/{id}/disconnect", post(networks::disconnect));

    Router::new()
        .nest("/images", images)
        .nest("/networks", networks)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
