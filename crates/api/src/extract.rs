//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use wharf_core::Principal;

use crate::error::ApiError;

/// The caller, as placed in the request extensions by the authentication
/// layer in front of the router.
///
/// Rejects with [`ApiError::Unauthenticated`] when no [`Principal`] is
/// present.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(Self)
            .ok_or(ApiError::Unauthenticated)
    }
}
