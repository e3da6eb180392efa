//! Error type of the request layer and its HTTP mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use wharf_core::{EnumerationError, ErrorClass, GatewayError, PolicyError};

/// Everything a handler can fail with.
///
/// Rendered as `{"error": "<message>"}` with the status of
/// [`ApiError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No principal on the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The policy refused the operation.
    #[error(transparent)]
    Denied(#[from] PolicyError),

    /// The body is missing, malformed or fails validation.
    #[error("{0}")]
    InvalidRequest(String),

    /// A listing failed.
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    /// A mutation failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns the HTTP status code for this error.
    ///
    /// - Unauthenticated: 401
    /// - Denied: 403
    /// - InvalidRequest: 400
    /// - NotFound: 404
    /// - Rejected: 403, the engine refused the change
    /// - DeadlineExceeded (enumeration or mutation): 504
    /// - Enumeration: 500
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Denied(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Enumeration(err) => class_status(err.class()),
            Self::Gateway(err) => class_status(err.class()),
        }
    }

    /// Message placed in the response body.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Enumeration(err) => err.detail(),
            other => other.to_string(),
        }
    }
}

fn class_status(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Enumeration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Rejected => StatusCode::FORBIDDEN,
        ErrorClass::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request refused");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use wharf_core::{Mutation, Operation, Permission};
    use wharf_ports::{EngineError, ResourceKind};

    fn rejected() -> ApiError {
        ApiError::Gateway(GatewayError::Rejected {
            mutation: Mutation::CreateNetwork,
            source: EngineError::conflict("network with name web already exists"),
        })
    }

    #[rstest]
    #[case(ApiError::Unauthenticated, StatusCode::UNAUTHORIZED)]
    #[case(ApiError::invalid("tag is required"), StatusCode::BAD_REQUEST)]
    #[case(rejected(), StatusCode::FORBIDDEN)]
    #[case(
        ApiError::Gateway(GatewayError::NotFound {
            mutation: Mutation::RemoveImage,
            target: "x1".into(),
            source: EngineError::not_found("No such image: x1"),
        }),
        StatusCode::NOT_FOUND
    )]
    #[case(
        ApiError::Gateway(GatewayError::DeadlineExceeded {
            mutation: Mutation::PruneImages,
            budget: Duration::from_secs(1),
        }),
        StatusCode::GATEWAY_TIMEOUT
    )]
    #[case(
        ApiError::Enumeration(EnumerationError::Cancelled { kind: ResourceKind::Image }),
        StatusCode::GATEWAY_TIMEOUT
    )]
    #[case(
        ApiError::Enumeration(EnumerationError::Source {
            kind: ResourceKind::Network,
            source: EngineError::connection("connection reset"),
        }),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    fn status_codes(#[case] err: ApiError, #[case] status: StatusCode) {
        assert_eq!(err.status_code(), status);
    }

    #[test]
    fn enumeration_failures_carry_the_engine_detail() {
        let err = ApiError::Enumeration(EnumerationError::Source {
            kind: ResourceKind::Image,
            source: EngineError::connection("connection reset"),
        });
        assert_eq!(err.message(), "connection reset");
    }

    #[test]
    fn rejected_mutations_keep_the_engine_message() {
        assert_eq!(rejected().message(), "network with name web already exists");
    }

    #[test]
    fn denial_names_the_operation() {
        let err = ApiError::Denied(PolicyError::Denied {
            principal: "viewer".into(),
            operation: Operation::Mutate(Mutation::TagImage),
            granted: Permission::Read,
            required: Permission::Execute,
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.message(),
            "viewer (read) is not allowed to tag_image: requires execute"
        );
    }
}
