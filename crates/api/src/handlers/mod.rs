//! Route handlers.
//!
//! Every handler follows the same order: identify the caller, check the
//! policy, decode and validate the body, open a fresh scope, call the
//! core, render. The scope lives on the handler's stack, so a client that
//! disconnects drops it and stops any producer still running.

pub mod images;
pub mod networks;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use crate::error::ApiError;
use crate::request::Validate;

/// `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Human-readable outcome.
    pub message: String,
}

impl Message {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Unwrap a JSON body and validate it.
pub(crate) fn accept<T: Validate>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = body?;
    body.validate()?;
    Ok(body)
}
