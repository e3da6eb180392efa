//! Request bodies and their structural validation.

use serde::Deserialize;
use wharf_ports::{ImageRemoveOptions, ListFilter};

use crate::error::ApiError;

/// Checks a decoded body before it reaches the core.
pub trait Validate {
    /// `Err(ApiError::InvalidRequest)` naming the first offending field.
    fn validate(&self) -> Result<(), ApiError>;
}

fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::invalid(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Query of `GET /images`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageListQuery {
    /// Only dangling (`true`) or only tagged (`false`) images.
    pub dangling: Option<bool>,
}

impl ImageListQuery {
    /// The listing filter this query asks for.
    pub fn filter(&self) -> ListFilter {
        match self.dangling {
            Some(dangling) => ListFilter::all().dangling(dangling),
            None => ListFilter::all(),
        }
    }
}

/// Body of `DELETE /images/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveImageRequest {
    /// Remove even when tagged several times or in use.
    pub force: Option<bool>,
    /// Also delete untagged parents.
    pub prune_children: Option<bool>,
}

impl RemoveImageRequest {
    /// Options with unset flags turned off.
    pub fn options(&self) -> ImageRemoveOptions {
        ImageRemoveOptions {
            force: self.force.unwrap_or(false),
            prune_children: self.prune_children.unwrap_or(false),
        }
    }
}

impl Validate for RemoveImageRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Body of `POST /images/{id}/tag`.
#[derive(Debug, Clone, Deserialize)]
pub struct TagImageRequest {
    /// New reference, `repository[:tag]`.
    pub tag: String,
}

impl Validate for TagImageRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("tag", &self.tag)
    }
}

/// Body of `POST /networks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNetworkRequest {
    /// Network name.
    pub name: String,
    /// Driver name.
    pub driver: String,
}

impl Validate for CreateNetworkRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("name", &self.name)?;
        required("driver", &self.driver)
    }
}

/// Body of `POST /networks/{id}/connect`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectNetworkRequest {
    /// Container id or name.
    pub container_id: String,
}

impl Validate for ConnectNetworkRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("containerId", &self.container_id)
    }
}

/// Body of `POST /networks/{id}/disconnect`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectNetworkRequest {
    /// Container id or name.
    pub container_id: String,
    /// Drop the endpoint even if the container is gone.
    pub force: Option<bool>,
}

impl Validate for DisconnectNetworkRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("containerId", &self.container_id)
    }
}
