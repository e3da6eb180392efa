//! Seed data for a [`MemoryEngine`](crate::MemoryEngine).

use std::path::Path;

use serde::{Deserialize, Serialize};
use wharf_ports::{ImageSummary, NetworkResource};

/// A container known to the engine. Only what image and network
/// operations need to check usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerRecord {
    /// Container id.
    pub id: String,
    /// Container name, without the leading slash.
    pub name: String,
    /// Image reference the container was created from (id or tag).
    pub image: String,
}

impl ContainerRecord {
    /// Create a record.
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
        }
    }
}

/// Images, networks and containers to start from.
///
/// The JSON shape uses the engine's field names:
///
/// ```json
/// {
///   "Images": [{ "Id": "sha256:…", "RepoTags": ["nginx:latest"], "Size": 1024 }],
///   "Networks": [{ "Name": "web", "Id": "…", "Driver": "bridge" }],
///   "Containers": [{ "Id": "c1", "Name": "proxy", "Image": "nginx:latest" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Fixture {
    /// Images, in listing order.
    pub images: Vec<ImageSummary>,
    /// User-defined networks; the pre-defined ones are always present.
    pub networks: Vec<NetworkResource>,
    /// Containers using images and attached to networks.
    pub containers: Vec<ContainerRecord>,
}

/// A fixture could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The file could not be read.
    #[error("failed to read fixture {path}: {source}")]
    Io {
        /// The fixture path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The content is not a valid fixture.
    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Fixture {
    /// Parse a fixture from JSON text.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a fixture file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}
