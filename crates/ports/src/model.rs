//! Engine resource model.
//!
//! Field names follow the engine's JSON API so values can be relayed to
//! clients without reshaping. Wharf never inspects summaries beyond what a
//! driver or filter needs; the core only moves them around.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// The kinds of engine resources Wharf manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Container images.
    Image,
    /// Container networks.
    Network,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// A summary record the engine returns when listing one resource kind.
///
/// Treated as an opaque value: enumeration relays it and nothing more.
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Which kind of resource this summary describes.
    const KIND: ResourceKind;

    /// Engine identifier of the resource.
    fn id(&self) -> &str;
}

/// Summary of one image, as returned by an image listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageSummary {
    /// Content-addressable id (`sha256:...`).
    pub id: String,
    /// Id of the parent image, empty for base images.
    pub parent_id: String,
    /// `repository:tag` references pointing at this image.
    pub repo_tags: Vec<String>,
    /// Registry digests of this image.
    pub repo_digests: Vec<String>,
    /// Creation time, seconds since the Unix epoch.
    pub created: i64,
    /// Total size in bytes, shared layers included.
    pub size: i64,
    /// Bytes shared with other images, `-1` when not computed.
    pub shared_size: i64,
    /// User-defined labels.
    pub labels: BTreeMap<String, String>,
    /// Number of containers using the image, `-1` when not computed.
    pub containers: i64,
}

impl ImageSummary {
    /// An image without tags is dangling.
    #[must_use]
    pub fn is_dangling(&self) -> bool {
        self.repo_tags.is_empty()
    }
}

impl Resource for ImageSummary {
    const KIND: ResourceKind = ResourceKind::Image;

    fn id(&self) -> &str {
        &self.id
    }
}

/// One container's endpoint on a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointResource {
    /// Container name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Endpoint id.
    #[serde(rename = "EndpointID")]
    pub endpoint_id: String,
    /// MAC address assigned to the endpoint.
    #[serde(rename = "MacAddress")]
    pub mac_address: String,
    /// IPv4 address in CIDR notation.
    #[serde(rename = "IPv4Address")]
    pub ipv4_address: String,
    /// IPv6 address in CIDR notation.
    #[serde(rename = "IPv6Address")]
    pub ipv6_address: String,
}

/// Description of one network, as returned by a network listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkResource {
    /// Network name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Network id.
    #[serde(rename = "Id")]
    pub id: String,
    /// Creation time (RFC 3339).
    #[serde(rename = "Created")]
    pub created: String,
    /// `local`, `global` or `swarm`.
    #[serde(rename = "Scope")]
    pub scope: String,
    /// Driver name (`bridge`, `overlay`, ...).
    #[serde(rename = "Driver")]
    pub driver: String,
    /// Whether IPv6 is enabled.
    #[serde(rename = "EnableIPv6")]
    pub enable_ipv6: bool,
    /// Whether the network is isolated from outside traffic.
    #[serde(rename = "Internal")]
    pub internal: bool,
    /// Whether standalone containers may attach.
    #[serde(rename = "Attachable")]
    pub attachable: bool,
    /// Connected containers keyed by container id.
    #[serde(rename = "Containers")]
    pub containers: HashMap<String, EndpointResource>,
    /// Driver options.
    #[serde(rename = "Options")]
    pub options: BTreeMap<String, String>,
    /// User-defined labels.
    #[serde(rename = "Labels")]
    pub labels: BTreeMap<String, String>,
}

impl Resource for NetworkResource {
    const KIND: ResourceKind = ResourceKind::Network;

    fn id(&self) -> &str {
        &self.id
    }
}

/// One entry of an image removal or prune report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageDeleteResponseItem {
    /// A reference that was untagged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untagged: Option<String>,
    /// An image id that was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
}

impl ImageDeleteResponseItem {
    /// Report an untagged reference.
    pub fn untagged(reference: impl Into<String>) -> Self {
        Self {
            untagged: Some(reference.into()),
            deleted: None,
        }
    }

    /// Report a deleted image id.
    pub fn deleted(id: impl Into<String>) -> Self {
        Self {
            untagged: None,
            deleted: Some(id.into()),
        }
    }
}

/// Result of pruning images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImagePruneReport {
    /// Untagged references and deleted image ids.
    pub images_deleted: Vec<ImageDeleteResponseItem>,
    /// Disk space reclaimed in bytes.
    pub space_reclaimed: u64,
}

/// Result of pruning networks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkPruneReport {
    /// Names of the removed networks.
    pub networks_deleted: Vec<String>,
}

/// Engine answer to a network creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCreateResponse {
    /// Id of the new network.
    pub id: String,
    /// Non-fatal warning, empty when none.
    pub warning: String,
}

/// Options for removing an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRemoveOptions {
    /// Remove even if tagged several times or used by stopped containers.
    pub force: bool,
    /// Also delete untagged parent images.
    pub prune_children: bool,
}

/// Options for creating a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCreateOptions {
    /// Driver name.
    pub driver: String,
    /// Network scope.
    pub scope: String,
    /// Restrict external access.
    pub internal: bool,
    /// Allow standalone containers to attach.
    pub attachable: bool,
    /// Refuse to create a network whose name already exists.
    pub check_duplicate: bool,
    /// User-defined labels.
    pub labels: BTreeMap<String, String>,
}

impl NetworkCreateOptions {
    /// Options used by the management API: a local, internal network that
    /// rejects duplicate names.
    pub fn for_driver(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            scope: "local".to_owned(),
            internal: true,
            attachable: false,
            check_duplicate: true,
            labels: BTreeMap::new(),
        }
    }
}
