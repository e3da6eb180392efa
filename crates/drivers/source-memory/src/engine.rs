//! [`MemoryEngine`]: engine state, lookups and the port implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use wharf_ports::{
    EndpointResource, EngineError, ImageDeleteResponseItem, ImageOps, ImagePruneReport,
    ImageRemoveOptions, ImageSummary, ListFilter, Listing, NetworkCreateOptions,
    NetworkCreateResponse, NetworkOps, NetworkPruneReport, NetworkResource, ResourceSource, listing,
};

use crate::fixture::{ContainerRecord, Fixture};

/// Networks every engine has. They can be neither removed nor pruned.
pub const PREDEFINED_NETWORKS: [&str; 3] = ["bridge", "host", "none"];

fn is_predefined(name: &str) -> bool {
    PREDEFINED_NETWORKS.contains(&name)
}

fn new_id() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

fn strip_algorithm(id: &str) -> &str {
    id.strip_prefix("sha256:").unwrap_or(id)
}

fn short_id(id: &str) -> String {
    strip_algorithm(id).chars().take(12).collect()
}

/// `repo` becomes `repo:latest`; anything with a tag or digest is kept.
fn normalize_tag(reference: &str) -> String {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    if last.contains(':') || last.contains('@') {
        reference.to_owned()
    } else {
        format!("{reference}:latest")
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Index of the single id starting with `prefix`; `None` if zero or several do.
fn unique_prefix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Option<usize> {
    let mut found = None;
    for (idx, id) in ids.enumerate() {
        if id.starts_with(prefix) {
            if found.is_some() {
                return None;
            }
            found = Some(idx);
        }
    }
    found
}

/// How an image reference resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImageMatch {
    Id,
    Tag(String),
}

#[derive(Debug, Default)]
struct State {
    images: Vec<ImageSummary>,
    networks: Vec<NetworkResource>,
    containers: Vec<ContainerRecord>,
}

impl State {
    fn find_image(&self, reference: &str) -> Option<(usize, ImageMatch)> {
        let bare = strip_algorithm(reference);
        if let Some(idx) = self
            .images
            .iter()
            .position(|i| i.id == reference || strip_algorithm(&i.id) == bare)
        {
            return Some((idx, ImageMatch::Id));
        }

        let tag = normalize_tag(reference);
        if let Some(idx) = self.images.iter().position(|i| i.repo_tags.contains(&tag)) {
            return Some((idx, ImageMatch::Tag(tag)));
        }

        if is_hex(bare) {
            return unique_prefix(self.images.iter().map(|i| strip_algorithm(&i.id)), bare)
                .map(|idx| (idx, ImageMatch::Id));
        }
        None
    }

    fn container_using(&self, image_id: &str) -> Option<&ContainerRecord> {
        self.containers.iter().find(|c| {
            self.find_image(&c.image)
                .is_some_and(|(idx, _)| self.images[idx].id == image_id)
        })
    }

    fn has_children(&self, image_id: &str) -> bool {
        self.images.iter().any(|i| i.parent_id == image_id)
    }

    fn image_view(&self, image: &ImageSummary) -> ImageSummary {
        let mut view = image.clone();
        let users = self
            .containers
            .iter()
            .filter(|c| {
                self.find_image(&c.image)
                    .is_some_and(|(idx, _)| self.images[idx].id == image.id)
            })
            .count();
        view.containers = i64::try_from(users).unwrap_or(i64::MAX);
        view
    }

    fn find_container(&self, reference: &str) -> Option<&ContainerRecord> {
        let name = reference.trim_start_matches('/');
        self.containers
            .iter()
            .find(|c| c.id == reference || c.name == name)
            .or_else(|| {
                unique_prefix(self.containers.iter().map(|c| c.id.as_str()), reference)
                    .map(|idx| &self.containers[idx])
            })
    }

    fn find_network(&self, reference: &str) -> Option<usize> {
        self.networks
            .iter()
            .position(|n| n.id == reference)
            .or_else(|| self.networks.iter().position(|n| n.name == reference))
            .or_else(|| unique_prefix(self.networks.iter().map(|n| n.id.as_str()), reference))
    }

    // ── images ──────────────────────────────────────────────────────────

    fn remove_image(
        &mut self,
        reference: &str,
        options: ImageRemoveOptions,
    ) -> Result<Vec<ImageDeleteResponseItem>, EngineError> {
        let (idx, matched) = self
            .find_image(reference)
            .ok_or_else(|| EngineError::not_found(format!("No such image: {reference}")))?;
        let image = &self.images[idx];
        let short = short_id(&image.id);

        if let ImageMatch::Tag(tag) = &matched {
            if image.repo_tags.len() > 1 {
                let tag = tag.clone();
                self.images[idx].repo_tags.retain(|t| *t != tag);
                return Ok(vec![ImageDeleteResponseItem::untagged(tag)]);
            }
        }

        if !options.force {
            if image.repo_tags.len() > 1 {
                return Err(EngineError::conflict(format!(
                    "conflict: unable to delete {short} (must be forced) - image is referenced in multiple repositories"
                )));
            }
            if let Some(container) = self.container_using(&image.id) {
                return Err(EngineError::conflict(format!(
                    "conflict: unable to delete {short} (must be forced) - image is being used by container {}",
                    short_id(&container.id)
                )));
            }
        }
        if self.has_children(&image.id) {
            return Err(EngineError::conflict(format!(
                "conflict: unable to delete {short} (cannot be forced) - image has dependent child images"
            )));
        }

        let removed = self.images.remove(idx);
        let mut items: Vec<_> = removed
            .repo_tags
            .iter()
            .map(ImageDeleteResponseItem::untagged)
            .collect();
        items.push(ImageDeleteResponseItem::deleted(&removed.id));

        if options.prune_children {
            let mut parent = removed.parent_id;
            while !parent.is_empty() {
                let Some(pidx) = self.images.iter().position(|i| i.id == parent) else {
                    break;
                };
                let candidate = &self.images[pidx];
                if !candidate.is_dangling()
                    || self.has_children(&candidate.id)
                    || self.container_using(&candidate.id).is_some()
                {
                    break;
                }
                let pruned = self.images.remove(pidx);
                items.push(ImageDeleteResponseItem::deleted(&pruned.id));
                parent = pruned.parent_id;
            }
        }

        Ok(items)
    }

    fn tag_image(&mut self, reference: &str, tag: &str) -> Result<(), EngineError> {
        let tag = tag.trim();
        if tag.is_empty() || tag.starts_with(':') || tag.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidParameter(format!(
                "invalid reference format: {tag:?}"
            )));
        }
        let (idx, _) = self
            .find_image(reference)
            .ok_or_else(|| EngineError::not_found(format!("No such image: {reference}")))?;

        let tag = normalize_tag(tag);
        for image in &mut self.images {
            image.repo_tags.retain(|t| *t != tag);
        }
        self.images[idx].repo_tags.push(tag);
        Ok(())
    }

    fn prune_images(&mut self) -> ImagePruneReport {
        let victims: Vec<String> = self
            .images
            .iter()
            .filter(|i| {
                i.is_dangling() && !self.has_children(&i.id) && self.container_using(&i.id).is_none()
            })
            .map(|i| i.id.clone())
            .collect();

        let mut report = ImagePruneReport::default();
        self.images.retain(|image| {
            if victims.contains(&image.id) {
                report
                    .images_deleted
                    .push(ImageDeleteResponseItem::deleted(&image.id));
                report.space_reclaimed += u64::try_from(image.size).unwrap_or(0);
                false
            } else {
                true
            }
        });
        report
    }

    // ── networks ────────────────────────────────────────────────────────

    fn network_not_found(reference: &str) -> EngineError {
        EngineError::not_found(format!("network {reference} not found"))
    }

    fn remove_network(&mut self, reference: &str) -> Result<NetworkResource, EngineError> {
        let idx = self
            .find_network(reference)
            .ok_or_else(|| Self::network_not_found(reference))?;
        let network = &self.networks[idx];
        if is_predefined(&network.name) {
            return Err(EngineError::Forbidden(format!(
                "{} is a pre-defined network and cannot be removed",
                network.name
            )));
        }
        if !network.containers.is_empty() {
            return Err(EngineError::conflict(format!(
                "error while removing network: network {} id {} has active endpoints",
                network.name, network.id
            )));
        }
        Ok(self.networks.remove(idx))
    }

    fn connect_network(&mut self, reference: &str, container: &str) -> Result<(), EngineError> {
        let idx = self
            .find_network(reference)
            .ok_or_else(|| Self::network_not_found(reference))?;
        let record = self
            .find_container(container)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("No such container: {container}")))?;

        let network = &mut self.networks[idx];
        if network.containers.contains_key(&record.id) {
            return Err(EngineError::Forbidden(format!(
                "endpoint with name {} already exists in network {}",
                record.name, network.name
            )));
        }

        let host = network.containers.len() + 2;
        network.containers.insert(
            record.id,
            EndpointResource {
                name: record.name,
                endpoint_id: new_id(),
                mac_address: format!("02:42:ac:12:00:{host:02x}"),
                ipv4_address: format!("172.18.0.{host}/16"),
                ipv6_address: String::new(),
            },
        );
        Ok(())
    }

    fn disconnect_network(
        &mut self,
        reference: &str,
        container: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        let idx = self
            .find_network(reference)
            .ok_or_else(|| Self::network_not_found(reference))?;
        let key = match self.find_container(container) {
            Some(record) => record.id.clone(),
            None if force => container.to_owned(),
            None => {
                return Err(EngineError::not_found(format!(
                    "No such container: {container}"
                )));
            }
        };

        let network = &mut self.networks[idx];
        if network.containers.remove(&key).is_none() {
            if force {
                network
                    .containers
                    .retain(|_, endpoint| endpoint.name != container);
            } else {
                return Err(EngineError::InvalidParameter(format!(
                    "container {container} is not connected to network {}",
                    network.name
                )));
            }
        }
        Ok(())
    }

    fn create_network(
        &mut self,
        name: &str,
        options: NetworkCreateOptions,
    ) -> Result<NetworkCreateResponse, EngineError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidParameter(
                "network name must not be empty".into(),
            ));
        }
        if is_predefined(name) {
            return Err(EngineError::Forbidden(format!(
                "operation is not permitted on predefined {name} network"
            )));
        }

        let existing = self.networks.iter().find(|n| n.name == name);
        let warning = match existing {
            Some(network) if options.check_duplicate => {
                return Err(EngineError::conflict(format!(
                    "network with name {} already exists",
                    network.name
                )));
            }
            Some(network) => format!(
                "Network with name {name} (id : {}) already exists",
                network.id
            ),
            None => String::new(),
        };

        let driver = if options.driver.trim().is_empty() {
            "bridge".to_owned()
        } else {
            options.driver
        };
        let network = NetworkResource {
            name: name.to_owned(),
            id: new_id(),
            created: chrono::Utc::now().to_rfc3339(),
            scope: options.scope,
            driver,
            internal: options.internal,
            attachable: options.attachable,
            labels: options.labels,
            ..NetworkResource::default()
        };
        let response = NetworkCreateResponse {
            id: network.id.clone(),
            warning,
        };
        self.networks.push(network);
        Ok(response)
    }

    fn prune_networks(&mut self) -> NetworkPruneReport {
        let mut report = NetworkPruneReport::default();
        self.networks.retain(|network| {
            if is_predefined(&network.name) || !network.containers.is_empty() {
                true
            } else {
                report.networks_deleted.push(network.name.clone());
                false
            }
        });
        report
    }
}

fn predefined_network(name: &str) -> NetworkResource {
    NetworkResource {
        name: name.to_owned(),
        id: new_id(),
        created: chrono::Utc::now().to_rfc3339(),
        scope: "local".to_owned(),
        driver: match name {
            "none" => "null".to_owned(),
            other => other.to_owned(),
        },
        ..NetworkResource::default()
    }
}

/// Injected failures and delays.
#[derive(Debug, Default)]
struct Faults {
    latency: Option<Duration>,
    fail_next_list: Option<EngineError>,
    fail_listing_after: Option<(usize, EngineError)>,
    fail_next_mutation: Option<EngineError>,
}

/// An in-memory container engine.
///
/// Starts with the pre-defined `bridge`, `host` and `none` networks.
/// Every call can be delayed and list or mutation calls can be made to
/// fail, to exercise deadline and failure paths without a real engine.
#[derive(Debug)]
pub struct MemoryEngine {
    state: RwLock<State>,
    faults: Mutex<Faults>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// An engine with only the pre-defined networks.
    #[must_use]
    pub fn new() -> Self {
        let state = State {
            networks: PREDEFINED_NETWORKS.iter().map(|n| predefined_network(n)).collect(),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
            faults: Mutex::new(Faults::default()),
            list_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
        }
    }

    /// An engine seeded from `fixture`.
    ///
    /// Fixture networks named like a pre-defined one replace it. Missing
    /// network ids and creation times are filled in.
    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        let engine = Self::new();
        for image in fixture.images {
            engine.insert_image(image);
        }
        for network in fixture.networks {
            engine.insert_network(network);
        }
        for container in fixture.containers {
            engine.insert_container(container);
        }
        engine
    }

    /// Add an image at the end of the listing order.
    pub fn insert_image(&self, image: ImageSummary) {
        self.state.write().images.push(image);
    }

    /// Add a network, replacing one with the same name.
    pub fn insert_network(&self, mut network: NetworkResource) {
        if network.id.is_empty() {
            network.id = new_id();
        }
        if network.created.is_empty() {
            network.created = chrono::Utc::now().to_rfc3339();
        }
        let mut state = self.state.write();
        match state.networks.iter_mut().find(|n| n.name == network.name) {
            Some(slot) => *slot = network,
            None => state.networks.push(network),
        }
    }

    /// Register a container.
    pub fn insert_container(&self, container: ContainerRecord) {
        self.state.write().containers.push(container);
    }

    /// Snapshot of the image `reference` resolves to.
    #[must_use]
    pub fn image(&self, reference: &str) -> Option<ImageSummary> {
        let state = self.state.read();
        state
            .find_image(reference)
            .map(|(idx, _)| state.image_view(&state.images[idx]))
    }

    /// Snapshot of the network `reference` resolves to.
    #[must_use]
    pub fn network(&self, reference: &str) -> Option<NetworkResource> {
        let state = self.state.read();
        state
            .find_network(reference)
            .map(|idx| state.networks[idx].clone())
    }

    /// Image ids in listing order.
    #[must_use]
    pub fn image_ids(&self) -> Vec<String> {
        self.state.read().images.iter().map(|i| i.id.clone()).collect()
    }

    /// Network names in listing order.
    #[must_use]
    pub fn network_names(&self) -> Vec<String> {
        self.state
            .read()
            .networks
            .iter()
            .map(|n| n.name.clone())
            .collect()
    }

    // ── fault injection ─────────────────────────────────────────────────

    /// Delay every call by `latency`, or stop delaying with `None`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().latency = latency;
    }

    /// Fail the next list call before it produces anything.
    pub fn fail_next_list(&self, error: EngineError) {
        self.faults.lock().fail_next_list = Some(error);
    }

    /// Make the next listing fail after producing `produced` summaries.
    pub fn fail_listing_after(&self, produced: usize, error: EngineError) {
        self.faults.lock().fail_listing_after = Some((produced, error));
    }

    /// Fail the next mutation without touching state.
    pub fn fail_next_mutation(&self, error: EngineError) {
        self.faults.lock().fail_next_mutation = Some(error);
    }

    /// List calls received so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Mutation calls received so far.
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::Relaxed)
    }

    async fn pause(&self) {
        let latency = self.faults.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn begin_list(&self) -> Result<(), EngineError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        match self.faults.lock().fail_next_list.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn begin_mutation(&self) -> Result<(), EngineError> {
        self.mutation_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        match self.faults.lock().fail_next_mutation.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn listing<R: Send + 'static>(&self, items: Vec<R>) -> Listing<R> {
        match self.faults.lock().fail_listing_after.take() {
            Some((produced, error)) => {
                listing::failing_after(items.into_iter().take(produced).collect(), error)
            }
            None => listing::from_vec(items),
        }
    }
}

#[async_trait]
impl ResourceSource<ImageSummary> for MemoryEngine {
    async fn list(&self, filter: &ListFilter) -> Result<Listing<ImageSummary>, EngineError> {
        self.begin_list().await?;
        let images: Vec<ImageSummary> = {
            let state = self.state.read();
            state
                .images
                .iter()
                .filter(|i| {
                    filter.matches_dangling(i.is_dangling())
                        && filter.matches_labels(&i.labels)
                        && filter.matches_names(i.repo_tags.iter().map(String::as_str))
                })
                .map(|i| state.image_view(i))
                .collect()
        };
        tracing::debug!(count = images.len(), "memory engine listed images");
        Ok(self.listing(images))
    }
}

#[async_trait]
impl ResourceSource<NetworkResource> for MemoryEngine {
    async fn list(&self, filter: &ListFilter) -> Result<Listing<NetworkResource>, EngineError> {
        self.begin_list().await?;
        let networks: Vec<NetworkResource> = self
            .state
            .read()
            .networks
            .iter()
            .filter(|n| {
                let unused = n.containers.is_empty() && !is_predefined(&n.name);
                filter.matches_dangling(unused)
                    && filter.matches_labels(&n.labels)
                    && filter.matches_names(std::iter::once(n.name.as_str()))
            })
            .cloned()
            .collect();
        tracing::debug!(count = networks.len(), "memory engine listed networks");
        Ok(self.listing(networks))
    }
}

#[async_trait]
impl ImageOps for MemoryEngine {
    async fn remove_image(
        &self,
        image: &str,
        options: ImageRemoveOptions,
    ) -> Result<Vec<ImageDeleteResponseItem>, EngineError> {
        self.begin_mutation().await?;
        let items = self.state.write().remove_image(image, options)?;
        tracing::debug!(image, items = items.len(), "memory engine removed image");
        Ok(items)
    }

    async fn tag_image(&self, image: &str, tag: &str) -> Result<(), EngineError> {
        self.begin_mutation().await?;
        self.state.write().tag_image(image, tag)
    }

    async fn prune_images(&self) -> Result<ImagePruneReport, EngineError> {
        self.begin_mutation().await?;
        Ok(self.state.write().prune_images())
    }
}

#[async_trait]
impl NetworkOps for MemoryEngine {
    async fn remove_network(&self, network: &str) -> Result<(), EngineError> {
        self.begin_mutation().await?;
        let removed = self.state.write().remove_network(network)?;
        tracing::debug!(network = %removed.name, "memory engine removed network");
        Ok(())
    }

    async fn connect_network(&self, network: &str, container: &str) -> Result<(), EngineError> {
        self.begin_mutation().await?;
        self.state.write().connect_network(network, container)
    }

    async fn disconnect_network(
        &self,
        network: &str,
        container: &str,
        force: bool,
    ) -> Result<(), EngineError> {
        self.begin_mutation().await?;
        self.state
            .write()
            .disconnect_network(network, container, force)
    }

    async fn create_network(
        &self,
        name: &str,
        options: NetworkCreateOptions,
    ) -> Result<NetworkCreateResponse, EngineError> {
        self.begin_mutation().await?;
        self.state.write().create_network(name, options)
    }

    async fn prune_networks(&self) -> Result<NetworkPruneReport, EngineError> {
        self.begin_mutation().await?;
        Ok(self.state.write().prune_networks())
    }
}

/// Connected containers keyed by id, for tests building networks by hand.
#[must_use]
pub fn endpoints<'a>(
    containers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> HashMap<String, EndpointResource> {
    containers
        .into_iter()
        .map(|(id, name)| {
            (
                id.to_owned(),
                EndpointResource {
                    name: name.to_owned(),
                    ..EndpointResource::default()
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("nginx", "nginx:latest")]
    #[case("nginx:1.27", "nginx:1.27")]
    #[case("localhost:5000/app", "localhost:5000/app:latest")]
    #[case("localhost:5000/app:v2", "localhost:5000/app:v2")]
    #[case("app@sha256:abc", "app@sha256:abc")]
    fn tag_normalization(#[case] raw: &str, #[case] normalized: &str) {
        assert_eq!(normalize_tag(raw), normalized);
    }

    #[test]
    fn unique_prefix_requires_a_single_match() {
        let ids = ["abc123", "abd456", "ffff"];
        assert_eq!(unique_prefix(ids.iter().copied(), "abc"), Some(0));
        assert_eq!(unique_prefix(ids.iter().copied(), "ab"), None);
        assert_eq!(unique_prefix(ids.iter().copied(), "0"), None);
    }

    #[test]
    fn short_ids_drop_the_algorithm() {
        assert_eq!(short_id("sha256:0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("c1"), "c1");
    }

    #[test]
    fn new_engine_has_predefined_networks() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.network_names(), vec!["bridge", "host", "none"]);
        assert_eq!(engine.network("none").unwrap().driver, "null");
        assert_eq!(engine.network("bridge").unwrap().id.len(), 64);
    }

    #[test]
    fn fixture_network_replaces_predefined() {
        let engine = MemoryEngine::from_fixture(Fixture {
            networks: vec![NetworkResource {
                name: "bridge".into(),
                driver: "bridge".into(),
                containers: endpoints([("c1", "proxy")]),
                ..NetworkResource::default()
            }],
            ..Fixture::default()
        });
        let bridge = engine.network("bridge").unwrap();
        assert_eq!(bridge.containers.len(), 1);
        assert!(!bridge.id.is_empty());
        assert_eq!(engine.network_names().len(), 3);
    }
}
