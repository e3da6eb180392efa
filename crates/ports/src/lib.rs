#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Wharf Ports
//!
//! Resource model and engine interface traits (ports) for Wharf.
//!
//! This crate defines the **port** traits that container-engine drivers
//! implement, following the Ports & Drivers (hexagonal) pattern:
//!
//! - [`ResourceSource`] -- one-shot listing of a resource kind
//! - [`ImageOps`] -- remove, tag and prune images
//! - [`NetworkOps`] -- remove, connect, disconnect, create and prune networks
//!
//! The resource types ([`ImageSummary`], [`NetworkResource`], reports and
//! options) serialize with the engine's own field names, so the request
//! layer can render them unchanged.
//!
//! All traits are `async_trait` and object-safe, suitable for use as
//! `Arc<dyn Trait>` behind dependency injection.

pub mod error;
pub mod filter;
pub mod image;
pub mod listing;
pub mod model;
pub mod network;
pub mod source;

pub use error::EngineError;
pub use filter::ListFilter;
pub use image::ImageOps;
pub use listing::Listing;
pub use model::{
    EndpointResource, ImageDeleteResponseItem, ImagePruneReport, ImageRemoveOptions,
    ImageSummary, NetworkCreateOptions, NetworkCreateResponse, NetworkPruneReport,
    NetworkResource, Resource, ResourceKind,
};
pub use network::NetworkOps;
pub use source::ResourceSource;
