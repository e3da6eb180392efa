#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Wharf Source Memory Driver
//!
//! In-memory container engine implementing every Wharf port:
//! [`ResourceSource`] for images and networks, [`ImageOps`] and
//! [`NetworkOps`].
//!
//! State lives behind a `parking_lot::RwLock` and follows the engine's
//! rules closely enough for the management API to behave as it would
//! against a real daemon: lookups by id, id prefix, name or tag; removal
//! conflicts; pre-defined networks that cannot be removed. Latency and
//! failures can be injected per call.
//!
//! Suitable for tests, demos and single-process deployments where no
//! engine is available.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wharf_ports::{ImageSummary, ListFilter, ResourceSource};
//! use wharf_source_memory::{Fixture, MemoryEngine};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(MemoryEngine::from_fixture(Fixture::from_path("engine.json")?));
//! let listing = ResourceSource::<ImageSummary>::list(&*engine, &ListFilter::all()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ResourceSource`]: wharf_ports::ResourceSource
//! [`ImageOps`]: wharf_ports::ImageOps
//! [`NetworkOps`]: wharf_ports::NetworkOps

mod engine;
mod fixture;

pub use engine::{MemoryEngine, PREDEFINED_NETWORKS, endpoints};
pub use fixture::{ContainerRecord, Fixture, FixtureError};
