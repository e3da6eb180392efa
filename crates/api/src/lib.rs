#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Wharf API
//!
//! The HTTP request layer over `wharf-core`.
//!
//! - [`router::app`] builds the axum router for `/images` and `/networks`
//! - [`CurrentPrincipal`] reads the caller placed in the request extensions
//! - [`request`] holds the JSON bodies and their validation
//! - [`ApiError`] maps core failures to status codes and `{"error": ...}`
//! - [`ApiConfig`] layers defaults, a TOML file and `WHARF_*` variables
//!
//! Authentication is not part of this crate. Whatever sits in front of the
//! router inserts a [`wharf_core::Principal`] into the request extensions;
//! the `wharf-server` binary stamps a configured one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wharf_api::{AppState, router};
//! use wharf_source_memory::MemoryEngine;
//!
//! let state = AppState::new(Arc::new(MemoryEngine::new()));
//! let app = router::app(state).layer(axum::Extension(principal));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod request;
pub mod router;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::ApiError;
pub use extract::CurrentPrincipal;
pub use state::{AppState, Engine};
