//! Configuration types and builders
//!
//! - `base`: [`Config`] and [`Format`]
//! - `presets`: environment parsing and the development / production setups

mod base;
mod presets;

pub use base::{Config, Format};
pub use presets::{LOG_ENV, LOG_FORMAT_ENV};
