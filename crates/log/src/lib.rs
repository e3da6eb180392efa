//! # Wharf Log
//!
//! Logging bootstrap for Wharf services, on top of `tracing` and
//! `tracing-subscriber`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! fn main() -> Result<(), wharf_log::LogError> {
//!     let _guard = wharf_log::auto_init()?;
//!     wharf_log::info!(port = 8080, "server starting");
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod builder;
mod config;
mod error;

// Public API
pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, Format, LOG_ENV, LOG_FORMAT_ENV};
pub use error::{LogError, LogResult};

// Re-export tracing macros
pub use tracing::{debug, error, info, instrument, span, trace, warn};

/// Pick a configuration from the environment and build type.
///
/// An explicit filter variable (`WHARF_LOG` or `RUST_LOG`) selects
/// [`Config::from_env`]; otherwise debug builds get
/// [`Config::development`] and release builds [`Config::production`].
pub fn auto_init() -> LogResult<LoggerGuard> {
    init_with(auto_config(|key| std::env::var(key).ok()))
}

/// Initialize with default configuration
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::default())
}

/// Initialize with custom configuration
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

fn auto_config(lookup: impl Fn(&str) -> Option<String>) -> Config {
    if lookup(LOG_ENV).is_some() || lookup("RUST_LOG").is_some() {
        Config::from_lookup(lookup)
    } else if cfg!(debug_assertions) {
        Config::development()
    } else {
        Config::production()
    }
}
