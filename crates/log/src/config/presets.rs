//! Configuration presets for common scenarios

use super::{Config, Format};

/// Filter variable checked first.
pub const LOG_ENV: &str = "WHARF_LOG";
/// Format variable.
pub const LOG_FORMAT_ENV: &str = "WHARF_LOG_FORMAT";

impl Config {
    /// Create configuration from environment variables
    ///
    /// `WHARF_LOG` (falling back to `RUST_LOG`) sets the filter,
    /// `WHARF_LOG_FORMAT` the format.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LOG_ENV).or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = Format::parse_lossy(&format);
            config.ansi = config.format != Format::Json;
        }

        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            ansi: true,
            source: true,
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            ansi: false,
            source: false,
            ..Self::default()
        }
    }

    /// Record `service` on the root span.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}
