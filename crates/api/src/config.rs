//! Server configuration.
//!
//! Layered with `figment`: built-in defaults, then an optional TOML file,
//! then `WHARF_`-prefixed environment variables. Nested keys use a double
//! underscore, e.g. `WHARF_LOG__LEVEL=debug`. `WHARF_LOG` and
//! `WHARF_LOG_FORMAT` belong to `wharf-log` and are not read here.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wharf_core::{DEFAULT_BUDGET, DEFAULT_RELAY_CAPACITY, Principal};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "WHARF_";

/// Configuration of the API server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// Budget of each listing request.
    #[serde(with = "humantime_serde")]
    pub enumeration_timeout: Duration,

    /// Budget of each mutation request.
    #[serde(with = "humantime_serde")]
    pub mutation_timeout: Duration,

    /// Items buffered between an enumeration producer and its consumer.
    pub relay_capacity: usize,

    /// JSON fixture seeding the in-memory engine.
    pub fixture: Option<PathBuf>,

    /// Principal stamped on every request. Without one, every request is
    /// rejected as unauthenticated unless an outer layer supplies it.
    pub principal: Option<Principal>,

    /// Logging.
    pub log: wharf_log::Config,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enumeration_timeout: DEFAULT_BUDGET,
            mutation_timeout: DEFAULT_BUDGET,
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            fixture: None,
            principal: None,
            log: wharf_log::Config::default(),
        }
    }
}

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A provider failed or a value has the wrong shape.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A value is well-formed but unusable.
    #[error("invalid configuration: {field} {reason}")]
    Value {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl ApiConfig {
    /// Defaults, overridden by `file` when given, then by the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        let env = Env::prefixed(ENV_PREFIX)
            .ignore(&["log", "log_format"])
            .split("__");
        Self::extract(figment.merge(env))
    }

    /// Extract and check a configuration from any figment.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.enumeration_timeout.is_zero() {
            return Err(ConfigError::Value {
                field: "enumeration_timeout",
                reason: "must be greater than zero",
            });
        }
        if self.mutation_timeout.is_zero() {
            return Err(ConfigError::Value {
                field: "mutation_timeout",
                reason: "must be greater than zero",
            });
        }
        if self.relay_capacity == 0 {
            return Err(ConfigError::Value {
                field: "relay_capacity",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
