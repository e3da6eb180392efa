//! Logger builder implementation

mod format;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span entered
///
/// Hold it for the lifetime of the program.
#[derive(Debug)]
pub struct LoggerGuard {
    _root_span: Option<tracing::span::EnteredSpan>,
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// The configuration that will be installed.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate the filter without installing anything.
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level).map_err(|e| LogError::Filter {
            filter: self.config.level.clone(),
            reason: e.to_string(),
        })
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already set
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let fmt_layer = format::make_fmt_layer::<Registry>(&self.config);

        Registry::default()
            .with(fmt_layer)
            .with(filter)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;

        let root_span = self
            .config
            .service
            .as_deref()
            .map(|service| tracing::info_span!("app", service).entered());

        tracing::debug!(
            level = %self.config.level,
            format = %self.config.format,
            "logger initialized"
        );

        Ok(LoggerGuard {
            _root_span: root_span,
        })
    }
}

impl LoggerGuard {
    /// A guard that holds nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self { _root_span: None }
    }
}
