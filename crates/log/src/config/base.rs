//! Core configuration types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filter directives (e.g., "info", "debug,tower_http=warn")
    pub level: String,

    /// Output format
    pub format: Format,

    /// Colored output
    pub ansi: bool,

    /// Include the event target (module path)
    pub target: bool,

    /// Include source file and line
    pub source: bool,

    /// Service name recorded on a root span around everything logged
    pub service: Option<String>,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Human-readable, multi-line
    Pretty,
    /// Single-line
    Compact,
    /// One JSON object per event
    Json,
}

impl Format {
    /// Parse a format name; anything unknown falls back to compact.
    #[must_use]
    pub fn parse_lossy(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Compact,
            ansi: true,
            target: true,
            source: false,
            service: None,
        }
    }
}
