//! Container configuration

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};
use serde::{Deserialize, Serialize};

/// Options frozen into a container at `finish()`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Record which entries were resolved, for [`Container::unresolved_entries`](crate::Container::unresolved_entries)
    pub track_usage: bool,
    /// Maximum number of nested factory invocations within one session
    pub max_depth: Option<usize>,
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_usage_tracking(mut self, enabled: bool) -> Self {
        self.track_usage = enabled;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Load configuration from TOML string
    #[cfg(feature = "config")]
    pub fn from_toml(toml_str: &str) -> DiResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from JSON string
    #[cfg(feature = "config")]
    pub fn from_json(json_str: &str) -> DiResult<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| DiError::ConfigError(format!("Failed to parse JSON: {}", e)))
    }
}

// Example configuration file format:
// ```toml
// track_usage = true
// max_depth = 64
// ```
