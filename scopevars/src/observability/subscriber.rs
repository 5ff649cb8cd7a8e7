//! Tracing subscriber configuration.

use crate::errors::ScopevarsError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Environment variable read by [`TracingConfig::from_env`].
pub const FILTER_ENV: &str = "RUST_LOG";

/// Configuration for the global `tracing` subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directives (e.g., "info,scopevars=trace").
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Include the event target in output.
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl TracingConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose filter comes from `RUST_LOG` when set.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(FILTER_ENV) {
            Ok(filter) if !filter.trim().is_empty() => Self::default().with_filter(filter),
            _ => Self::default(),
        }
    }

    /// Sets the filter directives.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enables or disables JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Enables or disables the event target.
    #[must_use]
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Parses the filter directives.
    ///
    /// # Errors
    ///
    /// Returns `ScopevarsError::Subscriber` if the directives are invalid.
    pub fn env_filter(&self) -> Result<EnvFilter, ScopevarsError> {
        EnvFilter::try_new(&self.filter).map_err(|e| ScopevarsError::subscriber(e.to_string()))
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns `ScopevarsError::Subscriber` if the filter is invalid or a
    /// global subscriber is already installed.
    pub fn try_init(&self) -> Result<(), ScopevarsError> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter()?)
            .with_target(self.with_target);

        let result = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        result.map_err(|e| ScopevarsError::subscriber(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TracingConfig::new();
        assert_eq!(config.filter, "info");
        assert!(!config.json);
        assert!(config.with_target);
    }

    #[test]
    fn test_builder() {
        let config = TracingConfig::new()
            .with_filter("scopevars=trace")
            .with_json(true)
            .with_target(false);

        assert_eq!(config.filter, "scopevars=trace");
        assert!(config.json);
        assert!(!config.with_target);
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let config = TracingConfig::new().with_filter("scopevars=notalevel");
        assert!(matches!(
            config.env_filter(),
            Err(ScopevarsError::Subscriber(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TracingConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(config.json);
        assert_eq!(config.filter, "info");
    }
}
