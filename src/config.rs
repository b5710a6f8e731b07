//! Pool configuration structures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pool configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Pool name, used as a label in logs and metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Maximum number of idle resources to keep.
    ///
    /// Resources in use are not counted against this limit.
    #[serde(default = "PoolConfig::default_capacity")]
    pub capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: None,
            capacity: Self::default_capacity(),
        }
    }
}

impl PoolConfig {
    /// Default value for [`Self::capacity`].
    #[must_use]
    #[inline]
    fn default_capacity() -> usize {
        8
    }

    /// Create builder for pool configuration.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }

    /// Set pool name.
    #[must_use]
    pub fn with_name(mut self, name: impl ToString) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set maximum number of idle resources.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Pool configuration error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolConfigError {
    /// Configuration builder error
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

/// Builder for pool configuration.
#[must_use]
pub struct PoolConfigBuilder {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl PoolConfigBuilder {
    /// Alternative method to construct a pool configuration builder.
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
        }
    }

    /// Try to build configuration object from preconfigured sources.
    ///
    /// This method will do all the I/O necessary to load the configuration.
    ///
    /// See [`config::builder::ConfigBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if some configuration loading was unsuccessful.
    pub fn build(self) -> Result<PoolConfig, PoolConfigError> {
        self.builder.build()?.try_deserialize().map_err(Into::into)
    }

    /// Add a custom object implementing [`Source`] trait as a source of pool configuration.
    ///
    /// [`Source`]: config::Source
    pub fn with_source<T>(mut self, source: T) -> Self
    where
        T: config::Source + Send + Sync + 'static,
    {
        self.builder = self.builder.add_source(source);
        self
    }

    /// Add file as a source of pool configuration.
    pub fn with_file(self, name: impl AsRef<str>) -> Self {
        self.with_source(config::File::with_name(name.as_ref()))
    }

    /// Add environment variables as a source of pool configuration.
    pub fn with_env(self, prefix: impl AsRef<str>) -> Self {
        self.with_source(
            config::Environment::with_prefix(prefix.as_ref())
                .separator("_")
                .prefix_separator("__")
                .try_parsing(true),
        )
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use config::{File, FileFormat};
    use serde_json::{from_str, json, to_value};

    use super::*;

    /// Deserialize - default values.
    #[test]
    fn config_de_default() {
        let deserialized: PoolConfig = from_str("{}").unwrap();
        assert_eq!(deserialized, PoolConfig::default());
        assert_eq!(deserialized.capacity, 8);
        assert!(deserialized.name.is_none());
    }

    /// Deserialize - all values set.
    #[test]
    fn config_de_full() {
        let serialized = r#"{
            "name": "primary",
            "capacity": 2
        }"#;
        let deserialized: PoolConfig = from_str(serialized).unwrap();
        assert_eq!(
            deserialized,
            PoolConfig::default().with_name("primary").with_capacity(2)
        );
    }

    /// Deserialize - negative capacity is rejected.
    #[test]
    fn config_de_negative_capacity() {
        assert!(from_str::<PoolConfig>(r#"{"capacity": -1}"#).is_err());
    }

    /// Serialize - unnamed pool omits the name.
    #[test]
    fn config_ser_default() {
        let serialized = to_value(PoolConfig::default()).unwrap();
        assert_eq!(serialized, json!({ "capacity": 8 }));
    }

    /// Build from YAML source.
    #[test]
    fn builder_yaml_source() {
        let cfg = PoolConfig::builder()
            .with_source(File::from_str("name: replicas\ncapacity: 3\n", FileFormat::Yaml))
            .build()
            .unwrap();
        assert_eq!(cfg.name.as_deref(), Some("replicas"));
        assert_eq!(cfg.capacity, 3);
    }

    /// Build from YAML source - negative capacity is rejected.
    #[test]
    fn builder_yaml_negative_capacity() {
        let res = PoolConfig::builder()
            .with_source(File::from_str("capacity: -4\n", FileFormat::Yaml))
            .build();
        assert!(matches!(res, Err(PoolConfigError::Config(_))));
    }

    /// Build without any sources.
    #[test]
    fn builder_empty() {
        let cfg = PoolConfigBuilder::default().build().unwrap();
        assert_eq!(cfg, PoolConfig::default());
    }
}
