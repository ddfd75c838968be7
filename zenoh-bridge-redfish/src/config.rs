//! Configuration for the Redfish bridge.

use redfish_common::{Error, Format, LoggingConfig, Result, SampleKind, ZenohConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedfishBridgeConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Payload encoding of published samples
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Redfish-specific settings
    pub redfish: RedfishConfig,
}

/// Redfish collector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedfishConfig {
    /// Key expression prefix (default: "zensight/redfish")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Seconds between two collection cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Accept self-signed BMC certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Additional type names, or overrides of the built-in ones
    #[serde(default)]
    pub types: HashMap<String, SampleKind>,

    /// `Service` and `Query` blocks
    #[serde(default)]
    pub blocks: Vec<ConfigNode>,
}

fn default_key_prefix() -> String {
    redfish_common::KEY_PREFIX.to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    5000
}

impl RedfishBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: RedfishBridgeConfig = redfish_common::load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.redfish.poll_interval_secs == 0 {
            return Err(Error::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        if self.redfish.timeout_ms == 0 {
            return Err(Error::Config(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.redfish.key_prefix.trim_matches('/').is_empty() {
            return Err(Error::Config("key_prefix cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// A scalar value attached to a configuration node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl ConfigValue {
    /// Name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConfigValue::Boolean(_) => "boolean",
            ConfigValue::Number(_) => "number",
            ConfigValue::String(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<f64> for ConfigValue {
    fn from(n: f64) -> Self {
        ConfigValue::Number(n)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

/// A node of the collectd-style configuration tree.
///
/// ```text
/// { key: "Property", values: ["Reading"], children: [
///     { key: "Type", values: ["fanspeed"] },
/// ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub key: String,

    #[serde(default)]
    pub values: Vec<ConfigValue>,

    #[serde(default)]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new<V: Into<ConfigValue>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ConfigNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Keys are matched case-insensitively.
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}
