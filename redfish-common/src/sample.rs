use serde::{Deserialize, Serialize};
use std::fmt;

/// Plugin identifier stamped on every dispatched record.
pub const PLUGIN_NAME: &str = "redfish";

/// Data source kind of a sample, following the collectd value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Instantaneous reading that can go up or down.
    Gauge,
    /// Monotonically increasing unsigned counter.
    Counter,
    /// Signed counter whose rate of change is of interest.
    Derive,
    /// Unsigned counter that is reset on every read.
    Absolute,
}

impl SampleKind {
    /// Get the lowercase name used in configuration and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Gauge => "gauge",
            SampleKind::Counter => "counter",
            SampleKind::Derive => "derive",
            SampleKind::Absolute => "absolute",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed numeric sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Sample {
    Gauge(f64),
    Counter(u64),
    Derive(i64),
    Absolute(u64),
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Gauge(v) => write!(f, "{}", v),
            Sample::Counter(v) | Sample::Absolute(v) => write!(f, "{}", v),
            Sample::Derive(v) => write!(f, "{}", v),
        }
    }
}

/// A converted sample together with its identification, ready for dispatch.
///
/// The identification mirrors a collectd value list:
/// `host/plugin-plugin_instance/type-type_instance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Unix epoch milliseconds when the record was built.
    pub timestamp: i64,

    /// Host identity, i.e. the configured service name.
    pub host: String,

    /// Always [`PLUGIN_NAME`] for records produced by this collector.
    pub plugin: String,

    /// Plugin instance (e.g. "Fans", "Voltages").
    pub plugin_instance: String,

    /// Type name (e.g. "temperature", "fanspeed").
    #[serde(rename = "type")]
    pub type_name: String,

    /// Label distinguishing samples of the same type.
    pub type_instance: String,

    /// The converted value.
    pub value: Sample,
}

impl SampleRecord {
    /// Create a record for the redfish plugin stamped with the current time.
    pub fn new(
        host: impl Into<String>,
        plugin_instance: impl Into<String>,
        type_name: impl Into<String>,
        type_instance: impl Into<String>,
        value: Sample,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            host: host.into(),
            plugin: PLUGIN_NAME.to_string(),
            plugin_instance: plugin_instance.into(),
            type_name: type_name.into(),
            type_instance: type_instance.into(),
            value,
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// collectd-style identifier, used in log lines.
    pub fn identifier(&self) -> String {
        let mut id = format!("{}/{}", self.host, self.plugin);
        if !self.plugin_instance.is_empty() {
            id.push('-');
            id.push_str(&self.plugin_instance);
        }
        id.push('/');
        id.push_str(&self.type_name);
        if !self.type_instance.is_empty() {
            id.push('-');
            id.push_str(&self.type_instance);
        }
        id
    }
}
