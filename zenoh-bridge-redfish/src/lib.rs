//! Zenoh bridge for Redfish management endpoints.
//!
//! This bridge periodically queries Redfish services (BMCs), extracts the
//! configured fields from the returned documents, converts them to typed
//! samples and publishes them to Zenoh.
//!
//! # Key Expressions
//!
//! ```text
//! zensight/redfish/<service>/<plugin_instance>/<type>/<type_instance>
//! ```
//!
//! Where:
//! - `<service>` - Service name from configuration (the sample's host)
//! - `<plugin_instance>` - e.g. `Fans`, `Voltages`
//! - `<type>` - Type name, e.g. `fanspeed`, `temperature`
//! - `<type_instance>` - Label of the sample within its type

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod plugin;
pub mod registry;
pub mod selector;
pub mod transport;
pub mod types;
pub mod value;

pub use config::{ConfigNode, ConfigValue, RedfishBridgeConfig, RedfishConfig};
pub use dispatch::{BridgeStatus, Dispatch, DispatchError, ZenohDispatcher};
pub use engine::{CycleStats, Engine, Extraction, extract_query};
pub use error::ConfigError;
pub use loader::{Loaded, load};
pub use plugin::{Collector, RedfishPlugin};
pub use registry::Registry;
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::TypesDb;
