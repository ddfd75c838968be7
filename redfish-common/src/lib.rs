//! Shared types and utilities for the Redfish bridge.
//!
//! - [`sample`] - Sample data model (`SampleKind`, `Sample`, `SampleRecord`)
//! - [`serialization`] - JSON/CBOR payload encoding
//! - [`config`] - Configuration loading (JSON5 format) and logging settings
//! - [`session`] - Zenoh session management
//! - [`keyexpr`] - Key expression builder
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod sample;
pub mod serialization;
pub mod session;

pub use config::{LogFormat, LoggingConfig, ZenohConfig, load_config, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{KEY_PREFIX, KeyExprBuilder, sanitize_chunk};
pub use sample::{PLUGIN_NAME, Sample, SampleKind, SampleRecord};
pub use serialization::{Format, encode};
pub use session::connect;

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` overrides `config.level` when set. Output is either
/// human-readable text or one JSON object per line.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    result.map_err(|e| Error::Logging(e.to_string()))
}
