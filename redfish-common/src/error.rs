use thiserror::Error;

/// Error type shared by the redfish bridge crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid bridge file or Zenoh settings.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    #[error("Failed to encode payload as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode payload as CBOR: {0}")]
    Cbor(#[from] ciborium::ser::Error<std::io::Error>),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
