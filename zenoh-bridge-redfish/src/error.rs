//! Errors raised while building the collector model from its configuration.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::selector::SelectorError;

/// Configuration error.
///
/// Every variant except [`ConfigError::Allocation`] is recoverable: the loader
/// drops the affected block, logs the error and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{block}: missing required key '{key}'")]
    MissingKey { block: String, key: String },

    #[error("'{key}' expects a {expected} value, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Allocation failed while loading configuration: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("{block}: '{first}' and '{second}' cannot be used together")]
    Conflict {
        block: String,
        first: String,
        second: String,
    },

    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid SelectIDs entry '{value}': ids are positive integers")]
    InvalidId { value: String },

    #[error("Query '{query}' mixes Resource and Attribute blocks")]
    MixedSelection { query: String },

    #[error("Query '{name}' is already defined")]
    DuplicateQuery { name: String },
}

impl ConfigError {
    /// Whether loading must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::Allocation(_))
    }
}

impl From<SelectorError> for ConfigError {
    fn from(err: SelectorError) -> Self {
        ConfigError::InvalidSelector {
            selector: err.selector,
            reason: err.reason,
        }
    }
}
