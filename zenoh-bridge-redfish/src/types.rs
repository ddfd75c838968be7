//! Type name table, the equivalent of collectd's `types.db`.

use std::collections::HashMap;

use redfish_common::SampleKind;

use crate::error::ConfigError;

/// Single data source types shipped with collectd that are relevant to
/// Redfish hardware telemetry.
const BUILTIN_TYPES: &[(&str, SampleKind)] = &[
    ("absolute", SampleKind::Absolute),
    ("bytes", SampleKind::Gauge),
    ("capacity", SampleKind::Gauge),
    ("count", SampleKind::Gauge),
    ("counter", SampleKind::Counter),
    ("current", SampleKind::Gauge),
    ("derive", SampleKind::Derive),
    ("energy", SampleKind::Gauge),
    ("fanspeed", SampleKind::Gauge),
    ("frequency", SampleKind::Gauge),
    ("gauge", SampleKind::Gauge),
    ("humidity", SampleKind::Gauge),
    ("percent", SampleKind::Gauge),
    ("power", SampleKind::Gauge),
    ("pressure", SampleKind::Gauge),
    ("temperature", SampleKind::Gauge),
    ("total_energy_wh", SampleKind::Counter),
    ("uptime", SampleKind::Gauge),
    ("voltage", SampleKind::Gauge),
];

/// Maps type names to the kind of their data source.
#[derive(Debug, Clone, PartialEq)]
pub struct TypesDb {
    kinds: HashMap<String, SampleKind>,
}

impl Default for TypesDb {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypesDb {
    /// Table with the built-in types only.
    pub fn builtin() -> Self {
        Self {
            kinds: BUILTIN_TYPES
                .iter()
                .map(|(name, kind)| (name.to_string(), *kind))
                .collect(),
        }
    }

    /// Built-in types extended (or overridden) by `overrides`.
    pub fn with_overrides(overrides: &HashMap<String, SampleKind>) -> Self {
        let mut db = Self::builtin();
        for (name, kind) in overrides {
            db.insert(name.clone(), *kind);
        }
        db
    }

    pub fn insert(&mut self, name: impl Into<String>, kind: SampleKind) {
        self.kinds.insert(name.into(), kind);
    }

    /// Kind of `name`. Type names are case-sensitive.
    pub fn lookup(&self, name: &str) -> Result<SampleKind, ConfigError> {
        self.kinds
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownType {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
