//! Collector lifecycle.

use std::future::Future;

use tracing::{info, warn};

use crate::config::ConfigNode;
use crate::dispatch::Dispatch;
use crate::engine::{CycleStats, Engine};
use crate::error::ConfigError;
use crate::loader;
use crate::registry::Registry;
use crate::transport::Transport;
use crate::types::TypesDb;

/// A periodically driven collector.
///
/// The host calls [`init`](Collector::init) once, then
/// [`collect_once`](Collector::collect_once) every interval, and finally
/// [`shutdown`](Collector::shutdown).
pub trait Collector {
    /// Build the collector state from its configuration.
    ///
    /// Invalid configuration blocks are skipped with a warning; only fatal
    /// errors are returned.
    fn init(&mut self) -> Result<(), ConfigError>;

    /// Run one collection cycle.
    fn collect_once(&self) -> impl Future<Output = CycleStats> + Send;

    /// Release the collector state.
    fn shutdown(&mut self);
}

/// The Redfish collector: configuration tree in, samples out.
pub struct RedfishPlugin<T, D> {
    blocks: Vec<ConfigNode>,
    types: TypesDb,
    engine: Engine<T, D>,
    registry: Option<Registry>,
    warnings: Vec<ConfigError>,
}

impl<T: Transport, D: Dispatch> RedfishPlugin<T, D> {
    pub fn new(blocks: Vec<ConfigNode>, types: TypesDb, transport: T, dispatcher: D) -> Self {
        Self {
            blocks,
            types,
            engine: Engine::new(transport, dispatcher),
            registry: None,
            warnings: Vec::new(),
        }
    }

    /// The loaded registry, between `init` and `shutdown`.
    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Blocks dropped by the last `init`.
    pub fn warnings(&self) -> &[ConfigError] {
        &self.warnings
    }

    pub fn engine(&self) -> &Engine<T, D> {
        &self.engine
    }
}

impl<T: Transport, D: Dispatch> Collector for RedfishPlugin<T, D> {
    fn init(&mut self) -> Result<(), ConfigError> {
        let loaded = loader::load(&self.blocks, &self.types)?;

        if !loaded.warnings.is_empty() {
            warn!(
                count = loaded.warnings.len(),
                "Some configuration blocks were ignored"
            );
        }

        self.warnings = loaded.warnings;
        self.registry = Some(loaded.registry);
        Ok(())
    }

    async fn collect_once(&self) -> CycleStats {
        match &self.registry {
            Some(registry) => self.engine.collect(registry).await,
            None => {
                warn!("Collection requested while the collector is not initialized");
                CycleStats::default()
            }
        }
    }

    fn shutdown(&mut self) {
        if self.registry.take().is_some() {
            info!("Redfish collector shut down");
        }
    }
}
