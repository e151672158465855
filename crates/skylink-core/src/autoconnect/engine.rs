// ── Auto-connection engine ──
//
// Wires the arbiter into the engine lifecycle and publishes the
// `AutoConnection` facility while started.

use std::sync::Arc;

use tracing::error;

use super::arbiter::AutoConnectionArbiter;
use super::facade::{AutoConnection, AutoConnectionBackend};
use crate::config::AutoConnectionConfig;
use crate::engine::{Engine, StopRequest, UtilityRegistry};
use crate::error::CoreError;
use crate::store::{DroneStore, RemoteControlStore};

pub struct AutoConnectionEngine {
    arbiter: Arc<AutoConnectionArbiter>,
    config: AutoConnectionConfig,
}

impl AutoConnectionEngine {
    pub const NAME: &'static str = "auto-connection";

    /// Resolves both device stores and registers the [`AutoConnection`]
    /// facility in `registry`.
    pub fn new(registry: &UtilityRegistry, config: AutoConnectionConfig) -> Result<Self, CoreError> {
        let drones = registry.require::<DroneStore>()?;
        let remote_controls = registry.require::<RemoteControlStore>()?;
        let arbiter = AutoConnectionArbiter::new(drones, remote_controls);
        registry.register(Arc::new(arbiter.facade().clone()))?;
        Ok(Self { arbiter, config })
    }

    pub fn auto_connection(&self) -> &AutoConnection {
        self.arbiter.facade()
    }
}

impl Engine for AutoConnectionEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn on_start(&self) {
        if self.config.at_startup {
            self.arbiter.start_auto_connection();
        }
        self.arbiter.facade().publish();
    }

    fn on_stop_requested(&self, request: StopRequest) {
        self.arbiter.facade().unpublish();
        self.arbiter.stop_auto_connection();
        if let Err(err) = request.acknowledge() {
            error!(engine = Self::NAME, error = %err, "failed to acknowledge stop request");
        }
    }
}
