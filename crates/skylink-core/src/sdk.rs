// ── SDK root ──
//
// Owns the utility registry, both device stores and the engine group.
// The transport layer adds devices to the stores; the application
// observes the auto-connection facility.

use std::sync::{Arc, Weak};

use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use crate::autoconnect::{AutoConnection, AutoConnectionEngine};
use crate::config::SdkConfig;
use crate::engine::{Engine, EngineGroupCoordinator, LifecycleState, UtilityRegistry};
use crate::error::{CoreError, LifecycleError};
use crate::store::{DroneStore, RemoteControlStore};

// ── SdkState ─────────────────────────────────────────────────────

/// Overall SDK state observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SdkState {
    #[default]
    Stopped,
    Started,
    /// Waiting for engines to acknowledge their stop request.
    Stopping,
}

// ── Builder ──────────────────────────────────────────────────────

type EngineFactory = Box<dyn FnOnce(&UtilityRegistry) -> Result<Arc<dyn Engine>, CoreError>>;

/// Assembles an [`Sdk`]: built-in stores and engines, plus any extra
/// engines supplied by the application.
pub struct SdkBuilder {
    config: SdkConfig,
    factories: Vec<EngineFactory>,
}

impl SdkBuilder {
    /// Adds an engine built from the registry once every store is registered.
    ///
    /// Engines are started in the order they are added, after the built-in
    /// auto-connection engine.
    pub fn with_engine<E, F>(mut self, factory: F) -> Self
    where
        E: Engine,
        F: FnOnce(&UtilityRegistry) -> Result<E, CoreError> + 'static,
    {
        self.factories.push(Box::new(move |registry: &UtilityRegistry| {
            factory(registry).map(|engine| Arc::new(engine) as Arc<dyn Engine>)
        }));
        self
    }

    pub fn build(self) -> Result<Sdk, CoreError> {
        let registry = Arc::new(UtilityRegistry::new());
        let drones = DroneStore::new();
        let remote_controls = RemoteControlStore::new();
        registry.register(Arc::clone(&drones))?;
        registry.register(Arc::clone(&remote_controls))?;

        let auto_connection =
            AutoConnectionEngine::new(&registry, self.config.auto_connection.clone())?;
        let facade = auto_connection.auto_connection().clone();

        let mut engines: Vec<Arc<dyn Engine>> = vec![Arc::new(auto_connection)];
        for factory in self.factories {
            engines.push(factory(&registry)?);
        }

        let (state, _) = watch::channel(SdkState::Stopped);
        Ok(Sdk {
            inner: Arc::new(SdkInner {
                config: self.config,
                registry,
                drones,
                remote_controls,
                coordinator: EngineGroupCoordinator::new(engines),
                auto_connection: facade,
                state,
            }),
        })
    }
}

// ── Sdk ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SdkInner>`.
#[derive(Clone)]
pub struct Sdk {
    inner: Arc<SdkInner>,
}

struct SdkInner {
    config: SdkConfig,
    registry: Arc<UtilityRegistry>,
    drones: Arc<DroneStore>,
    remote_controls: Arc<RemoteControlStore>,
    coordinator: EngineGroupCoordinator,
    auto_connection: AutoConnection,
    state: watch::Sender<SdkState>,
}

impl Sdk {
    pub fn builder(config: SdkConfig) -> SdkBuilder {
        SdkBuilder {
            config,
            factories: Vec::new(),
        }
    }

    /// Builds an SDK with only the built-in engines.
    pub fn new(config: SdkConfig) -> Result<Self, CoreError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &SdkConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<UtilityRegistry> {
        &self.inner.registry
    }

    pub fn drones(&self) -> &Arc<DroneStore> {
        &self.inner.drones
    }

    pub fn remote_controls(&self) -> &Arc<RemoteControlStore> {
        &self.inner.remote_controls
    }

    pub fn auto_connection(&self) -> &AutoConnection {
        &self.inner.auto_connection
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub fn state(&self) -> SdkState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SdkState> {
        self.inner.state.subscribe()
    }

    /// `(engine name, lifecycle state)` of every engine.
    pub fn engine_states(&self) -> Vec<(&'static str, LifecycleState)> {
        self.inner.coordinator.states()
    }

    /// Starts every engine. Also cancels a stop still waiting on engines.
    pub fn start(&self) {
        info!("starting sdk");
        self.inner.state.send_replace(SdkState::Started);
        self.inner.coordinator.start();
    }

    /// Stops every engine and calls `done` once all of them are stopped.
    pub fn stop_with(&self, done: impl FnOnce() + Send + 'static) {
        info!("stopping sdk");
        self.inner.state.send_replace(SdkState::Stopping);
        let inner: Weak<SdkInner> = Arc::downgrade(&self.inner);
        self.inner.coordinator.stop(move || {
            if let Some(inner) = inner.upgrade() {
                inner.state.send_replace(SdkState::Stopped);
            }
            info!("sdk stopped");
            done();
        });
    }

    /// Stops every engine, waiting for all of them to acknowledge.
    ///
    /// Fails if the stop gets canceled by a [`start`](Self::start) first.
    pub async fn stop(&self) -> Result<(), CoreError> {
        let (tx, rx) = oneshot::channel();
        self.stop_with(move || {
            let _ = tx.send(());
        });
        rx.await.map_err(|_| {
            warn!("sdk stop canceled");
            CoreError::from(LifecycleError::StopCanceled)
        })
    }
}

impl std::fmt::Debug for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sdk")
            .field("state", &self.state())
            .field("drones", &self.inner.drones.len())
            .field("remote_controls", &self.inner.remote_controls.len())
            .finish_non_exhaustive()
    }
}
