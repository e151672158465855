// ── Engine lifecycle ──
//
// Four-state machine shared by every engine. Transitions are driven by
// the coordinator (start, stop request, final stop) and by the engine
// itself (acknowledging a stop request, possibly later).

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use strum::Display;
use tracing::{error, info, warn};

use crate::error::LifecycleError;

/// Lifecycle state of one engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Started,
    StopRequested,
    StopAcknowledged,
}

/// Invoked once when an engine acknowledges a stop request.
pub type StopListener = Box<dyn FnOnce() + Send>;

/// A unit of SDK functionality with a coordinated start/stop contract.
///
/// Every hook runs without any lifecycle lock held, so hooks may call back
/// into the lifecycle (typically to acknowledge a stop request).
pub trait Engine: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// The engine was started.
    fn on_start(&self) {}

    /// Every engine of the group has been started.
    fn on_all_engines_started(&self) {}

    /// The engine is requested to stop.
    ///
    /// Acknowledges immediately by default. Engines needing to defer can keep
    /// the request and acknowledge it later.
    fn on_stop_requested(&self, request: StopRequest) {
        if let Err(err) = request.acknowledge() {
            error!(engine = self.name(), error = %err, "failed to acknowledge stop request");
        }
    }

    /// A pending stop request was canceled by a new start request.
    fn on_stop_request_canceled(&self) {}

    /// The engine is finally stopped.
    fn on_stop(&self) {}
}

struct Inner {
    state: LifecycleState,
    listener: Option<StopListener>,
    /// Bumped on every start and stop request so that stale acknowledgements
    /// are caught.
    generation: u64,
}

struct Shared {
    engine: Arc<dyn Engine>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn name(&self) -> &'static str {
        self.engine.name()
    }

    fn acknowledge(&self, generation: Option<u64>) -> Result<(), LifecycleError> {
        let listener = {
            let mut inner = self.lock();
            if generation.is_some_and(|g| g != inner.generation) {
                warn!(engine = self.name(), "stale stop request acknowledged");
                return Err(LifecycleError::StaleStopRequest {
                    engine: self.name(),
                });
            }
            if inner.state != LifecycleState::StopRequested {
                error!(engine = self.name(), state = %inner.state, "stop acknowledged without request");
                debug_assert_eq!(
                    inner.state,
                    LifecycleState::StopRequested,
                    "engine {} acknowledged a stop without request",
                    self.name()
                );
                return Err(LifecycleError::StopNotRequested {
                    engine: self.name(),
                });
            }
            inner.state = LifecycleState::StopAcknowledged;
            inner.listener.take()
        };
        info!(engine = self.name(), "stop acknowledged");
        if let Some(listener) = listener {
            listener();
        }
        Ok(())
    }
}

/// Handle given to [`Engine::on_stop_requested`].
///
/// Acknowledging a request that has since been canceled fails with
/// [`LifecycleError::StaleStopRequest`].
#[derive(Clone)]
pub struct StopRequest {
    shared: Weak<Shared>,
    generation: u64,
}

impl StopRequest {
    pub fn acknowledge(&self) -> Result<(), LifecycleError> {
        let shared = self.shared.upgrade().ok_or(LifecycleError::EngineDropped)?;
        shared.acknowledge(Some(self.generation))
    }
}

impl fmt::Debug for StopRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopRequest")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Lifecycle driver wrapping one engine.
#[derive(Clone)]
pub struct EngineLifecycle {
    shared: Arc<Shared>,
}

enum StartHook {
    Start,
    CancelStop,
}

impl EngineLifecycle {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                inner: Mutex::new(Inner {
                    state: LifecycleState::Stopped,
                    listener: None,
                    generation: 0,
                }),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name()
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.shared.engine
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.lock().state
    }

    pub fn is_requested_to_stop(&self) -> bool {
        self.state() == LifecycleState::StopRequested
    }

    pub fn is_stopped_or_acknowledged(&self) -> bool {
        matches!(
            self.state(),
            LifecycleState::Stopped | LifecycleState::StopAcknowledged
        )
    }

    /// Starts the engine, or cancels its pending stop request.
    pub fn request_start(&self) {
        let hook = {
            let mut inner = self.shared.lock();
            match inner.state {
                LifecycleState::Stopped | LifecycleState::StopAcknowledged => {
                    inner.state = LifecycleState::Started;
                    inner.generation = inner.generation.wrapping_add(1);
                    Some(StartHook::Start)
                }
                LifecycleState::StopRequested => {
                    inner.state = LifecycleState::Started;
                    inner.listener = None;
                    inner.generation = inner.generation.wrapping_add(1);
                    Some(StartHook::CancelStop)
                }
                LifecycleState::Started => None,
            }
        };
        match hook {
            Some(StartHook::Start) => {
                info!(engine = self.name(), "engine started");
                self.shared.engine.on_start();
            }
            Some(StartHook::CancelStop) => {
                info!(engine = self.name(), "stop request canceled");
                self.shared.engine.on_stop_request_canceled();
            }
            None => {}
        }
    }

    /// Requests the engine to stop. Only has an effect on a started engine.
    ///
    /// `listener` fires once the engine acknowledges; it is dropped if the
    /// request gets canceled.
    pub fn request_stop(&self, listener: Option<StopListener>) {
        let generation = {
            let mut inner = self.shared.lock();
            if inner.state != LifecycleState::Started {
                return;
            }
            inner.state = LifecycleState::StopRequested;
            inner.listener = listener;
            inner.generation = inner.generation.wrapping_add(1);
            inner.generation
        };
        info!(engine = self.name(), "stop requested");
        self.shared.engine.on_stop_requested(StopRequest {
            shared: Arc::downgrade(&self.shared),
            generation,
        });
    }

    /// Acknowledges the current stop request, whatever its generation.
    pub fn acknowledge_stop_request(&self) -> Result<(), LifecycleError> {
        self.shared.acknowledge(None)
    }

    /// Finally stops an engine that acknowledged its stop request.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        {
            let mut inner = self.shared.lock();
            if inner.state != LifecycleState::StopAcknowledged {
                error!(engine = self.name(), state = %inner.state, "stop without acknowledgement");
                debug_assert_eq!(
                    inner.state,
                    LifecycleState::StopAcknowledged,
                    "engine {} stopped without acknowledgement",
                    self.name()
                );
                return Err(LifecycleError::StopNotAcknowledged {
                    engine: self.name(),
                });
            }
            inner.state = LifecycleState::Stopped;
        }
        info!(engine = self.name(), "engine stopped");
        self.shared.engine.on_stop();
        Ok(())
    }
}

impl fmt::Debug for EngineLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLifecycle")
            .field("engine", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
