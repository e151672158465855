// ── Engine group coordinator ──
//
// Drives a fixed set of engines through a coordinated start, and through
// a stop that completes only once every started engine acknowledged.
// Overlapping stops share a single barrier.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use super::lifecycle::{Engine, EngineLifecycle, LifecycleState};

type Done = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Barrier {
    unacknowledged: HashSet<usize>,
    done: Vec<Done>,
}

type SharedBarrier = Arc<Mutex<Barrier>>;

/// Barrier of the stop currently waiting for acknowledgements, if any.
type InFlight = Arc<Mutex<Option<SharedBarrier>>>;

/// Coordinates the lifecycle of a fixed group of engines.
#[derive(Clone)]
pub struct EngineGroupCoordinator {
    engines: Arc<[EngineLifecycle]>,
    in_flight: InFlight,
}

impl fmt::Debug for EngineGroupCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineGroupCoordinator")
            .field("engines", &self.engines)
            .field("stopping", &lock(&self.in_flight).is_some())
            .finish()
    }
}

impl EngineGroupCoordinator {
    pub fn new(engines: impl IntoIterator<Item = Arc<dyn Engine>>) -> Self {
        Self {
            engines: engines.into_iter().map(EngineLifecycle::new).collect(),
            in_flight: Arc::default(),
        }
    }

    pub fn engines(&self) -> &[EngineLifecycle] {
        &self.engines
    }

    /// Starts every engine, then tells each one that all engines are started.
    pub fn start(&self) {
        info!(engines = self.engines.len(), "starting engines");
        // pending stop callbacks are dropped with the barrier
        *lock(&self.in_flight) = None;
        for engine in self.engines.iter() {
            engine.request_start();
        }
        for engine in self.engines.iter() {
            engine.engine().on_all_engines_started();
        }
    }

    /// Requests every started engine to stop, and calls `done` once all of
    /// them acknowledged, after stopping them.
    ///
    /// A stop issued while a previous one still waits joins it: `done` is
    /// called once the engines of both requests acknowledged.
    ///
    /// If a stop request is canceled by a new [`start`](Self::start) before
    /// the barrier is reached, `done` is dropped without being called.
    pub fn stop(&self, done: impl FnOnce() + Send + 'static) {
        let started: Vec<usize> = self
            .engines
            .iter()
            .enumerate()
            .filter(|(_, engine)| engine.state() == LifecycleState::Started)
            .map(|(index, _)| index)
            .collect();

        let barrier = {
            let mut in_flight = lock(&self.in_flight);
            let joined = in_flight.is_some();
            let barrier = Arc::clone(in_flight.get_or_insert_with(SharedBarrier::default));
            let mut state = lock(&barrier);
            state.unacknowledged.extend(started.iter().copied());
            state.done.push(Box::new(done));
            info!(
                engines = started.len(),
                waiting = state.unacknowledged.len(),
                joined,
                "stopping engines"
            );
            drop(state);
            barrier
        };

        // listeners may run synchronously: no lock is held from here on
        for index in started {
            let barrier = Arc::clone(&barrier);
            let engines = Arc::downgrade(&self.engines);
            let in_flight = Arc::clone(&self.in_flight);
            self.engines[index].request_stop(Some(Box::new(move || {
                {
                    let mut state = lock(&barrier);
                    state.unacknowledged.remove(&index);
                    debug!(remaining = state.unacknowledged.len(), "engine acknowledged stop");
                }
                if let Some(engines) = engines.upgrade() {
                    complete(&engines, &in_flight, &barrier);
                }
            })));
        }

        complete(&self.engines, &self.in_flight, &barrier);
    }

    /// `(name, state)` of every engine, in registration order.
    pub fn states(&self) -> Vec<(&'static str, LifecycleState)> {
        self.engines
            .iter()
            .map(|engine| (engine.name(), engine.state()))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Once `barrier` has no engine left to wait for, detaches it and runs
/// its callbacks after stopping the acknowledged engines. Runs at most once
/// per barrier.
fn complete(
    engines: &[EngineLifecycle],
    in_flight: &Mutex<Option<SharedBarrier>>,
    barrier: &SharedBarrier,
) {
    // same lock order as `stop`, so no callback can join a completed barrier
    let done = {
        let mut slot = lock(in_flight);
        let mut state = lock(barrier);
        if !state.unacknowledged.is_empty() || state.done.is_empty() {
            return;
        }
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, barrier)) {
            slot.take();
        }
        std::mem::take(&mut state.done)
    };
    finalize(engines);
    for done in done {
        done();
    }
}

fn finalize(engines: &[EngineLifecycle]) {
    for engine in engines {
        if engine.state() == LifecycleState::StopAcknowledged {
            if let Err(err) = engine.stop() {
                error!(engine = engine.name(), error = %err, "failed to stop engine");
            }
        }
    }
    info!("all engines stopped");
}
