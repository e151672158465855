// ── Auto-connection facility ──
//
// Read model published to the application: status plus the selected
// drone and remote control. Changes are pushed through a `watch` channel
// and only sent when the snapshot actually differs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::model::{ConnectionState, DeviceCore, DeviceUid};

/// Whether auto-connection is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AutoConnectionStatus {
    #[default]
    Stopped,
    Started,
}

/// A device picked by auto-connection, as seen when last published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedDevice {
    pub uid: DeviceUid,
    pub name: String,
    pub connection_state: ConnectionState,
}

impl SelectedDevice {
    pub fn of(device: &DeviceCore) -> Self {
        Self {
            uid: device.uid().clone(),
            name: device.name().to_owned(),
            connection_state: device.connection_state(),
        }
    }
}

/// Published auto-connection snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoConnectionState {
    pub status: AutoConnectionStatus,
    pub drone: Option<SelectedDevice>,
    pub remote_control: Option<SelectedDevice>,
}

/// Start/stop toggles implemented by the arbiter.
pub trait AutoConnectionBackend: Send + Sync {
    /// Returns `false` if auto-connection was already started.
    fn start_auto_connection(&self) -> bool;

    /// Returns `false` if auto-connection was already stopped.
    fn stop_auto_connection(&self) -> bool;
}

struct Inner {
    state: watch::Sender<AutoConnectionState>,
    published: AtomicBool,
    backend: Weak<dyn AutoConnectionBackend>,
}

/// Application-facing auto-connection facility.
///
/// Cheaply cloneable; every clone observes the same state.
#[derive(Clone)]
pub struct AutoConnection {
    inner: Arc<Inner>,
}

impl AutoConnection {
    pub(crate) fn new(backend: Weak<dyn AutoConnectionBackend>) -> Self {
        let (state, _) = watch::channel(AutoConnectionState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                published: AtomicBool::new(false),
                backend,
            }),
        }
    }

    // ── Publication ──────────────────────────────────────────────────

    /// Whether the facility is currently available to the application.
    pub fn is_published(&self) -> bool {
        self.inner.published.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self) {
        if !self.inner.published.swap(true, Ordering::AcqRel) {
            info!("auto-connection facility published");
        }
    }

    pub(crate) fn unpublish(&self) {
        if self.inner.published.swap(false, Ordering::AcqRel) {
            info!("auto-connection facility unpublished");
        }
    }

    // ── Read model ───────────────────────────────────────────────────

    pub fn status(&self) -> AutoConnectionStatus {
        self.inner.state.borrow().status
    }

    pub fn drone(&self) -> Option<SelectedDevice> {
        self.inner.state.borrow().drone.clone()
    }

    pub fn remote_control(&self) -> Option<SelectedDevice> {
        self.inner.state.borrow().remote_control.clone()
    }

    pub fn snapshot(&self) -> AutoConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<AutoConnectionState> {
        self.inner.state.subscribe()
    }

    /// Replaces the published snapshot; subscribers are notified only when
    /// it differs. Returns whether it did.
    pub(crate) fn update(&self, next: AutoConnectionState) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(status = %self.status(), "auto-connection state changed");
        }
        changed
    }

    // ── Control ──────────────────────────────────────────────────────

    /// Starts auto-connection. Returns `false` if it was already started.
    pub fn start(&self) -> bool {
        self.inner
            .backend
            .upgrade()
            .is_some_and(|backend| backend.start_auto_connection())
    }

    /// Stops auto-connection. Returns `false` if it was already stopped.
    ///
    /// Connected devices stay connected.
    pub fn stop(&self) -> bool {
        self.inner
            .backend
            .upgrade()
            .is_some_and(|backend| backend.stop_auto_connection())
    }
}

impl std::fmt::Debug for AutoConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoConnection")
            .field("published", &self.is_published())
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
