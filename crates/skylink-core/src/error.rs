// ── Core error types ──
//
// Errors surfaced by skylink-core. Connection requests themselves are
// fire-and-forget booleans; these cover wiring mistakes (stores,
// utilities) and lifecycle protocol violations.

use thiserror::Error;

use crate::model::{DeviceKind, DeviceUid};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Utility registry ─────────────────────────────────────────────
    #[error("Utility not registered: {name}")]
    UtilityMissing { name: &'static str },

    #[error("Utility already registered: {name}")]
    UtilityAlreadyRegistered { name: &'static str },

    // ── Device stores ────────────────────────────────────────────────
    #[error("Device already present: {uid}")]
    DeviceAlreadyPresent { uid: DeviceUid },

    #[error("Device {uid} is a {actual}, store holds {expected} devices")]
    WrongCategory {
        uid: DeviceUid,
        expected: DeviceKind,
        actual: DeviceKind,
    },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Engine lifecycle protocol violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("Engine {engine} acknowledged a stop that was not requested")]
    StopNotRequested { engine: &'static str },

    #[error("Engine {engine} stopped before acknowledging its stop request")]
    StopNotAcknowledged { engine: &'static str },

    #[error("Stop request for engine {engine} is no longer current")]
    StaleStopRequest { engine: &'static str },

    #[error("Engine was dropped before its stop request was acknowledged")]
    EngineDropped,

    #[error("Stop was canceled by a restart before every engine acknowledged")]
    StopCanceled,
}
