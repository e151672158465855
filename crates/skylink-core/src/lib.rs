//! Engine lifecycle and automatic connection arbitration for drones and
//! their remote controls.
//!
//! - **[`Sdk`]**: root object owning the [`UtilityRegistry`], both device
//!   stores and the engine group. [`start()`](Sdk::start) starts every
//!   engine; [`stop()`](Sdk::stop) waits until every engine acknowledged its
//!   stop request.
//!
//! - **Engine framework** ([`engine`]): the [`Engine`] trait with default
//!   hooks, the four-state [`EngineLifecycle`] and the
//!   [`EngineGroupCoordinator`] stop barrier.
//!
//! - **[`DeviceStore`]**: `DashMap`-backed per-category storage with
//!   [`DeviceMonitor`] callbacks and a `watch` version counter.
//!
//! - **Auto-connection** ([`autoconnect`]): the [`AutoConnectionArbiter`]
//!   keeps at most one remote control and one drone connected, ranked by
//!   [`RankingPolicy`], and publishes its choice through the
//!   [`AutoConnection`] facility.
//!
//! - **Domain model** ([`model`]): [`DeviceCore`] with immutable
//!   [`DeviceState`] snapshots. Transports implement [`ConnectionDelegate`].

pub mod autoconnect;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod sdk;
pub mod store;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use autoconnect::{
    AutoConnection, AutoConnectionArbiter, AutoConnectionEngine, AutoConnectionState,
    AutoConnectionStatus, RankingPolicy, SelectedDevice,
};
pub use config::{AutoConnectionConfig, SdkConfig};
pub use engine::{
    Engine, EngineGroupCoordinator, EngineLifecycle, LifecycleState, StopRequest,
    UtilityRegistry,
};
pub use error::{CoreError, LifecycleError};
pub use model::{
    ConnectionDelegate, ConnectionState, ConnectorKind, DeviceConnector, DeviceCore, DeviceKind,
    DeviceState, DeviceUid, Technology,
};
pub use sdk::{Sdk, SdkBuilder, SdkState};
pub use store::{DeviceMonitor, DeviceStore, DroneStore, RemoteControlStore};
