// ── Device domain types ──
//
// A device (drone or remote control) is created by the transport layer,
// stored in a `DeviceStore`, and mutated only through `update_state`.
// Readers always get an immutable `DeviceState` snapshot.

use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, trace};

use super::connector::{DeviceConnector, Technology};
use super::uid::DeviceUid;

/// Device category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceKind {
    Drone,
    RemoteControl,
}

/// Connection state of a device.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    /// Rank used by auto-connection; higher is better.
    pub fn rank(self) -> u8 {
        match self {
            Self::Connected => 4,
            Self::Connecting => 3,
            Self::Disconnecting => 2,
            Self::Disconnected => 1,
        }
    }

    pub fn is_at_least_connecting(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// Immutable snapshot of a device's connection-related state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub connection_state: ConnectionState,
    /// Connectors currently available to reach the device.
    pub connectors: Vec<DeviceConnector>,
    /// Connector in use; only set while the device is not `Disconnected`.
    pub active_connector: Option<DeviceConnector>,
}

impl DeviceState {
    /// A device is visible when at least one connector can reach it.
    pub fn is_visible(&self) -> bool {
        !self.connectors.is_empty()
    }

    pub fn is_at_least_connecting(&self) -> bool {
        self.connection_state.is_at_least_connecting()
    }

    pub fn can_be_connected(&self) -> bool {
        self.connection_state == ConnectionState::Disconnected && self.is_visible()
    }

    pub fn can_be_disconnected(&self) -> bool {
        self.active_connector.is_some() && self.connection_state.is_at_least_connecting()
    }

    /// Highest technology rank among available connectors, `None` if invisible.
    pub fn best_technology_rank(&self) -> Option<u8> {
        self.connectors.iter().map(DeviceConnector::rank).max()
    }

    /// Whether the active connector is at least as good as every available one.
    ///
    /// A device with no active connector never uses its best connector.
    pub fn uses_best_connector(&self) -> bool {
        let active = self.active_connector.as_ref().map(DeviceConnector::rank);
        active >= self.best_technology_rank() && active.is_some()
    }

    /// Tells whether the device is connected (or connecting) through the
    /// remote control `rc`.
    pub fn is_connected_through(&self, rc: &DeviceUid) -> bool {
        self.active_connector
            .as_ref()
            .is_some_and(|connector| connector.goes_through(rc))
    }

    /// Tells whether the device is connected (or connecting) with a connector
    /// other than the remote control `rc`.
    pub fn is_connected_but_not_through(&self, rc: &DeviceUid) -> bool {
        self.active_connector
            .as_ref()
            .is_some_and(|connector| !connector.goes_through(rc))
    }

    /// Advertised connector going through the remote control `rc`, if any.
    pub fn connector_through(&self, rc: &DeviceUid) -> Option<&DeviceConnector> {
        self.connectors
            .iter()
            .find(|connector| connector.goes_through(rc))
    }

    /// Picks the connector used when connecting without an explicit choice.
    ///
    /// A single available connector is always used. Otherwise, the first
    /// family present among remote-control, local USB and local Wi-Fi
    /// connectors is used if it has exactly one member.
    pub fn default_connector(&self) -> Option<&DeviceConnector> {
        if let [only] = self.connectors.as_slice() {
            return Some(only);
        }
        let families: [fn(&DeviceConnector) -> bool; 3] = [
            |c| !c.is_local(),
            |c| c.is_local() && c.technology == Technology::Usb,
            |c| c.is_local() && c.technology == Technology::Wifi,
        ];
        for family in families {
            let mut members = self.connectors.iter().filter(|c| family(c));
            if let Some(first) = members.next() {
                return members.next().is_none().then_some(first);
            }
        }
        None
    }

    fn normalize(&mut self) {
        let mut seen: Vec<DeviceConnector> = Vec::with_capacity(self.connectors.len());
        for connector in self.connectors.drain(..) {
            if !seen.contains(&connector) {
                seen.push(connector);
            }
        }
        self.connectors = seen;
        if self.connection_state == ConnectionState::Disconnected {
            self.active_connector = None;
        }
    }
}

// ── Transport seam ───────────────────────────────────────────────

/// Transport-side implementation of connect / disconnect.
///
/// Both calls are fire-and-forget: returning `true` only means the request
/// was accepted. Progress is reported by mutating the device through
/// [`DeviceCore::update_state`], possibly synchronously from within the call.
pub trait ConnectionDelegate: Send + Sync {
    fn connect(
        &self,
        device: &DeviceCore,
        connector: &DeviceConnector,
        credentials: Option<&SecretString>,
    ) -> bool;

    fn disconnect(&self, device: &DeviceCore) -> bool;
}

pub(crate) type UpdateListener = Box<dyn Fn(&DeviceCore) + Send + Sync>;

// ── DeviceCore ───────────────────────────────────────────────────

/// A drone or remote control, shared as `Arc<DeviceCore>`.
pub struct DeviceCore {
    uid: DeviceUid,
    kind: DeviceKind,
    name: String,
    state: ArcSwap<DeviceState>,
    delegate: Arc<dyn ConnectionDelegate>,
    /// Installed by the owning store.
    listener: ArcSwapOption<UpdateListener>,
}

impl DeviceCore {
    pub fn new(
        kind: DeviceKind,
        uid: impl Into<DeviceUid>,
        name: impl Into<String>,
        delegate: Arc<dyn ConnectionDelegate>,
    ) -> Self {
        Self {
            uid: uid.into(),
            kind,
            name: name.into(),
            state: ArcSwap::from_pointee(DeviceState::default()),
            delegate,
            listener: ArcSwapOption::empty(),
        }
    }

    pub fn drone(
        uid: impl Into<DeviceUid>,
        name: impl Into<String>,
        delegate: Arc<dyn ConnectionDelegate>,
    ) -> Self {
        Self::new(DeviceKind::Drone, uid, name, delegate)
    }

    pub fn remote_control(
        uid: impl Into<DeviceUid>,
        name: impl Into<String>,
        delegate: Arc<dyn ConnectionDelegate>,
    ) -> Self {
        Self::new(DeviceKind::RemoteControl, uid, name, delegate)
    }

    pub fn uid(&self) -> &DeviceUid {
        &self.uid
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<DeviceState> {
        self.state.load_full()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.load().connection_state
    }

    pub fn active_connector(&self) -> Option<DeviceConnector> {
        self.state.load().active_connector.clone()
    }

    pub fn connectors(&self) -> Vec<DeviceConnector> {
        self.state.load().connectors.clone()
    }

    pub fn can_be_connected(&self) -> bool {
        self.state.load().can_be_connected()
    }

    pub fn can_be_disconnected(&self) -> bool {
        self.state.load().can_be_disconnected()
    }

    /// Requests a connection.
    ///
    /// With no explicit connector, [`DeviceState::default_connector`] picks
    /// one; if none qualifies the request is refused.
    pub fn connect(
        &self,
        connector: Option<&DeviceConnector>,
        credentials: Option<&SecretString>,
    ) -> bool {
        let state = self.state();
        let Some(connector) = connector.or_else(|| state.default_connector()) else {
            debug!(uid = %self.uid, "no unambiguous connector to connect with");
            return false;
        };
        self.delegate.connect(self, connector, credentials)
    }

    /// Requests a disconnection, or cancels an ongoing connection.
    pub fn disconnect(&self) -> bool {
        self.delegate.disconnect(self)
    }

    /// Applies `update` to a copy of the current state and publishes it.
    ///
    /// The owning store is notified only when the normalized state differs
    /// from the previous one. Returns whether anything changed.
    pub fn update_state(&self, update: impl FnOnce(&mut DeviceState)) -> bool {
        let current = self.state.load_full();
        let mut next = (*current).clone();
        update(&mut next);
        next.normalize();
        if next == *current {
            return false;
        }
        trace!(uid = %self.uid, state = %next.connection_state, "device state updated");
        self.state.store(Arc::new(next));
        if let Some(listener) = self.listener.load_full() {
            listener(self);
        }
        true
    }

    pub(crate) fn set_listener(&self, listener: Option<UpdateListener>) {
        self.listener.store(listener.map(Arc::new));
    }
}

impl fmt::Debug for DeviceCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCore")
            .field("uid", &self.uid)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("state", &*self.state.load())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    fn state_with(connectors: Vec<DeviceConnector>) -> DeviceState {
        DeviceState {
            connectors,
            ..DeviceState::default()
        }
    }

    #[test]
    fn invisible_device_cannot_be_connected() {
        let state = DeviceState::default();
        assert!(!state.is_visible());
        assert!(!state.can_be_connected());
        assert_eq!(state.best_technology_rank(), None);
    }

    #[test]
    fn disconnect_requires_active_connector() {
        let mut state = state_with(vec![DeviceConnector::local(Technology::Wifi)]);
        state.connection_state = ConnectionState::Connected;
        assert!(!state.can_be_disconnected());

        state.active_connector = Some(DeviceConnector::local(Technology::Wifi));
        assert!(state.can_be_disconnected());

        state.connection_state = ConnectionState::Disconnecting;
        assert!(!state.can_be_disconnected());
    }

    #[test]
    fn uses_best_connector_compares_ranks() {
        let mut state = state_with(vec![
            DeviceConnector::local(Technology::Ble),
            DeviceConnector::local(Technology::Wifi),
        ]);
        assert!(!state.uses_best_connector());

        state.active_connector = Some(DeviceConnector::local(Technology::Ble));
        assert!(!state.uses_best_connector());

        state.active_connector = Some(DeviceConnector::local(Technology::Wifi));
        assert!(state.uses_best_connector());
    }

    #[test]
    fn default_connector_prefers_single_connector() {
        let state = state_with(vec![DeviceConnector::local(Technology::Ble)]);
        assert_eq!(
            state.default_connector(),
            Some(&DeviceConnector::local(Technology::Ble))
        );
    }

    #[test]
    fn default_connector_picks_wifi_over_ble() {
        let state = state_with(vec![
            DeviceConnector::local(Technology::Ble),
            DeviceConnector::local(Technology::Wifi),
        ]);
        assert_eq!(
            state.default_connector(),
            Some(&DeviceConnector::local(Technology::Wifi))
        );
    }

    #[test]
    fn default_connector_picks_remote_control_first() {
        let state = state_with(vec![
            DeviceConnector::local(Technology::Usb),
            DeviceConnector::remote_control("rc-1"),
        ]);
        assert_eq!(
            state.default_connector(),
            Some(&DeviceConnector::remote_control("rc-1"))
        );
    }

    #[test]
    fn default_connector_refuses_ambiguity() {
        let state = state_with(vec![
            DeviceConnector::remote_control("rc-1"),
            DeviceConnector::remote_control("rc-2"),
            DeviceConnector::local(Technology::Usb),
        ]);
        assert_eq!(state.default_connector(), None);
    }

    #[test]
    fn update_state_dedupes_and_clears_active_connector() {
        let transport = MockTransport::new();
        let device = DeviceCore::drone("A", "A", transport.clone());

        device.update_state(|s| {
            s.connectors = vec![
                DeviceConnector::local(Technology::Wifi),
                DeviceConnector::local(Technology::Wifi),
            ];
            s.connection_state = ConnectionState::Connected;
            s.active_connector = Some(DeviceConnector::local(Technology::Wifi));
        });
        assert_eq!(device.connectors().len(), 1);
        assert!(device.active_connector().is_some());

        device.update_state(|s| s.connection_state = ConnectionState::Disconnected);
        assert!(device.active_connector().is_none());
    }

    #[test]
    fn update_state_reports_no_change() {
        let transport = MockTransport::new();
        let device = DeviceCore::drone("A", "A", transport.clone());
        assert!(device.update_state(|s| s.connectors.push(DeviceConnector::local(Technology::Ble))));
        assert!(!device.update_state(|s| s.connection_state = ConnectionState::Disconnected));
    }

    #[test]
    fn connect_without_connector_uses_default() {
        let transport = MockTransport::new();
        let device = DeviceCore::drone("A", "A", transport.clone());
        device.update_state(|s| {
            s.connectors = vec![
                DeviceConnector::local(Technology::Ble),
                DeviceConnector::local(Technology::Wifi),
            ];
        });

        assert!(device.connect(None, None));
        assert_eq!(device.connection_state(), ConnectionState::Connecting);
        assert_eq!(
            device.active_connector(),
            Some(DeviceConnector::local(Technology::Wifi))
        );
    }

    #[test]
    fn connect_is_refused_without_connector() {
        let transport = MockTransport::new();
        let device = DeviceCore::drone("A", "A", transport.clone());
        assert!(!device.connect(None, None));
        assert!(transport.calls().is_empty());
    }
}
