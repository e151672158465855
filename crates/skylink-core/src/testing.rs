// ── Test support ──
//
// Recording transport used by unit tests across the crate. Accepted
// connects move the device to CONNECTING on the requested connector,
// accepted disconnects move it to DISCONNECTING, synchronously.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use secrecy::SecretString;

use crate::model::{ConnectionDelegate, ConnectionState, DeviceConnector, DeviceCore, DeviceUid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Connect(DeviceUid, DeviceConnector),
    Disconnect(DeviceUid),
}

impl Call {
    pub(crate) fn connect(uid: &str, connector: DeviceConnector) -> Self {
        Self::Connect(DeviceUid::from(uid), connector)
    }

    pub(crate) fn disconnect(uid: &str) -> Self {
        Self::Disconnect(DeviceUid::from(uid))
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    calls: Mutex<Vec<Call>>,
    reject: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns and forgets the calls recorded so far.
    pub(crate) fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub(crate) fn reject_requests(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl ConnectionDelegate for MockTransport {
    fn connect(
        &self,
        device: &DeviceCore,
        connector: &DeviceConnector,
        _credentials: Option<&SecretString>,
    ) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Connect(device.uid().clone(), connector.clone()));
        if self.reject.load(Ordering::SeqCst) {
            return false;
        }
        mock_connecting(device, connector.clone());
        true
    }

    fn disconnect(&self, device: &DeviceCore) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Disconnect(device.uid().clone()));
        if self.reject.load(Ordering::SeqCst) {
            return false;
        }
        mock_disconnecting(device);
        true
    }
}

pub(crate) fn add_connectors(device: &DeviceCore, connectors: &[DeviceConnector]) {
    device.update_state(|s| s.connectors.extend_from_slice(connectors));
}

pub(crate) fn remove_connectors(device: &DeviceCore, connectors: &[DeviceConnector]) {
    device.update_state(|s| s.connectors.retain(|c| !connectors.contains(c)));
}

pub(crate) fn mock_connecting(device: &DeviceCore, connector: DeviceConnector) {
    device.update_state(|s| {
        s.connection_state = ConnectionState::Connecting;
        s.active_connector = Some(connector);
    });
}

pub(crate) fn mock_connected(device: &DeviceCore) {
    device.update_state(|s| s.connection_state = ConnectionState::Connected);
}

pub(crate) fn mock_disconnecting(device: &DeviceCore) {
    device.update_state(|s| s.connection_state = ConnectionState::Disconnecting);
}

pub(crate) fn mock_disconnected(device: &DeviceCore) {
    device.update_state(|s| s.connection_state = ConnectionState::Disconnected);
}
