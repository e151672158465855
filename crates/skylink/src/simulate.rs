//! Scenario replay against a real `Sdk` with a simulated transport.
//!
//! The transport accepts every request on a connector the device still
//! has: connect moves the device to CONNECTING, disconnect to
//! DISCONNECTING. `settle` steps complete those transitions.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use secrecy::SecretString;
use skylink_core::{
    AutoConnectionState, ConnectionDelegate, ConnectionState, DeviceConnector, DeviceCore,
    DeviceKind, DeviceUid, Sdk, SdkConfig,
};

use crate::error::CliError;
use crate::scenario::{self, DeviceSpec, Scenario, Step};

/// Upper bound on settle rounds; each round may trigger new requests.
const MAX_SETTLE_ROUNDS: usize = 16;

// ── Transport ───────────────────────────────────────────────────────

/// A request the SDK issued to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportRequest {
    pub device: DeviceUid,
    /// `connect <connector>` or `disconnect`.
    pub request: String,
}

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    requests: Mutex<Vec<TransportRequest>>,
}

impl SimulatedTransport {
    fn record(&self, device: &DeviceCore, request: String) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TransportRequest {
                device: device.uid().clone(),
                request,
            });
    }

    /// Drains the requests recorded since the last call.
    pub fn take_requests(&self) -> Vec<TransportRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ConnectionDelegate for SimulatedTransport {
    fn connect(
        &self,
        device: &DeviceCore,
        connector: &DeviceConnector,
        _credentials: Option<&SecretString>,
    ) -> bool {
        if !device.state().connectors.contains(connector) {
            debug!(uid = %device.uid(), %connector, "connect refused, connector unavailable");
            return false;
        }
        self.record(device, format!("connect {connector}"));
        device.update_state(|state| {
            state.connection_state = ConnectionState::Connecting;
            state.active_connector = Some(connector.clone());
        });
        true
    }

    fn disconnect(&self, device: &DeviceCore) -> bool {
        if device.connection_state() == ConnectionState::Disconnected {
            return false;
        }
        self.record(device, "disconnect".into());
        device.update_state(|state| state.connection_state = ConnectionState::Disconnecting);
        true
    }
}

// ── Frames ──────────────────────────────────────────────────────────

/// What the world looks like after one step.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub step: usize,
    pub action: String,
    pub auto_connection: AutoConnectionState,
    /// Requests issued to the transport during the step.
    pub requests: Vec<TransportRequest>,
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub kind: DeviceKind,
    pub uid: DeviceUid,
    pub name: String,
    pub state: ConnectionState,
    pub active: Option<String>,
    pub connectors: Vec<String>,
}

impl DeviceSnapshot {
    fn of(device: &DeviceCore) -> Self {
        let state = device.state();
        Self {
            kind: device.kind(),
            uid: device.uid().clone(),
            name: device.name().to_owned(),
            state: state.connection_state,
            active: state.active_connector.as_ref().map(ToString::to_string),
            connectors: state.connectors.iter().map(ToString::to_string).collect(),
        }
    }
}

// ── Simulator ───────────────────────────────────────────────────────

pub struct Simulator {
    sdk: Sdk,
    transport: Arc<SimulatedTransport>,
}

impl Simulator {
    /// Builds the SDK and seeds both stores. Nothing is started yet.
    pub fn new(scenario: &Scenario, config: SdkConfig) -> Result<Self, CliError> {
        let sdk = Sdk::new(config)?;
        let transport = Arc::new(SimulatedTransport::default());

        for spec in &scenario.drones {
            let device = seed(DeviceKind::Drone, spec, &transport)?;
            sdk.drones().add(device)?;
        }
        for spec in &scenario.remote_controls {
            let device = seed(DeviceKind::RemoteControl, spec, &transport)?;
            sdk.remote_controls().add(device)?;
        }

        Ok(Self { sdk, transport })
    }

    /// Starts the SDK; frame 0.
    pub fn start(&self) -> Frame {
        self.sdk.start();
        self.frame(0, "sdk start".into())
    }

    /// Applies step `index` (1-based) and captures the outcome.
    pub fn apply(&self, index: usize, step: &Step) -> Result<Frame, CliError> {
        info!(step = index, action = %step, "applying step");
        match step {
            Step::Start => {
                if !self.sdk.auto_connection().start() {
                    debug!("auto-connection already started");
                }
            }
            Step::Stop => {
                if !self.sdk.auto_connection().stop() {
                    debug!("auto-connection already stopped");
                }
            }
            Step::Settle => self.settle(),
            Step::AddConnector { device, connector } => {
                let device = self.find(index, device)?;
                let connector = scenario::parse_connector(connector)?;
                device.update_state(|state| state.connectors.push(connector));
            }
            Step::RemoveConnector { device, connector } => {
                let device = self.find(index, device)?;
                let connector = scenario::parse_connector(connector)?;
                device.update_state(|state| {
                    state.connectors.retain(|c| c != &connector);
                    if state.active_connector.as_ref() == Some(&connector) {
                        state.connection_state = ConnectionState::Disconnected;
                    }
                });
            }
            Step::Connected { device, connector } => {
                let device = self.find(index, device)?;
                let connector = resolve_connector(&device, connector.as_deref())?;
                device.update_state(|state| {
                    state.connection_state = ConnectionState::Connected;
                    state.active_connector = Some(connector);
                });
            }
            Step::Disconnected { device } => {
                let device = self.find(index, device)?;
                device.update_state(|state| state.connection_state = ConnectionState::Disconnected);
            }
            Step::Remove { device } => {
                let device = self.find(index, device)?;
                match device.kind() {
                    DeviceKind::Drone => self.sdk.drones().remove(device.uid()),
                    DeviceKind::RemoteControl => self.sdk.remote_controls().remove(device.uid()),
                };
            }
        }
        Ok(self.frame(index, step.to_string()))
    }

    /// Stops the SDK and waits for every engine to acknowledge.
    pub async fn finish(self) -> Result<(), CliError> {
        self.sdk.stop().await?;
        Ok(())
    }

    fn devices(&self) -> Vec<Arc<DeviceCore>> {
        let mut devices = self.sdk.remote_controls().all();
        devices.extend(self.sdk.drones().all());
        devices
    }

    fn find(&self, step: usize, uid: &str) -> Result<Arc<DeviceCore>, CliError> {
        let uid = DeviceUid::from(uid);
        self.sdk
            .drones()
            .get(&uid)
            .or_else(|| self.sdk.remote_controls().get(&uid))
            .ok_or_else(|| CliError::DeviceNotFound {
                step,
                uid: uid.to_string(),
            })
    }

    /// Completes pending transitions until no device is CONNECTING or
    /// DISCONNECTING.
    fn settle(&self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let moving: Vec<_> = self
                .devices()
                .into_iter()
                .filter(|device| {
                    matches!(
                        device.connection_state(),
                        ConnectionState::Connecting | ConnectionState::Disconnecting
                    )
                })
                .collect();
            if moving.is_empty() {
                return;
            }
            for device in moving {
                device.update_state(|state| {
                    state.connection_state = match state.connection_state {
                        ConnectionState::Connecting => ConnectionState::Connected,
                        ConnectionState::Disconnecting => ConnectionState::Disconnected,
                        other => other,
                    };
                });
            }
        }
        warn!(rounds = MAX_SETTLE_ROUNDS, "devices still transitioning after settle");
    }

    fn frame(&self, step: usize, action: String) -> Frame {
        Frame {
            step,
            action,
            auto_connection: self.sdk.auto_connection().snapshot(),
            requests: self.transport.take_requests(),
            devices: self.devices().iter().map(|d| DeviceSnapshot::of(d)).collect(),
        }
    }
}

fn seed(
    kind: DeviceKind,
    spec: &DeviceSpec,
    transport: &Arc<SimulatedTransport>,
) -> Result<Arc<DeviceCore>, CliError> {
    let initial = spec.initial_state()?;
    let delegate: Arc<dyn ConnectionDelegate> = transport.clone();
    let device = DeviceCore::new(kind, spec.uid.as_str(), spec.display_name(), delegate);
    device.update_state(|state| *state = initial);
    Ok(Arc::new(device))
}

/// Connector a `connected` step lands on: the named one, else the active
/// one, else whatever a plain connect would pick.
fn resolve_connector(device: &DeviceCore, raw: Option<&str>) -> Result<DeviceConnector, CliError> {
    let state = device.state();
    let connector = match raw {
        Some(raw) => {
            let connector = scenario::parse_connector(raw)?;
            state.connectors.contains(&connector).then_some(connector)
        }
        None => state
            .active_connector
            .clone()
            .or_else(|| state.default_connector().cloned())
            .or_else(|| state.connectors.first().cloned()),
    };
    connector.ok_or_else(|| CliError::InvalidScenario {
        reason: format!(
            "device '{}' cannot be connected on {}",
            device.uid(),
            raw.unwrap_or("any connector")
        ),
    })
}

/// Replays `scenario` from SDK start to SDK stop.
pub async fn run(scenario: &Scenario, config: SdkConfig) -> Result<Vec<Frame>, CliError> {
    let simulator = Simulator::new(scenario, config)?;
    let mut frames = Vec::with_capacity(scenario.steps.len() + 1);
    frames.push(simulator.start());
    for (index, step) in scenario.steps.iter().enumerate() {
        frames.push(simulator.apply(index + 1, step)?);
    }
    simulator.finish().await?;
    Ok(frames)
}
