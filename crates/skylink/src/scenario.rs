//! Scenario files: devices to seed the stores with, then steps to replay.
//!
//! ```toml
//! at_startup = true
//!
//! [[drone]]
//! uid = "d1"
//! connectors = ["wifi", "rc:rc1"]
//!
//! [[remote_control]]
//! uid = "rc1"
//! connectors = ["usb"]
//!
//! [[step]]
//! action = "settle"
//!
//! [[step]]
//! action = "remove_connector"
//! device = "rc1"
//! connector = "usb"
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use skylink_core::{ConnectionState, DeviceConnector, DeviceState, Technology};

use crate::error::CliError;

/// A parsed and validated scenario.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Overrides `auto_connection.at_startup` from the config file.
    #[serde(default)]
    pub at_startup: Option<bool>,

    #[serde(default, rename = "drone")]
    pub drones: Vec<DeviceSpec>,

    #[serde(default, rename = "remote_control")]
    pub remote_controls: Vec<DeviceSpec>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Initial declaration of one device.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceSpec {
    pub uid: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub connectors: Vec<String>,

    #[serde(default)]
    pub state: ConnectionState,

    /// Active connector; required to be one of `connectors`.
    #[serde(default)]
    pub active: Option<String>,
}

/// One scenario step, tagged by its `action` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Start auto-connection through the facade.
    Start,
    /// Stop auto-connection through the facade.
    Stop,
    /// Complete every pending connect / disconnect until nothing moves.
    Settle,
    AddConnector {
        device: String,
        connector: String,
    },
    /// Drops a connector; a device using it loses its connection.
    RemoveConnector {
        device: String,
        connector: String,
    },
    /// The device reports it is connected, by default on its active connector.
    Connected {
        device: String,
        #[serde(default)]
        connector: Option<String>,
    },
    Disconnected {
        device: String,
    },
    /// The device vanishes from its store.
    Remove {
        device: String,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
            Self::Settle => f.write_str("settle"),
            Self::AddConnector { device, connector } => write!(f, "add_connector {device} {connector}"),
            Self::RemoveConnector { device, connector } => {
                write!(f, "remove_connector {device} {connector}")
            }
            Self::Connected {
                device,
                connector: Some(connector),
            } => write!(f, "connected {device} {connector}"),
            Self::Connected {
                device,
                connector: None,
            } => write!(f, "connected {device}"),
            Self::Disconnected { device } => write!(f, "disconnected {device}"),
            Self::Remove { device } => write!(f, "remove {device}"),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Reads, parses and validates the scenario at `path`.
pub fn load(path: &Path) -> Result<Scenario, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ScenarioUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario: Scenario = toml::from_str(&raw).map_err(|source| CliError::ScenarioSyntax {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    scenario.validate()?;
    Ok(scenario)
}

/// Parses `usb`, `wifi`, `ble`, `unknown` or `rc:<uid>`.
pub fn parse_connector(raw: &str) -> Result<DeviceConnector, CliError> {
    let raw = raw.trim();
    if let Some(rc) = raw.strip_prefix("rc:") {
        if rc.is_empty() {
            return Err(CliError::InvalidConnector { raw: raw.into() });
        }
        return Ok(DeviceConnector::remote_control(rc));
    }
    raw.parse::<Technology>()
        .map(DeviceConnector::local)
        .map_err(|_| CliError::InvalidConnector { raw: raw.into() })
}

impl Scenario {
    /// Rejects duplicate uids, malformed connectors and inconsistent
    /// initial states. Device references in steps are checked while
    /// replaying, since `remove` steps change what exists.
    pub fn validate(&self) -> Result<(), CliError> {
        let mut seen = std::collections::HashSet::new();
        for spec in self.drones.iter().chain(&self.remote_controls) {
            if spec.uid.trim().is_empty() {
                return Err(CliError::InvalidScenario {
                    reason: "device uid must not be empty".into(),
                });
            }
            if !seen.insert(spec.uid.as_str()) {
                return Err(CliError::InvalidScenario {
                    reason: format!("device '{}' is declared twice", spec.uid),
                });
            }
            spec.initial_state()?;
        }
        for step in &self.steps {
            match step {
                Step::AddConnector { connector, .. }
                | Step::RemoveConnector { connector, .. }
                | Step::Connected {
                    connector: Some(connector),
                    ..
                } => {
                    parse_connector(connector)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl DeviceSpec {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uid)
    }

    /// State the device starts in before the SDK starts.
    pub fn initial_state(&self) -> Result<DeviceState, CliError> {
        let connectors = self
            .connectors
            .iter()
            .map(|raw| parse_connector(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let mut state = DeviceState {
            connection_state: self.state,
            connectors,
            active_connector: None,
        };

        if self.state == ConnectionState::Disconnected {
            if self.active.is_some() {
                return Err(self.invalid("a disconnected device has no active connector"));
            }
            return Ok(state);
        }

        let active = match &self.active {
            Some(raw) => {
                let connector = parse_connector(raw)?;
                if !state.connectors.contains(&connector) {
                    return Err(self.invalid(&format!("active connector '{raw}' is not listed")));
                }
                connector
            }
            None => state
                .default_connector()
                .or_else(|| state.connectors.first())
                .cloned()
                .ok_or_else(|| self.invalid("a connected device needs at least one connector"))?,
        };
        state.active_connector = Some(active);
        Ok(state)
    }

    fn invalid(&self, reason: &str) -> CliError {
        CliError::InvalidScenario {
            reason: format!("device '{}': {reason}", self.uid),
        }
    }
}
