// ── Device connectors ──
//
// A connector is one way of reaching a device: a local link of some
// transport technology, or a path through a remote control.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::uid::DeviceUid;

/// Transport technology of a connector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Technology {
    /// Wired link.
    Usb,
    /// Local network.
    Wifi,
    /// Short-range radio.
    Ble,
    /// Anything the ranking does not know about.
    Unknown,
}

impl Technology {
    /// Rank used by auto-connection; higher is better.
    pub fn rank(self) -> u8 {
        match self {
            Self::Usb => 3,
            Self::Wifi => 2,
            Self::Ble => 1,
            Self::Unknown => 0,
        }
    }
}

/// Whether a connector reaches the device directly or through a remote control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorKind {
    Local,
    RemoteControl { uid: DeviceUid },
}

/// One reachability path to a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceConnector {
    pub technology: Technology,
    pub kind: ConnectorKind,
}

impl DeviceConnector {
    /// A local connector of the given technology.
    pub fn local(technology: Technology) -> Self {
        Self {
            technology,
            kind: ConnectorKind::Local,
        }
    }

    /// A connector reaching a drone through the remote control `rc`.
    ///
    /// Remote controls talk to their drones over Wi-Fi, so these connectors
    /// rank in the Wi-Fi tier.
    pub fn remote_control(rc: impl Into<DeviceUid>) -> Self {
        Self {
            technology: Technology::Wifi,
            kind: ConnectorKind::RemoteControl { uid: rc.into() },
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, ConnectorKind::Local)
    }

    /// Uid of the remote control this connector goes through, if any.
    pub fn remote_control_uid(&self) -> Option<&DeviceUid> {
        match &self.kind {
            ConnectorKind::RemoteControl { uid } => Some(uid),
            ConnectorKind::Local => None,
        }
    }

    /// Tells whether this connector goes through the remote control `rc`.
    pub fn goes_through(&self, rc: &DeviceUid) -> bool {
        self.remote_control_uid() == Some(rc)
    }

    pub fn rank(&self) -> u8 {
        self.technology.rank()
    }
}

impl fmt::Display for DeviceConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConnectorKind::Local => write!(f, "{}", self.technology),
            ConnectorKind::RemoteControl { uid } => write!(f, "rc:{uid}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn technology_ranks_wired_first() {
        assert!(Technology::Usb.rank() > Technology::Wifi.rank());
        assert!(Technology::Wifi.rank() > Technology::Ble.rank());
        assert!(Technology::Ble.rank() > Technology::Unknown.rank());
    }

    #[test]
    fn technology_parses_case_insensitively() {
        assert_eq!("USB".parse::<Technology>().unwrap(), Technology::Usb);
        assert_eq!("wifi".parse::<Technology>().unwrap(), Technology::Wifi);
    }

    #[test]
    fn remote_control_connector_goes_through_its_rc() {
        let connector = DeviceConnector::remote_control("rc-1");
        assert!(connector.goes_through(&DeviceUid::from("rc-1")));
        assert!(!connector.goes_through(&DeviceUid::from("rc-2")));
        assert!(!connector.is_local());
        assert_eq!(connector.technology, Technology::Wifi);
    }

    #[test]
    fn local_connector_goes_through_nothing() {
        let connector = DeviceConnector::local(Technology::Usb);
        assert!(connector.remote_control_uid().is_none());
        assert_eq!(connector.to_string(), "usb");
    }
}
