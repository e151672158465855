// ── Device identity ──
//
// Stable identifiers for drones and remote controls. A uid is unique
// within its device category, and is the final tie-break of the
// auto-connection ranking.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical identifier of a device, usually its serial number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceUid(String);

impl DeviceUid {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceUid {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for DeviceUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceUid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Borrow<str> for DeviceUid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uid_display_round_trips_raw_value() {
        let uid = DeviceUid::from("PI040416AA8J009173");
        assert_eq!(uid.to_string(), "PI040416AA8J009173");
    }

    #[test]
    fn uid_from_str() {
        let uid: DeviceUid = "rc-1".parse().unwrap();
        assert_eq!(uid.as_str(), "rc-1");
    }

    #[test]
    fn uid_orders_lexicographically() {
        assert!(DeviceUid::from("A") < DeviceUid::from("B"));
        assert!(DeviceUid::from("drone-10") < DeviceUid::from("drone-9"));
    }
}
