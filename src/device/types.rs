use std::fmt;
use serde::{Deserialize, Serialize};

/**
 * Separates the host from the address in the value key of a remote device: `host/AA:BB:..`
 * Bluetooth addresses never contain this character.
 */
pub const VALUE_KEY_SEPARATOR: char = '/';

/// Identifies a device. Local and remote identities never compare equal, even when the
/// raw address collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceIdentity {
    Local { address: String },
    Remote { host: String, address: String },
}

impl DeviceIdentity {
    pub fn local(address: impl Into<String>) -> Self {
        DeviceIdentity::Local { address: address.into() }
    }

    pub fn remote(host: impl Into<String>, address: impl Into<String>) -> Self {
        DeviceIdentity::Remote { host: host.into(), address: address.into() }
    }

    pub fn address(&self) -> &str {
        match self {
            DeviceIdentity::Local { address } => address,
            DeviceIdentity::Remote { address, .. } => address,
        }
    }

    pub fn host(&self) -> Option<&str> {
        match self {
            DeviceIdentity::Local { .. } => None,
            DeviceIdentity::Remote { host, .. } => Some(host),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DeviceIdentity::Remote { .. })
    }

    /// The key the picker hands back when an option is selected.
    pub fn value_key(&self) -> String {
        match self {
            DeviceIdentity::Local { address } => address.clone(),
            DeviceIdentity::Remote { host, address } => format!("{}{}{}", host, VALUE_KEY_SEPARATOR, address),
        }
    }

    pub fn from_value_key(value: &str) -> Self {
        match value.split_once(VALUE_KEY_SEPARATOR) {
            Some((host, address)) => DeviceIdentity::remote(host, address),
            None => DeviceIdentity::local(value),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value_key())
    }
}

/// Everything known about a device at one point in time. Changes produce a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub identity: DeviceIdentity,
    pub alias: String,
    pub connected: bool,
    pub paired: bool,
    pub trusted: bool,
    pub icon: String,
    // None while disconnected or when the device has no battery service
    pub battery: Option<u8>,
}

impl DeviceSnapshot {
    pub fn address(&self) -> &str {
        self.identity.address()
    }

    pub fn with_connected(&self, connected: bool) -> Self {
        DeviceSnapshot {
            connected,
            battery: if connected { self.battery } else { None },
            ..self.clone()
        }
    }

    pub fn with_battery(&self, battery: Option<u8>) -> Self {
        DeviceSnapshot {
            battery: if self.connected { battery } else { None },
            ..self.clone()
        }
    }
}

/// A raw property change notification for one local device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub address: String,
    pub name: String,
}

impl PropertyChange {
    /// Only connect/disconnect edges are worth re-deriving a device for.
    pub fn is_connection_edge(&self) -> bool {
        matches!(self.name.as_str(), "Connected" | "Disconnected")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Discovered,
    Changed,
}

/// A push event from a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub peer: String,
    pub device: DeviceSnapshot,
    pub change: ChangeKind,
}

/// The normalized shape every source produces for the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUpdate {
    // re-derive this identity from the transport
    Changed(DeviceIdentity),
    // the source already knows the full state
    Pushed(DeviceSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(identity: DeviceIdentity, connected: bool, battery: Option<u8>) -> DeviceSnapshot {
        DeviceSnapshot {
            identity,
            alias: "Headphones".to_string(),
            connected,
            paired: true,
            trusted: true,
            icon: "audio-headphones".to_string(),
            battery,
        }
    }

    #[test]
    fn test_local_and_remote_identities_are_disjoint() {
        let local = DeviceIdentity::local("AA:BB");
        let remote = DeviceIdentity::remote("h", "AA:BB");

        assert_ne!(local, remote);
        assert_ne!(local.value_key(), remote.value_key());
        assert_eq!(local.address(), remote.address());
    }

    #[test]
    fn test_value_key_parsing() {
        assert_eq!(DeviceIdentity::from_value_key("AA:BB"), DeviceIdentity::local("AA:BB"));
        assert_eq!(DeviceIdentity::from_value_key("desk/AA:BB"), DeviceIdentity::remote("desk", "AA:BB"));
        assert_eq!(DeviceIdentity::remote("desk", "AA:BB").value_key(), "desk/AA:BB");
    }

    #[test]
    fn test_disconnect_clears_battery() {
        let connected = snapshot(DeviceIdentity::local("AA"), true, Some(80));
        let disconnected = connected.with_connected(false);

        assert!(!disconnected.connected);
        assert_eq!(disconnected.battery, None);
        assert_eq!(connected.battery, Some(80));
        assert_eq!(disconnected.with_battery(Some(50)).battery, None);
    }

    #[test]
    fn test_connection_edges() {
        let change = |name: &str| PropertyChange { address: "AA".to_string(), name: name.to_string() };

        assert!(change("Connected").is_connection_edge());
        assert!(change("Disconnected").is_connection_edge());
        assert!(!change("RSSI").is_connection_edge());
        assert!(!change("Alias").is_connection_edge());
    }
}
