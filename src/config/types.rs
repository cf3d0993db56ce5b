use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::device::constants::{REMOTE_RECONNECT_DELAY, SETTLE_DELAY, UPDATE_CHANNEL_CAPACITY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePeer {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub peers: Vec<RemotePeer>,
    pub reconnect_delay_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            enabled: true,
            peers: Vec::new(),
            reconnect_delay_ms: REMOTE_RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub program: String,
    pub app_name: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            enabled: true,
            program: "/usr/bin/notify-send".to_string(),
            app_name: "Bluetooth".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub prompt: String,
    pub settle_delay_ms: u64,
    pub update_channel_capacity: usize,
    pub history_namespace: String,
    pub notifications: NotificationConfig,
    // `{address}` and `{host}` are replaced with the selected device
    pub controls_command: Vec<String>,
    pub remote: RemoteConfig,
}

impl Config {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.remote.reconnect_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: "Bluetooth devices".to_string(),
            settle_delay_ms: SETTLE_DELAY,
            update_channel_capacity: UPDATE_CHANNEL_CAPACITY,
            history_namespace: "bluetooth-devices".to_string(),
            notifications: NotificationConfig::default(),
            controls_command: vec!["blueman-manager".to_string()],
            remote: RemoteConfig::default(),
        }
    }
}
