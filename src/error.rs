use std::io;
use std::str::Utf8Error;
use thiserror::Error;
use serde_json;
use zbus;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Error communicating with bluez (dbus): {source}")]
    Dbus { #[from] source: zbus::Error },

    #[error("Error communicating with bluez (dbus): {source}")]
    DbusFdo { #[from] source: zbus::fdo::Error },

    #[error("No bluetooth adapter available")]
    NoAdapter,

    #[error("Device {address} not found")]
    UnknownDevice { address: String },

    #[error("Device {path} is missing the {property} property")]
    MissingProperty { path: String, property: &'static str },
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to communicate with remote peer: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build remote message: {source}")]
    JsonError { #[from] source: serde_json::Error },

    #[error("No remote peer is configured for host {host}")]
    UnknownPeer { host: String },

    #[error("Remote peer closed the connection")]
    Closed,

    #[error("Remote peer answered an unexpected request")]
    UnexpectedResponse,

    #[error("{message}")]
    Rejected { message: String },
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to determine path to history file")]
    NoHistoryPath,

    #[error("Failed to read/write history file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build history file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum UiError {
    #[error("Failed to write to the picker: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to encode picker output: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum ControlsError {
    #[error("No controls command is configured")]
    NotConfigured,

    #[error("Failed to start controls command: {source}")]
    IOError { #[from] source: io::Error },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to load devices: {source}")]
    Enumeration { source: TransportError },

    #[error("Failed to watch device {address}: {source}")]
    Watch { address: String, source: TransportError },

    #[error("Failed to connect to the system bus: {source}")]
    Bus { source: TransportError },

    #[error("Picker failed: {source}")]
    UiError { #[from] source: UiError },
}
