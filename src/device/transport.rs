use std::future::Future;
use futures::stream::BoxStream;

use crate::device::types::{DeviceSnapshot, PropertyChange, RemoteEvent};
use crate::error::{RemoteError, TransportError};

/// A live subscription to the property changes of one local device.
/// Hand it back to [`Transport::unwatch`] to release the listener.
pub struct PropertyWatch {
    pub address: String,
    pub changes: BoxStream<'static, PropertyChange>,
}

impl std::fmt::Debug for PropertyWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyWatch").field("address", &self.address).finish()
    }
}

/// Reads and commands local devices.
pub trait Transport: Send + Sync + 'static {
    fn enumerate(&self) -> impl Future<Output = Result<Vec<DeviceSnapshot>, TransportError>> + Send;

    fn get(&self, address: &str) -> impl Future<Output = Result<DeviceSnapshot, TransportError>> + Send;

    fn connect(&self, address: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn disconnect(&self, address: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn watch(&self, address: &str) -> impl Future<Output = Result<PropertyWatch, TransportError>> + Send;

    fn unwatch(&self, watch: PropertyWatch) -> impl Future<Output = ()> + Send;

    /// Best effort; `None` when the device is not connected or has no battery service.
    fn battery_level(&self, address: &str) -> impl Future<Output = Option<u8>> + Send;
}

/// Reads and commands devices proxied by remote peers.
pub trait RemoteTransport: Send + Sync + 'static {
    fn events(&self) -> BoxStream<'static, RemoteEvent>;

    fn connect(&self, host: &str, address: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn disconnect(&self, host: &str, address: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
