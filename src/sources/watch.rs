use std::sync::Arc;
use futures::channel::mpsc::Sender;
use futures::{SinkExt, StreamExt};
use log::debug;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::transport::{PropertyWatch, Transport};
use crate::device::types::{DeviceIdentity, SourceUpdate};

/// Forwards connect/disconnect edges of one local device as `SourceUpdate::Changed`.
/// The watch is handed back to the transport when the task stops.
pub fn watch_source<T: Transport>(
    cancel: CancellationToken,
    transport: Arc<T>,
    mut watch: PropertyWatch,
    mut sender: Sender<SourceUpdate>,
) -> JoinHandle<()> {
    spawn(async move {
        let identity = DeviceIdentity::local(watch.address.clone());

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                change = watch.changes.next() => match change {
                    Some(change) if change.is_connection_edge() => {
                        debug!("{} changed {}", change.address, change.name);
                        // blocks while the loop is busy, an edge must never be dropped
                        if sender.send(SourceUpdate::Changed(identity.clone())).await.is_err() {
                            break 'mainloop;
                        }
                    },
                    Some(_) => {},
                    None => break 'mainloop,
                },
            }
        }

        transport.unwatch(watch).await;
    })
}
