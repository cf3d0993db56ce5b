use std::sync::Arc;
use futures::channel::mpsc::Sender;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::device::transport::RemoteTransport;
use crate::device::types::{ChangeKind, SourceUpdate};

/// Forwards remote peer events as `SourceUpdate::Pushed`; the pushed snapshot is the
/// whole state, there is no local enumeration for remote devices.
pub fn remote_source<R: RemoteTransport>(
    cancel: CancellationToken,
    remote: Arc<R>,
    mut sender: Sender<SourceUpdate>,
) -> JoinHandle<()> {
    spawn(async move {
        let mut events = remote.events();

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                event = events.next() => match event {
                    Some(event) => {
                        if event.change == ChangeKind::Discovered {
                            info!("Discovered remote device {}", event.device.identity);
                        } else {
                            debug!("Remote device {} changed", event.device.identity);
                        }

                        if sender.send(SourceUpdate::Pushed(event.device)).await.is_err() {
                            break 'mainloop;
                        }
                    },
                    // every peer stopped; their devices stay as last reported
                    None => break 'mainloop,
                },
            }
        }
    })
}
