/*!
 * Remote peer client
 * Newline-delimited JSON over TCP to peers that proxy their own bluetooth devices
 */

use std::time::Duration;
use futures::channel::mpsc::{channel, Sender};
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::spawn;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::types::RemotePeer;
use crate::device::constants::REMOTE_EVENT_CAPACITY;
use crate::device::transport::RemoteTransport;
use crate::device::types::{ChangeKind, DeviceIdentity, DeviceSnapshot, RemoteEvent};
use crate::error::RemoteError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    Subscribe,
    Connect { id: Uuid, address: String },
    Disconnect { id: Uuid, address: String },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Device { change: ChangeKind, device: RemoteDevice },
    Success { id: Uuid },
    Error { id: Uuid, message: String },
}

/// A device as the peer describes it; the peer itself is the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDevice {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub paired: bool,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub battery: Option<u8>,
}

impl RemoteDevice {
    pub fn into_snapshot(self, host: &str) -> DeviceSnapshot {
        DeviceSnapshot {
            identity: DeviceIdentity::remote(host, self.address),
            alias: self.name,
            connected: self.connected,
            paired: self.paired,
            trusted: self.trusted,
            icon: self.icon,
            battery: if self.connected { self.battery } else { None },
        }
    }
}

pub struct RemoteClient {
    cancel: CancellationToken,
    peers: Vec<RemotePeer>,
    reconnect_delay: Duration,
}

impl RemoteClient {
    pub fn new(cancel: CancellationToken, peers: Vec<RemotePeer>, reconnect_delay: Duration) -> Self {
        RemoteClient { cancel, peers, reconnect_delay }
    }

    fn peer(&self, host: &str) -> Result<&RemotePeer, RemoteError> {
        self.peers
            .iter()
            .find(|peer| peer.host == host)
            .ok_or_else(|| RemoteError::UnknownPeer { host: host.to_string() })
    }

    async fn command(&self, host: &str, request: Request) -> Result<(), RemoteError> {
        let peer = self.peer(host)?;
        let expected_id = match &request {
            Request::Connect { id, .. } | Request::Disconnect { id, .. } => *id,
            Request::Subscribe => return Err(RemoteError::UnexpectedResponse),
        };

        let stream = TcpStream::connect((peer.host.as_str(), peer.port)).await?;
        let (reader, mut writer) = stream.into_split();
        write_request(&mut writer, &request).await?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            match serde_json::from_str::<Response>(&line)? {
                Response::Success { id } if id == expected_id => return Ok(()),
                Response::Error { id, message } if id == expected_id => {
                    return Err(RemoteError::Rejected { message });
                },
                // the peer may interleave device events with the answer
                Response::Device { .. } => continue,
                _ => return Err(RemoteError::UnexpectedResponse),
            }
        }

        Err(RemoteError::Closed)
    }
}

impl RemoteTransport for RemoteClient {
    fn events(&self) -> BoxStream<'static, RemoteEvent> {
        let (sender, receiver) = channel::<RemoteEvent>(REMOTE_EVENT_CAPACITY);

        for peer in &self.peers {
            spawn(peer_events_task(
                self.cancel.child_token(),
                peer.clone(),
                self.reconnect_delay,
                sender.clone(),
            ));
        }

        receiver.boxed()
    }

    async fn connect(&self, host: &str, address: &str) -> Result<(), RemoteError> {
        let request = Request::Connect { id: Uuid::new_v4(), address: address.to_string() };
        self.command(host, request).await
    }

    async fn disconnect(&self, host: &str, address: &str) -> Result<(), RemoteError> {
        let request = Request::Disconnect { id: Uuid::new_v4(), address: address.to_string() };
        self.command(host, request).await
    }
}

async fn write_request(writer: &mut tokio::net::tcp::OwnedWriteHalf, request: &Request) -> Result<(), RemoteError> {
    let request_json = serde_json::to_string(request)?;
    writer.write_all(request_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn subscribe(peer: &RemotePeer, sender: &mut Sender<RemoteEvent>) -> Result<(), RemoteError> {
    let stream = TcpStream::connect((peer.host.as_str(), peer.port)).await?;
    let (reader, mut writer) = stream.into_split();
    write_request(&mut writer, &Request::Subscribe).await?;
    info!("Subscribed to remote peer {}:{}", peer.host, peer.port);

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<Response>(&line) {
            Ok(Response::Device { change, device }) => {
                let event = RemoteEvent {
                    peer: peer.host.clone(),
                    device: device.into_snapshot(&peer.host),
                    change,
                };

                if sender.send(event).await.is_err() {
                    // nobody is listening anymore
                    return Ok(());
                }
            },
            Ok(other) => debug!("Ignoring message from {}: {:?}", peer.host, other),
            Err(err) => warn!("Failed to decode message from {}: {}", peer.host, err),
        }
    }

    Err(RemoteError::Closed)
}

async fn peer_events_task(
    cancel: CancellationToken,
    peer: RemotePeer,
    reconnect_delay: Duration,
    mut sender: Sender<RemoteEvent>,
) {
    'mainloop: loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break 'mainloop;
            },
            result = subscribe(&peer, &mut sender) => {
                match result {
                    Ok(()) => break 'mainloop,
                    Err(err) => warn!("Remote peer {} unreachable: {}", peer.host, err),
                }
            },
        }

        // devices of an unreachable peer stay as they were last reported
        tokio::select! {
            _ = cancel.cancelled() => {
                break 'mainloop;
            },
            _ = sleep(reconnect_delay) => {},
        }
    }

    debug!("Stopped listening to remote peer {}", peer.host);
}
