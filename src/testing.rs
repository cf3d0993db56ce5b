//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, BoxStream};
use futures::StreamExt;

use crate::device::transport::{PropertyWatch, RemoteTransport, Transport};
use crate::device::types::{DeviceIdentity, DeviceSnapshot, PropertyChange, RemoteEvent};
use crate::error::{ControlsError, HistoryError, RemoteError, TransportError, UiError};
use crate::picker::history::History;
use crate::ui::controls::Controls;
use crate::ui::notify::Notifier;
use crate::ui::types::{Picker, PickerView, UiEvent};

pub fn snapshot(identity: DeviceIdentity, alias: &str, connected: bool, battery: Option<u8>) -> DeviceSnapshot {
    DeviceSnapshot {
        identity,
        alias: alias.to_string(),
        connected,
        paired: true,
        trusted: true,
        icon: "audio-headset".to_string(),
        battery,
    }
}

#[derive(Default)]
pub struct FakeTransport {
    devices: Mutex<Vec<DeviceSnapshot>>,
    batteries: Mutex<HashMap<String, u8>>,
    rejected: Mutex<HashSet<String>>,
    fail_enumeration: Mutex<bool>,
    watchers: Mutex<HashMap<String, UnboundedSender<PropertyChange>>>,
    unwatched: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new(devices: Vec<DeviceSnapshot>) -> Self {
        FakeTransport {
            devices: Mutex::new(devices),
            ..FakeTransport::default()
        }
    }

    /// Changes what the transport reports, without notifying anyone.
    pub fn set_connected(&self, address: &str, connected: bool) {
        let mut devices = self.devices.lock().unwrap();
        if let Some(device) = devices.iter_mut().find(|device| device.address() == address) {
            *device = device.with_connected(connected);
        }
    }

    pub fn set_battery(&self, address: &str, percentage: u8) {
        self.batteries.lock().unwrap().insert(address.to_string(), percentage);
    }

    pub fn reject_commands(&self, address: &str) {
        self.rejected.lock().unwrap().insert(address.to_string());
    }

    pub fn fail_enumeration(&self) {
        *self.fail_enumeration.lock().unwrap() = true;
    }

    pub fn remove(&self, address: &str) {
        self.devices.lock().unwrap().retain(|device| device.address() != address);
    }

    pub fn emit(&self, address: &str, name: &str) {
        let watchers = self.watchers.lock().unwrap();
        if let Some(sender) = watchers.get(address) {
            let _ = sender.unbounded_send(PropertyChange {
                address: address.to_string(),
                name: name.to_string(),
            });
        }
    }

    pub fn watched(&self) -> Vec<String> {
        let mut watched: Vec<String> = self.watchers.lock().unwrap().keys().cloned().collect();
        watched.sort();
        watched
    }

    pub fn unwatched(&self) -> Vec<String> {
        self.unwatched.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn lookup(&self, address: &str) -> Result<DeviceSnapshot, TransportError> {
        let devices = self.devices.lock().unwrap();
        let device = devices
            .iter()
            .find(|device| device.address() == address)
            .cloned()
            .ok_or_else(|| TransportError::UnknownDevice { address: address.to_string() })?;

        let battery = self.batteries.lock().unwrap().get(address).copied();
        Ok(device.with_battery(battery))
    }

    fn command(&self, address: &str, method: &str, connected: bool) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(format!("{} {}", method, address));
        self.lookup(address)?;

        if self.rejected.lock().unwrap().contains(address) {
            return Err(TransportError::Dbus { source: zbus::Error::Failure("Page Timeout".to_string()) });
        }

        self.set_connected(address, connected);
        Ok(())
    }
}

impl Transport for FakeTransport {
    async fn enumerate(&self) -> Result<Vec<DeviceSnapshot>, TransportError> {
        if *self.fail_enumeration.lock().unwrap() {
            return Err(TransportError::NoAdapter);
        }

        let addresses: Vec<String> = self.devices.lock().unwrap()
            .iter()
            .map(|device| device.address().to_string())
            .collect();

        addresses.iter().map(|address| self.lookup(address)).collect()
    }

    async fn get(&self, address: &str) -> Result<DeviceSnapshot, TransportError> {
        self.lookup(address)
    }

    async fn connect(&self, address: &str) -> Result<(), TransportError> {
        self.command(address, "connect", true)
    }

    async fn disconnect(&self, address: &str) -> Result<(), TransportError> {
        self.command(address, "disconnect", false)
    }

    async fn watch(&self, address: &str) -> Result<PropertyWatch, TransportError> {
        let (sender, receiver) = unbounded::<PropertyChange>();
        self.watchers.lock().unwrap().insert(address.to_string(), sender);
        Ok(PropertyWatch { address: address.to_string(), changes: receiver.boxed() })
    }

    async fn unwatch(&self, watch: PropertyWatch) {
        self.unwatched.lock().unwrap().push(watch.address);
    }

    async fn battery_level(&self, address: &str) -> Option<u8> {
        self.lookup(address).ok().and_then(|device| device.battery)
    }
}

#[derive(Default)]
pub struct FakeRemote {
    sender: Mutex<Option<UnboundedSender<RemoteEvent>>>,
    receiver: Mutex<Option<UnboundedReceiver<RemoteEvent>>>,
    rejected: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded::<RemoteEvent>();
        FakeRemote {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            ..FakeRemote::default()
        }
    }

    pub fn push(&self, event: RemoteEvent) {
        if let Some(sender) = self.sender.lock().unwrap().as_ref() {
            let _ = sender.unbounded_send(event);
        }
    }

    pub fn close(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn reject_commands(&self, host: &str, address: &str) {
        self.rejected.lock().unwrap().insert(format!("{}/{}", host, address));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn command(&self, host: &str, address: &str, method: &str) -> Result<(), RemoteError> {
        let key = format!("{}/{}", host, address);
        self.calls.lock().unwrap().push(format!("{} {}", method, key));

        if self.rejected.lock().unwrap().contains(&key) {
            return Err(RemoteError::Rejected { message: "peer is busy".to_string() });
        }
        Ok(())
    }
}

impl RemoteTransport for FakeRemote {
    fn events(&self) -> BoxStream<'static, RemoteEvent> {
        match self.receiver.lock().unwrap().take() {
            Some(receiver) => receiver.boxed(),
            None => stream::empty().boxed(),
        }
    }

    async fn connect(&self, host: &str, address: &str) -> Result<(), RemoteError> {
        self.command(host, address, "connect")
    }

    async fn disconnect(&self, host: &str, address: &str) -> Result<(), RemoteError> {
        self.command(host, address, "disconnect")
    }
}

pub struct FakePicker {
    events: UnboundedReceiver<UiEvent>,
    renders: UnboundedSender<PickerView>,
}

/// The test side of a [`FakePicker`].
pub struct PickerHandle {
    pub events: UnboundedSender<UiEvent>,
    pub renders: UnboundedReceiver<PickerView>,
}

impl PickerHandle {
    /// Waits for the next render matching `predicate`.
    pub async fn render_where(&mut self, predicate: impl Fn(&PickerView) -> bool) -> PickerView {
        loop {
            let view = self.renders.next().await.expect("picker was dropped");
            if predicate(&view) {
                return view;
            }
        }
    }
}

pub fn fake_picker() -> (FakePicker, PickerHandle) {
    let (event_sender, event_receiver) = unbounded::<UiEvent>();
    let (render_sender, render_receiver) = unbounded::<PickerView>();

    let picker = FakePicker { events: event_receiver, renders: render_sender };
    let handle = PickerHandle { events: event_sender, renders: render_receiver };
    (picker, handle)
}

impl Picker for FakePicker {
    fn render(&mut self, view: &PickerView) -> Result<(), UiError> {
        let _ = self.renders.unbounded_send(view.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<UiEvent> {
        self.events.next().await
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Clone, Default)]
pub struct MemoryHistory {
    pub entries: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl History for MemoryHistory {
    fn load(&self, namespace: &str) -> Result<Vec<String>, HistoryError> {
        Ok(self.entries.lock().unwrap().get(namespace).cloned().unwrap_or_default())
    }

    fn save(&self, namespace: &str, value: &str) -> Result<(), HistoryError> {
        let mut entries = self.entries.lock().unwrap();
        let values = entries.entry(namespace.to_string()).or_default();
        values.retain(|existing| existing != value);
        values.insert(0, value.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingControls {
    pub opened: Arc<Mutex<Vec<DeviceIdentity>>>,
}

impl Controls for RecordingControls {
    fn open(&self, identity: &DeviceIdentity) -> Result<(), ControlsError> {
        self.opened.lock().unwrap().push(identity.clone());
        Ok(())
    }
}
