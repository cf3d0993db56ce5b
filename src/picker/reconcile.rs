use std::sync::Arc;
use std::time::Duration;
use futures::channel::mpsc::{channel, Receiver};
use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::spawn_blocking;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::types::Config;
use crate::device::registry::{Registry, Upsert};
use crate::device::transport::{RemoteTransport, Transport};
use crate::device::types::{DeviceIdentity, DeviceSnapshot, SourceUpdate};
use crate::error::{AppRunError, TransportError, UiError};
use crate::picker::history::{rank_by_history, History};
use crate::picker::options::{battery_label, build_option};
use crate::sources::remote::remote_source;
use crate::sources::watch::watch_source;
use crate::ui::controls::Controls;
use crate::ui::notify::Notifier;
use crate::ui::types::{Picker, PickerCommand, PickerView, UiEvent};

pub const MESSAGE_LOADING: &str = "Loading devices...";
pub const MESSAGE_READY: &str = "Select a device";
pub const MESSAGE_NO_ADAPTER: &str = "Error loading adapter";
const MESSAGE_LOAD_FAILED: &str = "Error loading devices";

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub prompt: String,
    pub settle_delay: Duration,
    pub update_capacity: usize,
    pub history_namespace: String,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        LoopSettings {
            prompt: config.prompt.clone(),
            settle_delay: config.settle_delay(),
            update_capacity: config.update_channel_capacity,
            history_namespace: config.history_namespace.clone(),
        }
    }
}

/// The fire-and-forget collaborators of the loop.
pub struct SideEffects {
    pub notifier: Box<dyn Notifier>,
    pub history: Arc<dyn History>,
    pub controls: Box<dyn Controls>,
}

/// Renders a device-less view, for failures before the loop owns the picker.
pub fn render_status<P: Picker>(picker: &mut P, settings: &LoopSettings, message: &str) -> Result<(), UiError> {
    picker.render(&PickerView {
        prompt: settings.prompt.clone(),
        message: message.to_string(),
        options: Vec::new(),
    })
}

enum Input {
    Update(SourceUpdate),
    Command(UiEvent),
    Aborted,
}

/// Owns the registry. Source updates and user commands are applied here one at a time,
/// which is the only synchronization the registry needs.
pub struct Reconciler<T, R, P> {
    // cancelled when the loop exits; every source task holds a child token
    cancel: CancellationToken,
    settings: LoopSettings,
    transport: Arc<T>,
    remote: Option<Arc<R>>,
    picker: P,
    effects: SideEffects,
    registry: Registry,
    message: String,
}

impl<T: Transport, R: RemoteTransport, P: Picker> Reconciler<T, R, P> {
    pub fn new(
        cancel: CancellationToken,
        settings: LoopSettings,
        transport: Arc<T>,
        remote: Option<Arc<R>>,
        picker: P,
        effects: SideEffects,
    ) -> Self {
        Reconciler {
            cancel,
            settings,
            transport,
            remote,
            picker,
            effects,
            registry: Registry::new(),
            message: String::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn view(&self) -> PickerView {
        PickerView {
            prompt: self.settings.prompt.clone(),
            message: self.message.clone(),
            options: self.registry.iter().map(build_option).collect(),
        }
    }

    fn render(&mut self) -> Result<(), UiError> {
        let view = self.view();
        self.picker.render(&view)
    }

    fn fail(&mut self, message: String) -> Result<(), UiError> {
        warn!("{}", message);
        self.message = message;
        self.render()
    }

    fn notify(&self, message: &str) {
        self.effects.notifier.notify(message);
    }

    fn store(&mut self, snapshot: DeviceSnapshot) {
        let identity = snapshot.identity.clone();
        match self.registry.upsert(snapshot) {
            Upsert::Updated(index) => debug!("Updated {} at {}", identity, index),
            Upsert::Inserted(index) => info!("New device {} at {}", identity, index),
        }
    }

    async fn load_history(&mut self) -> Vec<String> {
        let history = self.effects.history.clone();
        let namespace = self.settings.history_namespace.clone();

        match spawn_blocking(move || history.load(&namespace)).await {
            Ok(Ok(values)) => values,
            Ok(Err(err)) => {
                warn!("Failed to load selection history: {}", err);
                Vec::new()
            },
            Err(err) => {
                warn!("Selection history task failed: {}", err);
                Vec::new()
            },
        }
    }

    async fn save_history(&mut self, value: &str) {
        let history = self.effects.history.clone();
        let namespace = self.settings.history_namespace.clone();
        let value = value.to_string();

        match spawn_blocking(move || history.save(&namespace, &value)).await {
            Ok(Ok(())) => {},
            Ok(Err(err)) => warn!("Failed to save selection history: {}", err),
            Err(err) => warn!("Selection history task failed: {}", err),
        }
    }

    /// Loads the devices, starts the sources and renders the first list.
    pub async fn start(&mut self) -> Result<Receiver<SourceUpdate>, AppRunError> {
        self.message = MESSAGE_LOADING.to_string();
        self.render()?;

        let devices = match self.transport.enumerate().await {
            Ok(devices) => devices,
            Err(err) => {
                error!("Failed to enumerate devices: {}", err);
                self.message = match err {
                    TransportError::NoAdapter => MESSAGE_NO_ADAPTER,
                    _ => MESSAGE_LOAD_FAILED,
                }.to_string();
                self.render()?;
                return Err(AppRunError::Enumeration { source: err });
            },
        };

        let history = self.load_history().await;

        self.registry = Registry::admit(rank_by_history(devices, &history));
        if self.registry.is_empty() {
            info!("No trusted devices");
        } else {
            info!("Tracking {} trusted devices", self.registry.len());
        }

        let (sender, receiver) = channel::<SourceUpdate>(self.settings.update_capacity);

        for address in self.registry.local_addresses() {
            let watch = match self.transport.watch(&address).await {
                Ok(watch) => watch,
                Err(source) => {
                    self.message = format!("Error watching device \"{}\"", address);
                    self.render()?;
                    return Err(AppRunError::Watch { address, source });
                },
            };

            watch_source(self.cancel.child_token(), self.transport.clone(), watch, sender.clone());
        }

        if let Some(remote) = &self.remote {
            remote_source(self.cancel.child_token(), remote.clone(), sender.clone());
        }

        self.message = MESSAGE_READY.to_string();
        self.render()?;
        Ok(receiver)
    }

    /// Runs until the user aborts the selection.
    pub async fn run(mut self) -> Result<(), AppRunError> {
        let result = match self.start().await {
            Ok(mut updates) => self.event_loop(&mut updates).await,
            Err(err) => Err(err),
        };

        self.cancel.cancel();
        result
    }

    async fn event_loop(&mut self, updates: &mut Receiver<SourceUpdate>) -> Result<(), AppRunError> {
        loop {
            let input = tokio::select! {
                Some(update) = updates.next() => Input::Update(update),
                event = self.picker.next_event() => match event {
                    Some(event) => Input::Command(event),
                    None => Input::Aborted,
                },
            };

            match input {
                Input::Update(update) => self.apply_update(update).await?,
                Input::Command(event) => self.handle_command(event).await?,
                Input::Aborted => {
                    info!("Selection aborted");
                    return Ok(());
                },
            }
        }
    }

    /// Upserts the source's view of a device and re-renders.
    pub async fn apply_update(&mut self, update: SourceUpdate) -> Result<(), UiError> {
        let snapshot = match update {
            SourceUpdate::Pushed(snapshot) => snapshot,
            SourceUpdate::Changed(DeviceIdentity::Local { address }) => {
                match self.transport.get(&address).await {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        return self.fail(format!("Error getting device \"{}\": {}", address, err));
                    },
                }
            },
            SourceUpdate::Changed(identity) => {
                // remote devices are only known through their pushed snapshots
                debug!("Ignoring change signal for {}", identity);
                return Ok(());
            },
        };

        let was_connected = self.registry
            .get(&snapshot.identity)
            .map(|device| device.connected)
            .unwrap_or(false);
        let needs_battery = snapshot.connected && !was_connected
            && snapshot.battery.is_none() && !snapshot.identity.is_remote();
        let identity = snapshot.identity.clone();

        self.store(snapshot);
        self.render()?;

        if needs_battery {
            self.probe_battery(&identity).await;
            self.render()?;
        }

        Ok(())
    }

    /// Reads the battery once the connection settled; a missing reading is not an error.
    async fn probe_battery(&mut self, identity: &DeviceIdentity) -> Option<u8> {
        sleep(self.settings.settle_delay).await;

        let battery = self.transport.battery_level(identity.address()).await;
        if battery.is_none() {
            debug!("No battery reading for {}", identity);
        }

        let updated = self.registry.get(identity).map(|device| device.with_battery(battery));
        if let Some(updated) = updated {
            self.store(updated);
        }

        battery
    }

    /// Dispatches a user command. Failures end up in the status message, never in the registry.
    pub async fn handle_command(&mut self, event: UiEvent) -> Result<(), UiError> {
        let identity = DeviceIdentity::from_value_key(&event.value);
        debug!("Command {} on {}", event.command, identity);

        if !identity.is_remote() {
            self.save_history(&event.value).await;
        }

        match (&identity, event.command) {
            (_, PickerCommand::Controls) => self.open_controls(&identity),
            (DeviceIdentity::Local { address }, command) => {
                let address = address.clone();
                self.local_command(&identity, &address, command).await
            },
            (DeviceIdentity::Remote { host, address }, command) => {
                let (host, address) = (host.clone(), address.clone());
                self.remote_command(&identity, &host, &address, command).await
            },
        }
    }

    fn open_controls(&mut self, identity: &DeviceIdentity) -> Result<(), UiError> {
        match self.effects.controls.open(identity) {
            Ok(()) => Ok(()),
            Err(err) => self.fail(format!("Error opening controls for \"{}\": {}", identity, err)),
        }
    }

    async fn local_command(&mut self, identity: &DeviceIdentity, address: &str, command: PickerCommand) -> Result<(), UiError> {
        let device = match self.transport.get(address).await {
            Ok(device) => device,
            Err(err) => return self.fail(format!("Error getting device \"{}\": {}", identity, err)),
        };

        match command {
            PickerCommand::Connect => {
                self.notify(&format!("Connecting to device \"{}\"", device.alias));
                if let Err(err) = self.transport.connect(address).await {
                    return self.fail(format!("Error connecting to device \"{}\": {}", device.alias, err));
                }

                self.message = MESSAGE_READY.to_string();
                self.store(device.with_connected(true));
                self.render()?;

                // the battery service is not enumerable right after connecting
                match self.probe_battery(identity).await {
                    Some(percentage) => self.notify(&format!(
                        "Connected to device \"{}\"\n{}", device.alias, battery_label(percentage),
                    )),
                    None => self.notify(&format!("Connected to device \"{}\"", device.alias)),
                }
            },
            PickerCommand::Disconnect => {
                self.notify(&format!("Disconnecting device \"{}\"", device.alias));
                if let Err(err) = self.transport.disconnect(address).await {
                    return self.fail(format!("Error disconnecting device \"{}\": {}", device.alias, err));
                }

                self.message = MESSAGE_READY.to_string();
                self.store(device.with_connected(false));
                self.notify(&format!("Disconnected from device \"{}\"", device.alias));
            },
            PickerCommand::Controls => return self.open_controls(identity),
        }

        self.render()
    }

    async fn remote_command(
        &mut self,
        identity: &DeviceIdentity,
        host: &str,
        address: &str,
        command: PickerCommand,
    ) -> Result<(), UiError> {
        let device: Option<DeviceSnapshot> = self.registry.get(identity).cloned();
        let (Some(device), Some(remote)) = (device, self.remote.clone()) else {
            return self.fail(format!("Error getting device \"{}\": unknown remote device", identity));
        };

        match command {
            PickerCommand::Connect => {
                self.notify(&format!("Remotely connecting to device \"{}\"", device.alias));
                if let Err(err) = remote.connect(host, address).await {
                    return self.fail(format!("Error connecting to device \"{}\": {}", identity, err));
                }

                self.store(device.with_connected(true));
                self.notify(&format!("Remotely connected to device \"{}\"", device.alias));
            },
            PickerCommand::Disconnect => {
                self.notify(&format!("Remotely disconnecting from device \"{}\"", device.alias));
                if let Err(err) = remote.disconnect(host, address).await {
                    return self.fail(format!("Error disconnecting from device \"{}\": {}", identity, err));
                }

                self.store(device.with_connected(false));
                self.notify(&format!("Remotely disconnected from device \"{}\"", device.alias));
            },
            PickerCommand::Controls => return self.open_controls(identity),
        }

        self.message = MESSAGE_READY.to_string();
        self.render()
    }
}
