use std::env;
use std::future::Future;
use std::sync::Arc;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::types::Config;
use crate::device::bluez::BluezTransport;
use crate::device::remote::RemoteClient;
use crate::error::{AppRunError, TransportError};
use crate::picker::history::{FileHistory, History};
use crate::picker::reconcile::{
    render_status, LoopSettings, Reconciler, SideEffects, MESSAGE_LOADING, MESSAGE_NO_ADAPTER,
};
use crate::ui::types::Picker;
use crate::ui::controls::CommandControls;
use crate::ui::notify::NotifySend;
use crate::ui::rofi::RofiBlocks;

pub mod config;
pub mod device;
pub mod error;
pub mod picker;
pub mod sources;
pub mod ui;

#[cfg(test)]
pub mod testing;

pub fn init_logging(debug: bool) {
    let level = if debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Warn)
        .level_for("bluetooth_picker", level)
        // stdout belongs to rofi
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

fn open_history() -> FileHistory {
    match FileHistory::in_cache_dir() {
        Ok(history) => history,
        Err(err) => {
            warn!("{}, using the temporary directory", err);
            FileHistory::new(env::temp_dir().join("bluetooth-picker"))
        },
    }
}

fn remote_client(config: &Config, remote_enabled: bool, cancel: &CancellationToken) -> Option<Arc<RemoteClient>> {
    if !remote_enabled || !config.remote.enabled || config.remote.peers.is_empty() {
        return None;
    }

    info!("Using {} remote peers", config.remote.peers.len());
    Some(Arc::new(RemoteClient::new(
        cancel.child_token(),
        config.remote.peers.clone(),
        config.reconnect_delay(),
    )))
}

/// Waits for the transport while the picker already shows the loading state.
async fn open_transport<T, P: Picker>(
    picker: &mut P,
    settings: &LoopSettings,
    connect: impl Future<Output = Result<T, TransportError>>,
) -> Result<T, AppRunError> {
    render_status(picker, settings, MESSAGE_LOADING)?;

    match connect.await {
        Ok(transport) => Ok(transport),
        Err(source) => {
            error!("Failed to connect to bluez: {}", source);
            render_status(picker, settings, MESSAGE_NO_ADAPTER)?;
            Err(AppRunError::Bus { source })
        },
    }
}

/// Wires the system collaborators together and runs the picker until the user is done.
pub async fn run(config: Config, remote_enabled: bool) -> Result<(), AppRunError> {
    let cancel = CancellationToken::new();
    let settings = LoopSettings::from_config(&config);
    let mut picker = RofiBlocks::stdio(cancel.child_token());

    let transport = match open_transport(&mut picker, &settings, BluezTransport::new()).await {
        Ok(transport) => transport,
        Err(err) => {
            cancel.cancel();
            return Err(err);
        },
    };

    let history: Arc<dyn History> = Arc::new(open_history());
    let effects = SideEffects {
        notifier: Box::new(NotifySend::new(&config.notifications)),
        history,
        controls: Box::new(CommandControls::new(config.controls_command.clone())),
    };

    let remote = remote_client(&config, remote_enabled, &cancel);
    let reconciler = Reconciler::new(
        cancel,
        settings,
        Arc::new(transport),
        remote,
        picker,
        effects,
    );

    reconciler.run().await
}
