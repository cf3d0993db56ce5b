use std::path::{Path, PathBuf};
use log::debug;
use tokio::process::Command;
use tokio::spawn;

use crate::config::types::NotificationConfig;

/// Fire-and-forget desktop notifications.
pub trait Notifier: Send {
    fn notify(&self, message: &str);
}

pub struct NotifySend {
    program: PathBuf,
    app_name: String,
    enabled: bool,
}

impl NotifySend {
    pub fn new(config: &NotificationConfig) -> Self {
        NotifySend {
            program: PathBuf::from(&config.program),
            app_name: config.app_name.clone(),
            enabled: config.enabled,
        }
    }

    fn available(&self) -> bool {
        self.enabled && Path::new(&self.program).is_file()
    }
}

impl Notifier for NotifySend {
    fn notify(&self, message: &str) {
        if !self.available() {
            return;
        }

        let mut command = Command::new(&self.program);
        command.arg("-a").arg(&self.app_name).arg(message);

        spawn(async move {
            match command.status().await {
                Ok(status) if !status.success() => debug!("notify-send exited with {}", status),
                Ok(_) => {},
                Err(err) => debug!("Failed to run notify-send: {}", err),
            }
        });
    }
}
