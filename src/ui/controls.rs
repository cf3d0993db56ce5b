use log::info;
use tokio::process::Command;

use crate::device::types::DeviceIdentity;
use crate::error::ControlsError;

/// Opens the auxiliary controls view for a device.
pub trait Controls: Send {
    fn open(&self, identity: &DeviceIdentity) -> Result<(), ControlsError>;
}

pub struct CommandControls {
    command: Vec<String>,
}

impl CommandControls {
    pub fn new(command: Vec<String>) -> Self {
        CommandControls { command }
    }

    fn expand(&self, identity: &DeviceIdentity) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                arg.replace("{address}", identity.address())
                    .replace("{host}", identity.host().unwrap_or(""))
            })
            .collect()
    }
}

impl Controls for CommandControls {
    fn open(&self, identity: &DeviceIdentity) -> Result<(), ControlsError> {
        let args = self.expand(identity);
        let Some((program, rest)) = args.split_first() else {
            return Err(ControlsError::NotConfigured);
        };

        info!("Opening controls for {}: {:?}", identity, args);
        // the child is detached, the picker does not wait for it
        Command::new(program).args(rest).spawn()?;
        Ok(())
    }
}
