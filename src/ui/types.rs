use std::fmt;
use std::future::Future;
use std::str::FromStr;

use crate::error::UiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickerCommand {
    Connect,
    Disconnect,
    Controls,
}

impl PickerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickerCommand::Connect => "connect",
            PickerCommand::Disconnect => "disconnect",
            PickerCommand::Controls => "controls",
        }
    }
}

impl fmt::Display for PickerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PickerCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(PickerCommand::Connect),
            "disconnect" => Ok(PickerCommand::Disconnect),
            "controls" => Ok(PickerCommand::Controls),
            other => Err(format!("unknown command {:?}", other)),
        }
    }
}

/// A display-ready entry. Always derived from a device snapshot, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerOption {
    pub label: String,
    pub value: String,
    pub icon: String,
    pub info: Vec<String>,
    // the first command is the primary one
    pub commands: Vec<PickerCommand>,
}

impl PickerOption {
    pub fn primary_command(&self) -> Option<PickerCommand> {
        self.commands.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerView {
    pub prompt: String,
    pub message: String,
    pub options: Vec<PickerOption>,
}

/// The user picked `command` on the option with value key `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub value: String,
    pub command: PickerCommand,
}

/// The list picker front end.
pub trait Picker: Send {
    fn render(&mut self, view: &PickerView) -> Result<(), UiError>;

    /// `None` once the user aborted the selection.
    /// Must be cancel safe: it is raced against source updates.
    fn next_event(&mut self) -> impl Future<Output = Option<UiEvent>> + Send;
}
