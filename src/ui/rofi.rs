/*!
 * rofi-blocks front end
 * Views are written to stdout as JSON objects, one per line; rofi events arrive on stdin.
 */

use std::io::{self, Write};
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::UiError;
use crate::ui::types::{Picker, PickerCommand, PickerOption, PickerView, UiEvent};

const BACK_DATA: &str = "back";
const INFO_SPAN_OPEN: &str = "<span size=\"small\" color=\"#C3C3C3\">";
const INFO_SPAN_CLOSE: &str = "</span>";

#[derive(Debug, Serialize)]
struct RofiLine {
    text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    icon: String,
    data: String,
    markup: bool,
}

#[derive(Debug, Serialize)]
struct RofiOutput<'a> {
    prompt: &'a str,
    message: &'a str,
    #[serde(rename = "input action")]
    input_action: &'static str,
    lines: Vec<RofiLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RofiInput {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub data: String,
}

pub struct RofiBlocks<W> {
    out: W,
    input: Receiver<RofiInput>,
    view: Option<PickerView>,
    // value key of the option whose commands are shown
    expanded: Option<String>,
    // status shown when the submenu was opened
    expanded_status: String,
}

impl RofiBlocks<io::Stdout> {
    pub fn stdio(cancel: CancellationToken) -> Self {
        let (sender, receiver) = channel::<RofiInput>(8);
        read_input_task(cancel, sender);
        RofiBlocks::new(io::stdout(), receiver)
    }
}

impl<W: Write + Send> RofiBlocks<W> {
    pub fn new(out: W, input: Receiver<RofiInput>) -> Self {
        RofiBlocks { out, input, view: None, expanded: None, expanded_status: String::new() }
    }

    fn expanded_option(&self) -> Option<&PickerOption> {
        let value = self.expanded.as_ref()?;
        self.view.as_ref()?.options.iter().find(|option| &option.value == value)
    }

    fn redraw(&mut self) -> Result<(), UiError> {
        let Some(view) = self.view.as_ref() else {
            return Ok(());
        };

        let lines = match self.expanded_option() {
            Some(option) => command_lines(option),
            None => view.options.iter().map(option_line).collect(),
        };

        // a status that changed while the submenu is open wins over the label
        let message = match self.expanded_option() {
            Some(option) if view.message == self.expanded_status => escape_markup(&option.label),
            _ => escape_markup(&view.message),
        };

        let output = RofiOutput {
            prompt: &view.prompt,
            message: &message,
            input_action: "filter",
            lines,
        };

        // `output` borrows the view, serialize before touching `self.out`
        let encoded = serde_json::to_vec(&output)?;
        self.out.write_all(&encoded)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn redraw_or_warn(&mut self) {
        if let Err(err) = self.redraw() {
            warn!("Failed to redraw picker: {}", err);
        }
    }

    fn interpret(&mut self, input: RofiInput) -> Option<UiEvent> {
        if input.name != "select entry" {
            debug!("Ignoring rofi event {:?}", input.name);
            return None;
        }

        if input.data == BACK_DATA {
            self.expanded = None;
            self.redraw_or_warn();
            return None;
        }

        if let Some(value) = self.expanded.take() {
            return match input.data.parse::<PickerCommand>() {
                Ok(command) => {
                    self.redraw_or_warn();
                    Some(UiEvent { value, command })
                },
                Err(err) => {
                    warn!("Ignoring selection: {}", err);
                    self.expanded = Some(value);
                    None
                },
            };
        }

        let known = self.view.as_ref()
            .map(|view| view.options.iter().any(|option| option.value == input.data))
            .unwrap_or(false);

        if known {
            self.expanded = Some(input.data);
            self.expanded_status = self.view.as_ref()
                .map(|view| view.message.clone())
                .unwrap_or_default();
            self.redraw_or_warn();
        } else {
            debug!("Ignoring selection of unknown entry {:?}", input.data);
        }

        None
    }
}

impl<W: Write + Send> Picker for RofiBlocks<W> {
    fn render(&mut self, view: &PickerView) -> Result<(), UiError> {
        self.view = Some(view.clone());
        if self.expanded_option().is_none() {
            self.expanded = None;
        }

        self.redraw()
    }

    async fn next_event(&mut self) -> Option<UiEvent> {
        loop {
            // the receiver is the only await point, which keeps this cancel safe
            let input = self.input.next().await?;
            if let Some(event) = self.interpret(input) {
                return Some(event);
            }
        }
    }
}

fn option_line(option: &PickerOption) -> RofiLine {
    let mut text = escape_markup(&option.label);
    for info in &option.info {
        text.push('\n');
        text.push_str(INFO_SPAN_OPEN);
        text.push_str(&escape_markup(info));
        text.push_str(INFO_SPAN_CLOSE);
    }

    RofiLine {
        text,
        icon: option.icon.clone(),
        data: option.value.clone(),
        markup: true,
    }
}

fn command_lines(option: &PickerOption) -> Vec<RofiLine> {
    let mut lines: Vec<RofiLine> = option.commands
        .iter()
        .map(|command| RofiLine {
            text: command.to_string(),
            icon: String::new(),
            data: command.to_string(),
            markup: false,
        })
        .collect();

    lines.push(RofiLine {
        text: BACK_DATA.to_string(),
        icon: String::new(),
        data: BACK_DATA.to_string(),
        markup: false,
    });

    lines
}

pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn read_input_task(cancel: CancellationToken, mut sender: Sender<RofiInput>) -> JoinHandle<()> {
    spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match serde_json::from_str::<RofiInput>(&line) {
                        Ok(input) => {
                            if sender.send(input).await.is_err() {
                                break 'mainloop;
                            }
                        },
                        Err(err) => warn!("Failed to decode rofi event {:?}: {}", line, err),
                    },
                    Ok(None) => {
                        debug!("rofi closed stdin");
                        break 'mainloop;
                    },
                    Err(err) => {
                        warn!("Failed to read from rofi: {}", err);
                        break 'mainloop;
                    },
                },
            }
        }
    })
}
