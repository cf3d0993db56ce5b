use crate::device::constants::BATTERY_BANDS;
use crate::device::types::DeviceSnapshot;
use crate::ui::types::{PickerCommand, PickerOption};

const LINKED_GLYPH: &str = "\u{f0c1}";
const UNLINKED_GLYPH: &str = "\u{f127}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatteryBand {
    Critical,
    Low,
    Half,
    High,
    Full,
}

impl BatteryBand {
    pub fn from_percentage(percentage: u8) -> Self {
        let [full, high, half, low] = BATTERY_BANDS;
        match percentage {
            p if p >= full => BatteryBand::Full,
            p if p >= high => BatteryBand::High,
            p if p >= half => BatteryBand::Half,
            p if p >= low => BatteryBand::Low,
            _ => BatteryBand::Critical,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BatteryBand::Full => "\u{f240}",
            BatteryBand::High => "\u{f241}",
            BatteryBand::Half => "\u{f242}",
            BatteryBand::Low => "\u{f243}",
            BatteryBand::Critical => "\u{f244}",
        }
    }
}

pub fn battery_label(percentage: u8) -> String {
    format!("{}   {}%", BatteryBand::from_percentage(percentage).icon(), percentage)
}

pub fn format_label(device: &DeviceSnapshot) -> String {
    let glyph = if device.connected { LINKED_GLYPH } else { UNLINKED_GLYPH };
    format!("{}  {}", glyph, device.alias)
}

/// Projects a snapshot into its picker entry.
pub fn build_option(device: &DeviceSnapshot) -> PickerOption {
    let primary = if device.connected { PickerCommand::Disconnect } else { PickerCommand::Connect };

    // remote devices show the owning host; the value key already carries it
    let value = device.identity.value_key();
    let mut info = vec![value.clone()];

    if device.connected {
        if let Some(percentage) = device.battery {
            info.push(battery_label(percentage));
        }
    }

    PickerOption {
        label: format_label(device),
        value,
        icon: device.icon.clone(),
        info,
        commands: vec![primary, PickerCommand::Controls],
    }
}
