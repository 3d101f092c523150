// MIDI input device enumeration

use midir::MidiInput;

use crate::error::DeviceAccessError;

/// One enumerable MIDI input device.
///
/// The id is stable within a single enumeration; the name is what the
/// platform reports and what connections are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub id: String,
    pub name: String,
}

impl MidiDeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// List the MIDI input devices currently present.
pub fn list_input_devices() -> Result<Vec<MidiDeviceInfo>, DeviceAccessError> {
    let midi_in = MidiInput::new("klavier scanner")?;

    let mut devices = Vec::new();
    for (index, port) in midi_in.ports().iter().enumerate() {
        let name = midi_in.port_name(port)?;
        devices.push(MidiDeviceInfo::new(format!("midi_in_{index}"), name));
    }

    Ok(devices)
}
