// Live input bridge - device events to pressed-note state
// Feeds the same pressed-pitch representation the playback scheduler
// produces, so visual consumers are agnostic to the note source

use std::collections::{BTreeSet, VecDeque};

use midir::{MidiInput, MidiInputConnection};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use tracing::warn;

use crate::error::DeviceAccessError;

use super::device::MidiDeviceInfo;
use super::event::NoteMessage;

/// Most recent input events kept for display.
pub const HISTORY_LIMIT: usize = 20;

/// Raw 3-byte MIDI message as delivered by a device.
pub type RawMessage = [u8; 3];

pub type RawMessageProducer = ringbuf::HeapProd<RawMessage>;
pub type RawMessageConsumer = ringbuf::HeapCons<RawMessage>;

/// Lock-free channel between the device callback thread and the bridge.
pub fn create_raw_message_channel(capacity: usize) -> (RawMessageProducer, RawMessageConsumer) {
    let rb = HeapRb::<RawMessage>::new(capacity);
    rb.split()
}

/// Converts raw device events into pressed-pitch state plus a bounded
/// event history, and owns the device-selection policy.
///
/// While no explicit selection exists, the first enumerated device is
/// auto-selected, and hot-plug events re-run that auto-selection. An
/// explicit user selection is never silently overridden by a later
/// hot-plug event.
#[derive(Debug, Default)]
pub struct LiveInputBridge {
    devices: Vec<MidiDeviceInfo>,
    selected: Option<String>,
    explicit_selection: bool,
    pressed: BTreeSet<u8>,
    history: VecDeque<NoteMessage>,
}

impl LiveInputBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fresh device enumeration (initial listing or hot-plug)
    pub fn sync_devices(&mut self, devices: Vec<MidiDeviceInfo>) {
        self.devices = devices;
        if !self.explicit_selection {
            self.selected = self.devices.first().map(|device| device.id.clone());
        }
    }

    /// Explicitly select a device by id; survives later hot-plug events
    pub fn select_device(&mut self, id: &str) {
        self.selected = Some(id.to_string());
        self.explicit_selection = true;
    }

    /// The device input should be read from: the selection when present,
    /// otherwise the first available device
    pub fn active_device(&self) -> Option<&MidiDeviceInfo> {
        self.selected
            .as_deref()
            .and_then(|id| self.devices.iter().find(|device| device.id == id))
            .or_else(|| self.devices.first())
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn devices(&self) -> &[MidiDeviceInfo] {
        &self.devices
    }

    /// Feed one raw device message through the bridge
    pub fn handle_message(&mut self, bytes: &[u8]) {
        let Some(message) = NoteMessage::from_bytes(bytes) else {
            return;
        };

        match message {
            NoteMessage::On { pitch, .. } => {
                self.pressed.insert(pitch);
            }
            NoteMessage::Off { pitch } => {
                self.pressed.remove(&pitch);
            }
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(message);
    }

    /// Drain every message queued by the device callback
    pub fn poll(&mut self, rx: &mut RawMessageConsumer) {
        while let Some(message) = rx.try_pop() {
            self.handle_message(&message);
        }
    }

    /// Pitches currently held down, ascending
    pub fn pressed_pitches(&self) -> Vec<u8> {
        self.pressed.iter().copied().collect()
    }

    /// Most recent events, oldest first
    pub fn history(&self) -> impl Iterator<Item = &NoteMessage> {
        self.history.iter()
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
        self.history.clear();
    }
}

/// Open connection delivering raw messages from one device.
///
/// Dropping the listener closes the connection.
pub struct MidiInputListener {
    _connection: MidiInputConnection<()>,
}

impl MidiInputListener {
    /// Connect to `device` and forward every raw message into `tx`.
    pub fn connect(
        device: &MidiDeviceInfo,
        mut tx: RawMessageProducer,
    ) -> Result<Self, DeviceAccessError> {
        let midi_in = MidiInput::new("klavier input")?;

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .is_ok_and(|name| name == device.name)
            })
            .ok_or_else(|| DeviceAccessError::NotFound(device.name.clone()))?;

        let connection = midi_in
            .connect(
                port,
                "klavier-input",
                move |_timestamp, message, _| {
                    // Device callback runs on the driver thread: forward
                    // and get out, never block.
                    if message.len() < 3 {
                        return;
                    }
                    let raw = [message[0], message[1], message[2]];
                    if tx.try_push(raw).is_err() {
                        warn!("input buffer full, MIDI event dropped");
                    }
                },
                (),
            )
            .map_err(|e| DeviceAccessError::Connect {
                name: device.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            _connection: connection,
        })
    }
}
