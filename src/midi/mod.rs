// MIDI module - raw events, device access, live input and the file
// decode adapter

pub mod device;
pub mod event;
pub mod file;
pub mod input;

pub use device::{MidiDeviceInfo, list_input_devices};
pub use event::NoteMessage;
pub use input::{
    HISTORY_LIMIT, LiveInputBridge, MidiInputListener, RawMessage, create_raw_message_channel,
};
