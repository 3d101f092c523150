// Klavier - MIDI playback scheduling and note-lifecycle engine
// Library exports for consumers and integration tests

pub mod audio;
pub mod error;
pub mod midi;
pub mod player;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use audio::{MidiOutputSampler, Sampler};
pub use error::{DecodeError, DeviceAccessError, FetchError, RemoteLoadError, SamplerLoadError};
pub use midi::{LiveInputBridge, MidiDeviceInfo, NoteMessage, list_input_devices};
pub use player::{Player, SongRef};
pub use sequencer::{
    CursorState, FireTime, NoteEvent, NoteGroup, NoteTimeline, PlaybackScheduler,
    SharedPlaybackState, Tempo, TickTransport, TransportClock,
};
