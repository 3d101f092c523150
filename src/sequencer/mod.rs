// Sequencer module - timeline, transport clock, playback scheduling and
// the notation cursor

pub mod clock;
pub mod cursor;
pub mod note;
pub mod scheduler;
pub mod timeline;

pub use clock::{ClockCallback, ClockHandle, FireTime, TickTransport, TransportClock};
pub use cursor::{
    CursorState, GROUPS_PER_PAGE, NoteGroup, find_group_containing, group_by_tick, page_window,
};
pub use note::{DEFAULT_VELOCITY, NoteEvent};
pub use scheduler::{PlaybackScheduler, SharedPlaybackState, START_LEAD, VOLUME_RAMP};
pub use timeline::{DEFAULT_PPQ, DEFAULT_SOURCE_TEMPO_BPM, NoteTimeline, Tempo};
