// Timeline - time-ordered note material for one loaded piece
// Pure data: built once per successful decode, replaced wholesale on the
// next load, never mutated in place

use super::note::NoteEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Standard MIDI resolution, used when a source declares none.
pub const DEFAULT_PPQ: u32 = 480;

/// Tempo assumed when the source material declares none.
pub const DEFAULT_SOURCE_TEMPO_BPM: f64 = 120.0;

/// Tempo in BPM (Beats Per Minute), clamped to the playable range.
///
/// Out-of-range values are clamped rather than rejected so that any
/// caller-supplied tempo is safe to apply mid-session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 30.0;
    pub const MAX_BPM: f64 = 240.0;

    /// Creates a tempo, clamping into [30, 240]
    pub fn new(bpm: f64) -> Self {
        let bpm = if bpm.is_finite() {
            bpm.clamp(Self::MIN_BPM, Self::MAX_BPM)
        } else {
            DEFAULT_SOURCE_TEMPO_BPM
        };
        Self { bpm }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat (quarter note) in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one tick in seconds at the given resolution
    pub fn tick_duration_seconds(&self, ppq: u32) -> f64 {
        self.beat_duration_seconds() / ppq.max(1) as f64
    }

    /// Wall-clock length of a tick span at the given resolution
    pub fn ticks_to_duration(&self, ticks: u64, ppq: u32) -> Duration {
        Duration::from_secs_f64(ticks as f64 * self.tick_duration_seconds(ppq))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_TEMPO_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Time-ordered, duration-bearing note sequence for one piece.
///
/// Events are sorted ascending by start tick at construction; ties keep
/// decode order. The header carries the source resolution and declared
/// tempo plus the total sounding length at that tempo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTimeline {
    events: Vec<NoteEvent>,
    ppq: u32,
    source_tempo_bpm: f64,
    duration_seconds: f64,
}

impl NoteTimeline {
    /// Build a timeline from decoded events
    pub fn new(mut events: Vec<NoteEvent>, ppq: u32, source_tempo_bpm: f64) -> Self {
        let ppq = if ppq == 0 { DEFAULT_PPQ } else { ppq };
        let source_tempo_bpm = if source_tempo_bpm.is_finite() && source_tempo_bpm > 0.0 {
            source_tempo_bpm
        } else {
            DEFAULT_SOURCE_TEMPO_BPM
        };

        // Stable sort: events sharing a start tick keep decode order
        events.sort_by_key(|event| event.start_tick);

        let max_end = events.iter().map(NoteEvent::end_tick).max().unwrap_or(0);
        let duration_seconds = max_end as f64 * (60.0 / source_tempo_bpm) / ppq as f64;

        Self {
            events,
            ppq,
            source_tempo_bpm,
            duration_seconds,
        }
    }

    /// Timeline with no material loaded
    pub fn empty() -> Self {
        Self::new(Vec::new(), DEFAULT_PPQ, DEFAULT_SOURCE_TEMPO_BPM)
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Ticks per quarter note
    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    /// Tempo declared by the source material
    pub fn source_tempo_bpm(&self) -> f64 {
        self.source_tempo_bpm
    }

    /// Total sounding length in seconds at the source tempo
    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Last note-off tick across all events (0 for an empty timeline)
    pub fn max_end_tick(&self) -> u64 {
        self.events.iter().map(NoteEvent::end_tick).max().unwrap_or(0)
    }
}
