// Note events for the playback timeline
// One event is one musical note occurrence extracted from a MIDI source

use serde::{Deserialize, Serialize};

/// Velocity applied when the source material declares none.
pub const DEFAULT_VELOCITY: f32 = 0.9;

/// One musical note occurrence.
///
/// Positions and durations are in ticks relative to the owning
/// timeline's pulses-per-quarter-note resolution. Values are normalized
/// at construction: durations below one tick are clamped up (zero-length
/// events cannot be scheduled) and velocity is clamped into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset position in ticks
    pub start_tick: u64,

    /// Sounding length in ticks (always >= 1)
    pub duration_ticks: u64,

    /// MIDI note number (0-127, where 60 = C4)
    pub pitch: u8,

    /// Normalized loudness in [0, 1]
    pub velocity: f32,

    /// Source track index, when the file distinguishes hands/voices
    pub track: Option<usize>,
}

impl NoteEvent {
    /// Creates a normalized note event
    pub fn new(start_tick: u64, duration_ticks: u64, pitch: u8, velocity: f32) -> Self {
        assert!(pitch <= 127, "MIDI pitch must be 0-127");

        Self {
            start_tick,
            duration_ticks: duration_ticks.max(1),
            pitch,
            velocity: if velocity.is_finite() {
                velocity.clamp(0.0, 1.0)
            } else {
                DEFAULT_VELOCITY
            },
            track: None,
        }
    }

    /// Attach the source track index
    pub fn with_track(mut self, track: usize) -> Self {
        self.track = Some(track);
        self
    }

    /// Tick at which the note stops sounding
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    /// Get the note name (e.g., "C4", "A#5")
    pub fn note_name(&self) -> String {
        const NOTE_NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];

        let octave = (self.pitch / 12) as i32 - 1;
        let note_index = (self.pitch % 12) as usize;

        format!("{}{}", NOTE_NAMES[note_index], octave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = NoteEvent::new(480, 240, 60, 0.8);

        assert_eq!(note.start_tick, 480);
        assert_eq!(note.duration_ticks, 240);
        assert_eq!(note.pitch, 60);
        assert_eq!(note.velocity, 0.8);
        assert_eq!(note.track, None);
    }

    #[test]
    fn test_zero_duration_clamped() {
        let note = NoteEvent::new(0, 0, 60, 0.5);
        assert_eq!(note.duration_ticks, 1);
        assert_eq!(note.end_tick(), 1);
    }

    #[test]
    fn test_velocity_clamped() {
        assert_eq!(NoteEvent::new(0, 1, 60, 1.7).velocity, 1.0);
        assert_eq!(NoteEvent::new(0, 1, 60, -0.3).velocity, 0.0);
        assert_eq!(NoteEvent::new(0, 1, 60, f32::NAN).velocity, DEFAULT_VELOCITY);
    }

    #[test]
    fn test_end_tick() {
        let note = NoteEvent::new(1000, 500, 72, 0.9);
        assert_eq!(note.end_tick(), 1500);
    }

    #[test]
    fn test_with_track() {
        let note = NoteEvent::new(0, 1, 60, 0.9).with_track(1);
        assert_eq!(note.track, Some(1));
    }

    #[test]
    fn test_note_name() {
        // Middle C (C4) = MIDI note 60
        assert_eq!(NoteEvent::new(0, 1, 60, 0.9).note_name(), "C4");

        // A4 (440 Hz) = MIDI note 69
        assert_eq!(NoteEvent::new(0, 1, 69, 0.9).note_name(), "A4");

        // C#5 = MIDI note 73
        assert_eq!(NoteEvent::new(0, 1, 73, 0.9).note_name(), "C#5");
    }

    #[test]
    #[should_panic(expected = "MIDI pitch must be 0-127")]
    fn test_invalid_pitch() {
        NoteEvent::new(0, 1, 128, 0.9);
    }
}
