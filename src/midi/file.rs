// MIDI file adapter - decoded container events to a note timeline
// Container parsing is delegated to `midly`; this module only pairs
// note-on/note-off events into duration-bearing notes

use std::collections::{HashMap, VecDeque};

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::error::DecodeError;
use crate::sequencer::{DEFAULT_PPQ, DEFAULT_SOURCE_TEMPO_BPM, NoteEvent, NoteTimeline};

/// Decode a standard MIDI file into a playback timeline.
///
/// Every track contributes `(tick, duration, pitch, velocity, track)`
/// tuples: each note-on is paired with the earliest matching note-off on
/// the same channel and key, and notes still sounding when their track
/// ends are closed at the track's final tick. The header supplies the
/// resolution (480 when the file uses SMPTE timing) and the first tempo
/// meta event supplies the source tempo, 120 BPM when absent.
pub fn decode(bytes: &[u8]) -> Result<NoteTimeline, DecodeError> {
    let smf = Smf::parse(bytes)?;

    let ppq = match smf.header.timing {
        Timing::Metrical(ticks_per_beat) => u32::from(ticks_per_beat.as_int()),
        Timing::Timecode(..) => DEFAULT_PPQ,
    };

    let mut source_tempo_bpm = None;
    let mut events = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut tick = 0u64;

        // (channel, key) -> onsets awaiting their note-off, oldest first
        let mut pending: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();

        for event in track {
            tick += u64::from(event.delta.as_int());

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_beat)) => {
                    if source_tempo_bpm.is_none() {
                        source_tempo_bpm = Some(60_000_000.0 / f64::from(us_per_beat.as_int()));
                    }
                }
                TrackEventKind::Midi { channel, message } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        pending
                            .entry((channel.as_int(), key.as_int()))
                            .or_default()
                            .push_back((tick, vel.as_int()));
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        if let Some(onsets) = pending.get_mut(&(channel.as_int(), key.as_int())) {
                            if let Some((start, velocity)) = onsets.pop_front() {
                                events.push(note_event(
                                    start,
                                    tick,
                                    key.as_int(),
                                    velocity,
                                    track_index,
                                ));
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        // Close anything the track never released
        for ((_, key), onsets) in pending {
            for (start, velocity) in onsets {
                events.push(note_event(start, tick, key, velocity, track_index));
            }
        }
    }

    let source_tempo_bpm = source_tempo_bpm.unwrap_or(DEFAULT_SOURCE_TEMPO_BPM);
    debug!(
        notes = events.len(),
        ppq,
        bpm = source_tempo_bpm,
        "decoded MIDI source"
    );

    Ok(NoteTimeline::new(events, ppq, source_tempo_bpm))
}

fn note_event(start: u64, end: u64, pitch: u8, velocity: u8, track: usize) -> NoteEvent {
    NoteEvent::new(
        start,
        end.saturating_sub(start),
        pitch,
        f32::from(velocity) / 127.0,
    )
    .with_track(track)
}
