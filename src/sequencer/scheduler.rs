// Playback scheduler - drives one playback session over the transport
// Converts a note timeline into scheduled on/off triggers, tracks the
// sounding pitch set and owns session lifecycle (start, stop, auto-stop)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::audio::sampler::Sampler;
use crate::error::SamplerLoadError;

use super::clock::{ClockHandle, TransportClock};
use super::timeline::{DEFAULT_PPQ, NoteTimeline, Tempo};

/// Lead time before tick zero when starting the transport, absorbing
/// engine spin-up so the first notes are not distorted.
pub const START_LEAD: Duration = Duration::from_millis(50);

/// Ramp applied to volume changes.
pub const VOLUME_RAMP: Duration = Duration::from_millis(30);

/// Playback state shared with clock callbacks and presentation readers.
///
/// The pressed set is reference-counted per pitch: a pitch already
/// pressed by an overlapping earlier note is not duplicated, and it only
/// clears on the last matching note-off, so overlapping same-pitch notes
/// read as pressed continuously.
pub struct SharedPlaybackState {
    pressed: Mutex<BTreeMap<u8, u32>>,
    playing: AtomicBool,
    handles: Mutex<Vec<ClockHandle>>,
    tempo: Mutex<Tempo>,
    ppq: AtomicU32,
}

impl SharedPlaybackState {
    fn new() -> Self {
        Self {
            pressed: Mutex::new(BTreeMap::new()),
            playing: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
            tempo: Mutex::new(Tempo::default()),
            ppq: AtomicU32::new(DEFAULT_PPQ),
        }
    }

    fn press(&self, pitch: u8) {
        *self.pressed.lock().unwrap().entry(pitch).or_insert(0) += 1;
    }

    /// Tolerant of a pitch that is not pressed
    fn release(&self, pitch: u8) {
        let mut pressed = self.pressed.lock().unwrap();
        if let Some(count) = pressed.get_mut(&pitch) {
            *count -= 1;
            if *count == 0 {
                pressed.remove(&pitch);
            }
        }
    }

    fn clear(&self) {
        self.pressed.lock().unwrap().clear();
    }

    fn set_tempo(&self, tempo: Tempo) {
        *self.tempo.lock().unwrap() = tempo;
    }

    fn set_ppq(&self, ppq: u32) {
        self.ppq.store(ppq, Ordering::Relaxed);
    }

    /// Pitches currently sounding, ascending
    pub fn pressed_pitches(&self) -> Vec<u8> {
        self.pressed.lock().unwrap().keys().copied().collect()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Tempo of the current session
    pub fn tempo(&self) -> Tempo {
        *self.tempo.lock().unwrap()
    }

    /// Resolution of the current session
    pub fn ppq(&self) -> u32 {
        self.ppq.load(Ordering::Relaxed)
    }
}

impl Default for SharedPlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

/// Schedules one playback session at a time over an injected transport
/// clock and sampler.
///
/// At most one session is active: starting tears down any prior session
/// first, because the transport is a shared resource.
pub struct PlaybackScheduler {
    clock: Arc<dyn TransportClock>,
    sampler: Arc<dyn Sampler>,
    shared: Arc<SharedPlaybackState>,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn TransportClock>, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            clock,
            sampler,
            shared: Arc::new(SharedPlaybackState::new()),
        }
    }

    /// Shared state handle for presentation readers
    pub fn shared(&self) -> Arc<SharedPlaybackState> {
        Arc::clone(&self.shared)
    }

    pub fn pressed_pitches(&self) -> Vec<u8> {
        self.shared.pressed_pitches()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn tempo(&self) -> Tempo {
        self.shared.tempo()
    }

    /// Start a playback session over `timeline`.
    ///
    /// Any active session is torn down first. A timeline with no events
    /// is a no-op, not an error. If the sampler fails its one-time load
    /// the session aborts with nothing scheduled and nothing marked
    /// playing.
    pub fn start(&mut self, timeline: &NoteTimeline, tempo: Tempo) -> Result<(), SamplerLoadError> {
        self.stop();

        if timeline.is_empty() {
            return Ok(());
        }

        self.sampler.ensure_loaded()?;

        self.shared.set_ppq(timeline.ppq());
        self.shared.set_tempo(tempo);
        self.clock.set_resolution(timeline.ppq());
        self.clock.set_tempo(tempo);
        self.clock.reset_position();

        // The full event list is registered before the transport runs,
        // so nothing here races the clock.
        let mut handles = Vec::with_capacity(timeline.len() * 2 + 1);
        let mut max_end_tick = 0u64;

        for event in timeline.events() {
            let end_tick = event.end_tick();
            max_end_tick = max_end_tick.max(end_tick);

            let pitch = event.pitch;
            let velocity = event.velocity.clamp(0.0, 1.0);
            let duration_ticks = event.duration_ticks;

            let sampler = Arc::clone(&self.sampler);
            let shared = Arc::clone(&self.shared);
            handles.push(self.clock.schedule_at(
                event.start_tick,
                Box::new(move |at| {
                    // Sounding length in wall time under the tempo in
                    // force when the note actually fires.
                    let duration = shared.tempo().ticks_to_duration(duration_ticks, shared.ppq());
                    sampler.trigger_attack_release(pitch, velocity, duration, at);
                    shared.press(pitch);
                }),
            ));

            let shared = Arc::clone(&self.shared);
            handles.push(
                self.clock
                    .schedule_at(end_tick, Box::new(move |_| shared.release(pitch))),
            );
        }

        // Auto-stop once the last note-off has fired. Cancellable like
        // any other handle by an explicit stop.
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        handles.push(self.clock.schedule_once(
            max_end_tick + 1,
            Box::new(move |_| {
                shared.clear();
                shared.playing.store(false, Ordering::Relaxed);
                shared.handles.lock().unwrap().clear();
                clock.stop();
                clock.reset_position();
            }),
        ));

        *self.shared.handles.lock().unwrap() = handles;
        self.shared.playing.store(true, Ordering::Relaxed);
        self.clock.start(START_LEAD);

        debug!(
            events = timeline.len(),
            bpm = tempo.bpm(),
            "playback session started"
        );
        Ok(())
    }

    /// Universal reset: cancels every pending callback, stops and
    /// rewinds the transport, clears the pressed set. Callable from any
    /// state; calling it when nothing is playing is a safe no-op.
    pub fn stop(&mut self) {
        let handles: Vec<ClockHandle> = std::mem::take(&mut *self.shared.handles.lock().unwrap());
        for handle in handles {
            self.clock.cancel(handle);
        }
        self.clock.cancel_all();
        self.clock.stop();
        self.clock.reset_position();
        self.shared.clear();
        self.shared.playing.store(false, Ordering::Relaxed);
    }

    /// Re-base the session tempo. Already-scheduled callbacks keep their
    /// tick positions and fire at the new effective wall time; nothing
    /// is rescheduled.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.shared.set_tempo(tempo);
        self.clock.set_tempo(tempo);
    }

    /// Forward a volume change to the sampler gain stage
    pub fn set_volume(&self, level: f32) {
        self.sampler.set_gain(level.clamp(0.0, 1.0), VOLUME_RAMP);
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        // The auto-stop callback keeps a clock handle alive; tearing the
        // session down here releases it even when the owner never called
        // stop explicitly.
        self.stop();
    }
}
