// Player facade - load and playback orchestration for one piece at a time
// One component owns the loaded timeline, the scheduler and the
// user-visible load state

use std::sync::Arc;

use tracing::debug;

use crate::audio::sampler::Sampler;
use crate::error::{DecodeError, FetchError, RemoteLoadError, SamplerLoadError};
use crate::midi::file;
use crate::sequencer::{
    NoteTimeline, PlaybackScheduler, SharedPlaybackState, Tempo, TransportClock,
};

/// Default output volume.
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Reference to a song in a remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRef {
    pub label: String,
    pub url: String,
}

impl SongRef {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Session orchestration over the playback scheduler: holds the loaded
/// timeline (replaced wholesale on every load), the UI tempo and volume,
/// and the last user-visible load failure.
pub struct Player {
    scheduler: PlaybackScheduler,
    timeline: NoteTimeline,
    source_name: Option<String>,
    tempo: Tempo,
    volume: f32,
    load_error: Option<String>,
}

impl Player {
    pub fn new(clock: Arc<dyn TransportClock>, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            scheduler: PlaybackScheduler::new(clock, sampler),
            timeline: NoteTimeline::empty(),
            source_name: None,
            tempo: Tempo::default(),
            volume: DEFAULT_VOLUME,
            load_error: None,
        }
    }

    /// Load a piece from raw SMF bytes, replacing any current one.
    ///
    /// Active playback stops first. On decode failure the timeline is
    /// cleared and a user-visible message recorded; playback controls
    /// read as disabled because the timeline is empty, not because of a
    /// separate flag.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), DecodeError> {
        self.scheduler.stop();
        self.load_error = None;
        self.source_name = Some(name.to_string());

        match file::decode(bytes) {
            Ok(timeline) => {
                self.tempo = Tempo::new(timeline.source_tempo_bpm().round());
                self.timeline = timeline;
                debug!(name, notes = self.timeline.len(), "piece loaded");
                Ok(())
            }
            Err(e) => {
                self.timeline = NoteTimeline::empty();
                self.load_error =
                    Some("Failed to parse MIDI file. Please try a different file.".to_string());
                Err(e)
            }
        }
    }

    /// Fetch a remote song, then load and immediately play it.
    ///
    /// Playback stops before the fetch, so a failed fetch leaves
    /// playback stopped rather than corrupting a running session. The
    /// fetch capability is caller-supplied.
    pub fn load_remote(
        &mut self,
        song: &SongRef,
        fetch: impl FnOnce(&str) -> Result<Vec<u8>, FetchError>,
    ) -> Result<(), RemoteLoadError> {
        self.scheduler.stop();
        self.load_error = None;

        let bytes = match fetch(&song.url) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.load_error = Some(format!("Failed to load \"{}\".", song.label));
                return Err(RemoteLoadError::Fetch(e));
            }
        };

        if let Err(e) = self.load_bytes(&song.label, &bytes) {
            self.load_error = Some(format!("Failed to load \"{}\".", song.label));
            return Err(RemoteLoadError::Decode(e));
        }

        self.play().map_err(RemoteLoadError::Sampler)
    }

    /// Start playback of the loaded piece at the current tempo
    pub fn play(&mut self) -> Result<(), SamplerLoadError> {
        self.scheduler.start(&self.timeline, self.tempo)
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Change tempo; applies immediately to an active session
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = Tempo::new(bpm);
        self.scheduler.set_tempo(self.tempo);
    }

    /// Change output volume in [0, 1]
    pub fn set_volume(&mut self, level: f32) {
        self.volume = level.clamp(0.0, 1.0);
        self.scheduler.set_volume(self.volume);
    }

    // Read surface for the presentation layer

    pub fn timeline(&self) -> &NoteTimeline {
        &self.timeline
    }

    pub fn pressed_pitches(&self) -> Vec<u8> {
        self.scheduler.pressed_pitches()
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// Whether the play control is enabled, derived from loaded material
    pub fn can_play(&self) -> bool {
        !self.timeline.is_empty() && !self.is_playing()
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Shared playback state handle for presentation readers
    pub fn shared(&self) -> Arc<SharedPlaybackState> {
        self.scheduler.shared()
    }
}
