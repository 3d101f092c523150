// Sampler capability - the external instrument playback engine
// The scheduler triggers attack-release envelopes against this trait;
// production wiring decides what actually makes sound

use std::time::Duration;

use crate::error::SamplerLoadError;
use crate::sequencer::FireTime;

/// Instrument playback engine consumed by the scheduler.
pub trait Sampler: Send + Sync {
    /// Block until the sampler's one-time asset load has completed.
    ///
    /// This is a one-shot gate: subsequent calls are cheap. A failed
    /// load leaves the sampler unusable and the caller aborts playback.
    fn ensure_loaded(&self) -> Result<(), SamplerLoadError>;

    /// Trigger a note with an implicit release after `duration`.
    ///
    /// `at` is the transport-provided fire time; implementations able to
    /// schedule ahead should anchor on it instead of "now" so dispatch
    /// latency does not shift the audible onset.
    fn trigger_attack_release(&self, pitch: u8, velocity: f32, duration: Duration, at: FireTime);

    /// Set output gain in [0, 1], ramped over `ramp`.
    fn set_gain(&self, level: f32, ramp: Duration);
}
