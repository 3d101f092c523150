// MIDI output sampler - plays notes through a hardware or virtual port
// No synthesis happens here; the connected instrument renders the sound

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use midir::{MidiOutput, MidiOutputConnection};
use tracing::{debug, warn};

use crate::error::SamplerLoadError;
use crate::sequencer::FireTime;

use super::sampler::Sampler;

const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;
const CONTROL_CHANGE: u8 = 0xB0;
const CC_ALL_NOTES_OFF: u8 = 123;

type SharedConnection = Arc<Mutex<Option<MidiOutputConnection>>>;

/// Sampler backed by a `midir` output port.
///
/// `ensure_loaded` opens the port on first use. Note-offs are emitted by
/// a deadline worker once a note's sounding duration has elapsed, so an
/// explicit transport stop never leaves notes stuck. Gain scales the
/// outgoing velocity; MIDI has no per-note gain ramp, so the ramp
/// argument is accepted and applied immediately.
pub struct MidiOutputSampler {
    port_name: Option<String>,
    connection: SharedConnection,
    releases: Sender<(Instant, u8)>,
    gain: AtomicU32,
}

impl MidiOutputSampler {
    /// Create a sampler that connects to `port_name`, or to the first
    /// available output port when `None`.
    pub fn new(port_name: Option<String>) -> Self {
        let connection: SharedConnection = Arc::new(Mutex::new(None));
        let (releases, rx) = mpsc::channel();

        let worker_connection = Arc::clone(&connection);
        thread::spawn(move || release_worker(worker_connection, rx));

        Self {
            port_name,
            connection,
            releases,
            gain: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    fn gain_value(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

impl Default for MidiOutputSampler {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Sampler for MidiOutputSampler {
    fn ensure_loaded(&self) -> Result<(), SamplerLoadError> {
        let mut connection = self.connection.lock().unwrap();
        if connection.is_some() {
            return Ok(());
        }

        let output = MidiOutput::new("klavier output")
            .map_err(|e| SamplerLoadError::Backend(e.to_string()))?;

        let ports = output.ports();
        let port = match &self.port_name {
            Some(name) => ports
                .iter()
                .find(|port| output.port_name(port).is_ok_and(|n| &n == name))
                .ok_or(SamplerLoadError::NoOutputPort)?,
            None => ports.first().ok_or(SamplerLoadError::NoOutputPort)?,
        };

        let name = output.port_name(port).unwrap_or_else(|_| "unknown".into());
        let opened = output
            .connect(port, "klavier-playback")
            .map_err(|e| SamplerLoadError::Backend(e.to_string()))?;

        debug!(port = %name, "MIDI output connected");
        *connection = Some(opened);
        Ok(())
    }

    fn trigger_attack_release(&self, pitch: u8, velocity: f32, duration: Duration, at: FireTime) {
        let scaled = (velocity.clamp(0.0, 1.0) * self.gain_value() * 127.0).round() as u8;

        {
            let mut connection = self.connection.lock().unwrap();
            let Some(connection) = connection.as_mut() else {
                return;
            };
            if let Err(e) = connection.send(&[NOTE_ON, pitch, scaled.min(127)]) {
                warn!(pitch, "note trigger failed: {e}");
                return;
            }
        }

        let _ = self.releases.send((at.due + duration, pitch));
    }

    fn set_gain(&self, level: f32, _ramp: Duration) {
        self.gain
            .store(level.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

fn release_worker(connection: SharedConnection, rx: Receiver<(Instant, u8)>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, u8)>> = BinaryHeap::new();

    loop {
        let timeout = deadlines
            .peek()
            .map(|Reverse((due, _))| due.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::from_secs(3600));

        match rx.recv_timeout(timeout) {
            Ok(entry) => deadlines.push(Reverse(entry)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        while let Some(Reverse((due, pitch))) = deadlines.peek().copied() {
            if due > now {
                break;
            }
            deadlines.pop();
            send_note_off(&connection, pitch);
        }
    }

    // Owner dropped: silence anything still sounding
    if let Ok(mut guard) = connection.lock() {
        if let Some(connection) = guard.as_mut() {
            let _ = connection.send(&[CONTROL_CHANGE, CC_ALL_NOTES_OFF, 0]);
        }
    }
}

fn send_note_off(connection: &SharedConnection, pitch: u8) {
    if let Ok(mut guard) = connection.lock() {
        if let Some(connection) = guard.as_mut() {
            let _ = connection.send(&[NOTE_OFF, pitch, 0]);
        }
    }
}
