// Error taxonomy - every failure degrades a feature, never the process

use thiserror::Error;

/// Malformed or unreadable source material.
///
/// Recovered locally: the timeline is cleared and playback controls
/// stay disabled until the next successful load.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed MIDI data: {0}")]
    Malformed(#[from] midly::Error),
}

/// MIDI device access failed or was denied.
///
/// Live input degrades to unavailable; file playback is unaffected.
#[derive(Debug, Error)]
pub enum DeviceAccessError {
    #[error("MIDI subsystem unavailable: {0}")]
    Unavailable(#[from] midir::InitError),
    #[error("failed to query MIDI port: {0}")]
    PortInfo(#[from] midir::PortInfoError),
    #[error("MIDI input device not found: {0}")]
    NotFound(String),
    #[error("failed to open MIDI input '{name}': {reason}")]
    Connect { name: String, reason: String },
}

/// Remote song retrieval failed, including non-success HTTP status.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
}

/// The sampler's one-time asset load failed; starting playback aborts
/// without scheduling anything.
#[derive(Debug, Error)]
pub enum SamplerLoadError {
    #[error("no MIDI output port available")]
    NoOutputPort,
    #[error("sampler backend failed: {0}")]
    Backend(String),
}

/// Combined failure of the fetch-then-play flow.
#[derive(Debug, Error)]
pub enum RemoteLoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Sampler(#[from] SamplerLoadError),
}
