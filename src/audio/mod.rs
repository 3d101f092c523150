// Audio module - the sampler capability and its MIDI-output adapter

pub mod midi_out;
pub mod sampler;

pub use midi_out::MidiOutputSampler;
pub use sampler::Sampler;
