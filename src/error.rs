use thiserror::Error;

/// Result alias used by the fallible (non real-time) parts of the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by sixop.
///
/// Nothing on the render path returns an error: bad indices and unknown parameter
/// names are ignored there. These are only produced while constructing things or
/// when talking to the audio device.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid MIDI note number: {0}. Must be 0-127.")]
    InvalidNote(u8),
    #[error("Invalid MIDI velocity: {0}. Must be 0-127.")]
    InvalidVelocity(u8),
    #[error("Invalid synth configuration: {0}")]
    InvalidConfig(String),
    #[error("Audio output device error: {0}")]
    OutputDevice(String),
}
