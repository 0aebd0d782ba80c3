use crate::error::{Error, Result};

/// Fixed audio format and polyphony of a [`Synth`](super::engine::Synth), set at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthConfig {
    pub sample_rate: u32,
    /// Output channels. Every channel receives the same mono signal.
    pub channels: usize,
    pub max_voices: usize,
}

impl SynthConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(Error::InvalidConfig("channel count must be > 0".to_string()));
        }
        if self.max_voices == 0 {
            return Err(Error::InvalidConfig("max voices must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100, // Standard audio sample rate
            channels: 2,
            max_voices: 16,
        }
    }
}
