use std::f32::consts::TAU;

use super::waveform::{wrap_phase, Waveform};

/// Free running low frequency oscillator, used as vibrato source.
#[derive(Debug, Clone)]
pub struct Lfo {
    rate: f32, // Hz
    waveform: Waveform,
    phase: f32,
}

impl Lfo {
    pub fn new(rate: f32) -> Self {
        Self::with_waveform(rate, Waveform::Sine)
    }

    pub fn with_waveform(rate: f32, waveform: Waveform) -> Self {
        Self {
            rate: rate.max(0.0),
            waveform,
            phase: 0.0,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = rate.max(0.0);
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Current output in [-1, 1].
    pub fn value(&self) -> f32 {
        self.waveform.evaluate(self.phase)
    }

    /// Advances the oscillator by `delta_time` seconds.
    pub fn tick(&mut self, delta_time: f32) {
        self.phase = wrap_phase(self.phase + TAU * self.rate * delta_time);
    }
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(5.0)
    }
}
