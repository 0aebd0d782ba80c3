use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::atomic::AtomicF32;
use super::envelope::EnvelopeParameters;
use super::waveform::{CycleDirection, Waveform};

/// Number of operators in every voice.
pub const OPERATOR_COUNT: usize = 6;

/// Static configuration of one operator, shared by all voices.
///
/// Every field is an independent atomic scalar, so setters can run on any thread while the
/// audio thread renders. Values are stored as given; range clamping, where wanted, happens in
/// the parameter layer. The renderer takes an [`OperatorSnapshot`] once per block.
#[derive(Debug)]
pub struct OperatorConfig {
    ratio: AtomicF32,           // Frequency multiplier relative to the note frequency
    fixed_frequency: AtomicF32, // Hz, 0 disables
    level: AtomicF32,
    detune: AtomicF32, // Cents
    feedback: AtomicF32,
    waveform: AtomicU8,
    velocity_sensitivity: AtomicF32,
    key_scaling: AtomicF32,
    attack: AtomicF32,
    decay: AtomicF32,
    sustain: AtomicF32,
    release: AtomicF32,
    carrier: AtomicBool,
}

/// Plain copy of an [`OperatorConfig`] taken at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorSnapshot {
    pub ratio: f32,
    pub fixed_frequency: f32,
    pub level: f32,
    pub detune: f32,
    pub feedback: f32,
    pub waveform: Waveform,
    pub velocity_sensitivity: f32,
    pub key_scaling: f32,
    pub envelope: EnvelopeParameters,
    pub carrier: bool,
}

impl OperatorSnapshot {
    /// Operator frequency in Hz for a (pitch modulated) note frequency: the fixed frequency
    /// when set, else the ratio applied to the note, then detuned.
    #[inline]
    pub fn frequency(&self, note_frequency: f32) -> f32 {
        let base = if self.fixed_frequency > 0.0 {
            self.fixed_frequency
        } else {
            note_frequency * self.ratio
        };
        base * 2.0f32.powf(self.detune / 1200.0)
    }

    /// Clamped multiplier applied to envelope speeds, higher notes run faster envelopes
    /// for positive key scaling.
    #[inline]
    pub fn key_scale(&self, note: u8) -> f32 {
        (1.0 + self.key_scaling * (note as f32 - 60.0) / 60.0).max(0.1)
    }

    /// Blends the played velocity towards full velocity as sensitivity drops.
    #[inline]
    pub fn effective_velocity(&self, velocity: u8) -> f32 {
        velocity as f32 * self.velocity_sensitivity + 127.0 * (1.0 - self.velocity_sensitivity)
    }
}

impl Default for OperatorSnapshot {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            fixed_frequency: 0.0,
            level: 1.0,
            detune: 0.0,
            feedback: 0.0,
            waveform: Waveform::Sine,
            velocity_sensitivity: 1.0,
            key_scaling: 0.0,
            envelope: EnvelopeParameters::default(),
            carrier: false,
        }
    }
}

impl OperatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: &OperatorSnapshot) -> Self {
        let config = Self {
            ratio: AtomicF32::default(),
            fixed_frequency: AtomicF32::default(),
            level: AtomicF32::default(),
            detune: AtomicF32::default(),
            feedback: AtomicF32::default(),
            waveform: AtomicU8::new(0),
            velocity_sensitivity: AtomicF32::default(),
            key_scaling: AtomicF32::default(),
            attack: AtomicF32::default(),
            decay: AtomicF32::default(),
            sustain: AtomicF32::default(),
            release: AtomicF32::default(),
            carrier: AtomicBool::new(false),
        };
        config.apply(snapshot);
        config
    }

    /// Overwrites every field with the values of `snapshot`.
    pub fn apply(&self, snapshot: &OperatorSnapshot) {
        self.ratio.store(snapshot.ratio);
        self.fixed_frequency.store(snapshot.fixed_frequency);
        self.level.store(snapshot.level);
        self.detune.store(snapshot.detune);
        self.feedback.store(snapshot.feedback);
        self.set_waveform(snapshot.waveform);
        self.velocity_sensitivity.store(snapshot.velocity_sensitivity);
        self.key_scaling.store(snapshot.key_scaling);
        self.set_envelope(snapshot.envelope);
        self.set_carrier(snapshot.carrier);
    }

    pub fn snapshot(&self) -> OperatorSnapshot {
        OperatorSnapshot {
            ratio: self.ratio.load(),
            fixed_frequency: self.fixed_frequency.load(),
            level: self.level.load(),
            detune: self.detune.load(),
            feedback: self.feedback.load(),
            waveform: self.waveform(),
            velocity_sensitivity: self.velocity_sensitivity.load(),
            key_scaling: self.key_scaling.load(),
            envelope: self.envelope(),
            carrier: self.is_carrier(),
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio.load()
    }
    pub fn set_ratio(&self, ratio: f32) {
        self.ratio.store(ratio);
    }

    pub fn fixed_frequency(&self) -> f32 {
        self.fixed_frequency.load()
    }
    pub fn set_fixed_frequency(&self, frequency: f32) {
        self.fixed_frequency.store(frequency);
    }

    pub fn level(&self) -> f32 {
        self.level.load()
    }
    pub fn set_level(&self, level: f32) {
        self.level.store(level);
    }

    pub fn detune(&self) -> f32 {
        self.detune.load()
    }
    pub fn set_detune(&self, cents: f32) {
        self.detune.store(cents);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.load()
    }
    pub fn set_feedback(&self, feedback: f32) {
        self.feedback.store(feedback);
    }

    pub fn waveform(&self) -> Waveform {
        Waveform::from_repr(self.waveform.load(Ordering::Relaxed)).unwrap_or_default()
    }
    pub fn set_waveform(&self, waveform: Waveform) {
        self.waveform.store(waveform as u8, Ordering::Relaxed);
    }
    pub fn cycle_waveform(&self, direction: CycleDirection) {
        self.set_waveform(self.waveform().cycled(direction));
    }

    pub fn velocity_sensitivity(&self) -> f32 {
        self.velocity_sensitivity.load()
    }
    pub fn set_velocity_sensitivity(&self, sensitivity: f32) {
        self.velocity_sensitivity.store(sensitivity);
    }

    pub fn key_scaling(&self) -> f32 {
        self.key_scaling.load()
    }
    pub fn set_key_scaling(&self, key_scaling: f32) {
        self.key_scaling.store(key_scaling);
    }

    pub fn envelope(&self) -> EnvelopeParameters {
        EnvelopeParameters::new(
            self.attack.load(),
            self.decay.load(),
            self.sustain.load(),
            self.release.load(),
        )
    }
    pub fn set_envelope(&self, envelope: EnvelopeParameters) {
        self.attack.store(envelope.attack);
        self.decay.store(envelope.decay);
        self.sustain.store(envelope.sustain);
        self.release.store(envelope.release);
    }
    pub fn set_attack(&self, seconds: f32) {
        self.attack.store(seconds);
    }
    pub fn set_decay(&self, seconds: f32) {
        self.decay.store(seconds);
    }
    pub fn set_sustain(&self, level: f32) {
        self.sustain.store(level);
    }
    pub fn set_release(&self, seconds: f32) {
        self.release.store(seconds);
    }

    pub fn is_carrier(&self) -> bool {
        self.carrier.load(Ordering::Relaxed)
    }
    pub fn set_carrier(&self, carrier: bool) {
        self.carrier.store(carrier, Ordering::Relaxed);
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self::from_snapshot(&OperatorSnapshot::default())
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trip() {
        let snapshot = OperatorSnapshot {
            ratio: 3.5,
            fixed_frequency: 110.0,
            level: 1.7,
            detune: -12.0,
            feedback: 0.3,
            waveform: Waveform::Sawtooth,
            velocity_sensitivity: 0.25,
            key_scaling: 0.5,
            envelope: EnvelopeParameters::new(0.5, 0.25, 0.1, 2.0),
            carrier: true,
        };
        let config = OperatorConfig::from_snapshot(&snapshot);
        assert_eq!(config.snapshot(), snapshot);
    }

    #[test]
    fn frequency_from_ratio_fixed_and_detune() {
        let mut snapshot = OperatorSnapshot {
            ratio: 2.0,
            ..Default::default()
        };
        assert_eq!(snapshot.frequency(440.0), 880.0);

        snapshot.detune = 1200.0;
        assert!((snapshot.frequency(440.0) - 1760.0).abs() < 1e-2);

        snapshot.detune = 0.0;
        snapshot.fixed_frequency = 100.0;
        assert_eq!(snapshot.frequency(440.0), 100.0);
    }

    #[test]
    fn key_scale_is_clamped() {
        let snapshot = OperatorSnapshot {
            key_scaling: 1.0,
            ..Default::default()
        };
        assert_eq!(snapshot.key_scale(60), 1.0);
        assert_eq!(snapshot.key_scale(120), 2.0);
        assert_eq!(snapshot.key_scale(0), 0.1);
    }

    #[test]
    fn velocity_sensitivity_blend() {
        let mut snapshot = OperatorSnapshot::default();
        assert_eq!(snapshot.effective_velocity(64), 64.0);
        snapshot.velocity_sensitivity = 0.0;
        assert_eq!(snapshot.effective_velocity(1), 127.0);
        snapshot.velocity_sensitivity = 0.5;
        assert_eq!(snapshot.effective_velocity(27), 77.0);
    }
}
