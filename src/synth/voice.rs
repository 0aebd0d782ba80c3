use std::f32::consts::{PI, TAU};

use super::algorithm::Algorithm;
use super::envelope::EnvelopeGenerator;
use super::note::midi_to_frequency;
use super::operator::{OperatorSnapshot, OPERATOR_COUNT};
use super::waveform::wrap_phase;

/// Everything a voice needs from the synth to render one sample. Built once per render
/// block from the current operator and global settings.
#[derive(Clone, Debug)]
pub struct RenderContext<'a> {
    pub sample_rate: f32,
    pub algorithm: Algorithm,
    pub operators: &'a [OperatorSnapshot; OPERATOR_COUNT],
    pub global_feedback: f32,
}

/// Runtime state of one sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    note_number: u8,
    velocity: u8,
    base_frequency: f32,
    trigger_time: u64, // Trigger order stamp, larger is newer
    phases: [f32; OPERATOR_COUNT],
    last_outputs: [f32; OPERATOR_COUNT], // Previous sample's outputs, for self feedback
    envelopes: [EnvelopeGenerator; OPERATOR_COUNT],
}

impl Voice {
    /// Creates a new, idle voice.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_number(&self) -> u8 {
        self.note_number
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn base_frequency(&self) -> f32 {
        self.base_frequency
    }

    pub fn trigger_time(&self) -> u64 {
        self.trigger_time
    }

    pub fn envelope(&self, index: usize) -> Option<&EnvelopeGenerator> {
        self.envelopes.get(index)
    }

    /// Starts a note: resets all phases and feedback memory and retriggers every operator
    /// envelope with key scaled timings and velocity sensitivity applied.
    pub fn trigger(
        &mut self,
        note_number: u8,
        velocity: u8,
        operators: &[OperatorSnapshot; OPERATOR_COUNT],
        trigger_time: u64,
    ) {
        self.note_number = note_number;
        self.velocity = velocity;
        self.base_frequency = midi_to_frequency(note_number);
        self.trigger_time = trigger_time;
        self.phases = [0.0; OPERATOR_COUNT];
        self.last_outputs = [0.0; OPERATOR_COUNT];

        for (envelope, operator) in self.envelopes.iter_mut().zip(operators.iter()) {
            let key_scale = operator.key_scale(note_number);
            envelope.set_parameters(operator.envelope.time_scaled(key_scale));
            envelope.trigger(operator.effective_velocity(velocity));
        }
    }

    /// Moves all operator envelopes into their release stage.
    pub fn release(&mut self) {
        for envelope in self.envelopes.iter_mut() {
            envelope.release_gate();
        }
    }

    /// A voice is active while any of its envelopes is.
    pub fn is_active(&self) -> bool {
        self.envelopes.iter().any(|envelope| envelope.is_active())
    }

    /// Renders one sample, advancing envelopes by `delta_time` seconds. `pitch_mod` is an
    /// offset in semitones applied to the note frequency.
    pub fn process(&mut self, context: &RenderContext, delta_time: f32, pitch_mod: f32) -> f32 {
        let mut levels = [0.0; OPERATOR_COUNT];
        for (level, envelope) in levels.iter_mut().zip(self.envelopes.iter_mut()) {
            *level = envelope.process(delta_time);
        }

        let frequency = self.base_frequency * 2.0f32.powf(pitch_mod / 12.0);

        // Modulators first: every edge goes from a higher to a lower index.
        let mut outputs = [0.0; OPERATOR_COUNT];
        for index in (0..OPERATOR_COUNT).rev() {
            let operator = &context.operators[index];

            let modulation = context.algorithm.modulation_input(index, &outputs);
            let feedback =
                self.last_outputs[index] * operator.feedback * context.global_feedback * PI;
            let phase = self.phases[index] + modulation + feedback;

            let output = operator.waveform.evaluate(phase) * levels[index] * operator.level;
            outputs[index] = output;
            self.last_outputs[index] = output;

            let increment = TAU * operator.frequency(frequency) / context.sample_rate;
            self.phases[index] = wrap_phase(self.phases[index] + increment);
        }

        context
            .operators
            .iter()
            .zip(outputs.iter())
            .filter(|(operator, _)| operator.carrier)
            .map(|(_, output)| output)
            .sum()
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            note_number: 0,
            velocity: 0,
            base_frequency: 0.0, // Will be set on trigger
            trigger_time: 0,
            phases: [0.0; OPERATOR_COUNT],
            last_outputs: [0.0; OPERATOR_COUNT],
            envelopes: std::array::from_fn(|_| EnvelopeGenerator::default()),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::envelope::{EnvelopeParameters, EnvelopeState};

    const SAMPLE_RATE: f32 = 44100.0;

    fn operators(algorithm: Algorithm) -> [OperatorSnapshot; OPERATOR_COUNT] {
        let mask = algorithm.carrier_mask();
        std::array::from_fn(|index| OperatorSnapshot {
            carrier: mask[index],
            envelope: EnvelopeParameters::new(0.0, 0.0, 1.0, 0.1),
            ..Default::default()
        })
    }

    fn context(
        algorithm: Algorithm,
        operators: &[OperatorSnapshot; OPERATOR_COUNT],
    ) -> RenderContext<'_> {
        RenderContext {
            sample_rate: SAMPLE_RATE,
            algorithm,
            operators,
            global_feedback: 1.0,
        }
    }

    #[test]
    fn trigger_sets_note_state() {
        let ops = operators(Algorithm::Stack6);
        let mut voice = Voice::new();
        assert!(!voice.is_active());

        voice.trigger(81, 100, &ops, 7);
        assert!(voice.is_active());
        assert_eq!(voice.note_number(), 81);
        assert_eq!(voice.velocity(), 100);
        assert_eq!(voice.base_frequency(), 880.0);
        assert_eq!(voice.trigger_time(), 7);
        assert_eq!(voice.envelope(0).unwrap().state(), EnvelopeState::Attack);
    }

    #[test]
    fn single_carrier_renders_sine() {
        let mut ops = operators(Algorithm::AllParallel);
        for (index, op) in ops.iter_mut().enumerate() {
            op.carrier = index == 0;
        }
        let context = context(Algorithm::AllParallel, &ops);

        let mut voice = Voice::new();
        voice.trigger(69, 127, &ops, 1);
        let dt = 1.0 / SAMPLE_RATE;
        for n in 0..64 {
            let expected = (TAU * 440.0 * n as f32 / SAMPLE_RATE).sin();
            let sample = voice.process(&context, dt, 0.0);
            assert!((sample - expected).abs() < 1e-3, "sample {n}: {sample} != {expected}");
        }
    }

    #[test]
    fn self_feedback_uses_previous_output() {
        let mut ops = operators(Algorithm::AllParallel);
        for (index, op) in ops.iter_mut().enumerate() {
            op.carrier = index == 0;
            op.level = if index == 0 { 1.0 } else { 0.0 };
        }
        ops[0].feedback = 1.0;
        let context = context(Algorithm::AllParallel, &ops);

        let mut voice = Voice::new();
        voice.trigger(69, 127, &ops, 1);
        let dt = 1.0 / SAMPLE_RATE;
        let increment = TAU * 440.0 / SAMPLE_RATE;
        let mut phase = 0.0f32;
        let mut previous = 0.0f32;
        let mut deviation = 0.0f32;
        for n in 0..256 {
            let expected = (phase + previous * PI).sin();
            let sample = voice.process(&context, dt, 0.0);
            assert!((sample - expected).abs() < 1e-4, "sample {n}: {sample} != {expected}");
            deviation = deviation.max((sample - phase.sin()).abs());
            previous = expected;
            phase = wrap_phase(phase + increment);
        }
        assert!(deviation > 0.1);

        // global feedback off gives a plain sine again
        let silent = RenderContext {
            global_feedback: 0.0,
            ..context.clone()
        };
        voice.trigger(69, 127, &ops, 2);
        let mut phase = 0.0f32;
        for n in 0..256 {
            let sample = voice.process(&silent, dt, 0.0);
            assert!((sample - phase.sin()).abs() < 1e-4, "sample {n}: {sample}");
            phase = wrap_phase(phase + increment);
        }
    }

    #[test]
    fn pitch_mod_shifts_frequency() {
        let mut ops = operators(Algorithm::AllParallel);
        for (index, op) in ops.iter_mut().enumerate() {
            op.carrier = index == 0;
        }
        let context = context(Algorithm::AllParallel, &ops);

        let mut voice = Voice::new();
        voice.trigger(57, 127, &ops, 1);
        let dt = 1.0 / SAMPLE_RATE;
        voice.process(&context, dt, 12.0);
        let second = voice.process(&context, dt, 12.0);
        let expected = (TAU * 440.0 / SAMPLE_RATE).sin();
        assert!((second - expected).abs() < 1e-4);
    }

    #[test]
    fn modulator_changes_carrier_output() {
        let mut ops = operators(Algorithm::Stack6);
        for op in ops[2..].iter_mut() {
            op.level = 0.0;
        }
        let context = context(Algorithm::Stack6, &ops);
        let dt = 1.0 / SAMPLE_RATE;

        let mut plain = ops;
        plain[1].level = 0.0;
        let plain_context = RenderContext {
            operators: &plain,
            ..context.clone()
        };

        let mut modulated = Voice::new();
        let mut unmodulated = Voice::new();
        modulated.trigger(60, 127, &ops, 1);
        unmodulated.trigger(60, 127, &plain, 1);

        let mut difference = 0.0f32;
        for _ in 0..256 {
            let a = modulated.process(&context, dt, 0.0);
            let b = unmodulated.process(&plain_context, dt, 0.0);
            difference = difference.max((a - b).abs());
        }
        assert!(difference > 0.1);
    }

    #[test]
    fn only_carriers_are_summed() {
        let ops = std::array::from_fn(|_| OperatorSnapshot {
            waveform: crate::synth::waveform::Waveform::Square,
            envelope: EnvelopeParameters::new(0.0, 0.0, 1.0, 0.1),
            ..Default::default()
        });
        let context = context(Algorithm::AllParallel, &ops);
        let mut voice = Voice::new();
        voice.trigger(60, 127, &ops, 1);
        // no operator flagged as carrier
        assert_eq!(voice.process(&context, 1.0 / SAMPLE_RATE, 0.0), 0.0);
    }

    #[test]
    fn release_finishes_after_release_time() {
        let ops = operators(Algorithm::Stack6);
        let context = context(Algorithm::Stack6, &ops);
        let mut voice = Voice::new();
        voice.trigger(60, 127, &ops, 1);
        let dt = 1.0 / SAMPLE_RATE;
        for _ in 0..100 {
            voice.process(&context, dt, 0.0);
        }
        voice.release();
        assert!(voice.is_active());
        for _ in 0..(0.11 * SAMPLE_RATE) as usize {
            voice.process(&context, dt, 0.0);
        }
        assert!(!voice.is_active());
    }

    #[test]
    fn key_scaling_shortens_envelopes() {
        let mut ops = operators(Algorithm::Stack6);
        for op in ops.iter_mut() {
            op.key_scaling = 1.0;
            op.envelope = EnvelopeParameters::new(1.0, 1.0, 0.5, 1.0);
        }
        let mut voice = Voice::new();
        voice.trigger(120, 127, &ops, 1);
        let parameters = voice.envelope(3).unwrap().parameters();
        assert_eq!(parameters.attack, 0.5);
        assert_eq!(parameters.decay, 0.5);
        assert_eq!(parameters.sustain, 0.5);
        assert_eq!(parameters.release, 0.5);
    }

    #[test]
    fn phases_stay_wrapped() {
        let mut ops = operators(Algorithm::Stack6);
        for op in ops.iter_mut() {
            op.ratio = 13.7;
            op.feedback = 1.0;
        }
        let context = context(Algorithm::Stack6, &ops);
        let mut voice = Voice::new();
        voice.trigger(127, 127, &ops, 1);
        for _ in 0..10_000 {
            let sample = voice.process(&context, 1.0 / SAMPLE_RATE, 0.0);
            assert!(sample.is_finite());
        }
        assert!(voice.phases.iter().all(|phase| (0.0..TAU).contains(phase)));
    }
}
