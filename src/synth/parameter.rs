//! Lock free parameter storage and the string keyed parameter dispatch table.
//!
//! Parameter names are matched case-insensitively. Operator parameters use the
//! `opN_<field>` scheme with 1-based operator numbers, e.g. `op1_ratio` or `OP6_Release`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

use super::algorithm::Algorithm;
use super::atomic::AtomicF32;
use super::operator::{OperatorConfig, OperatorSnapshot, OPERATOR_COUNT};
use super::preset::PresetData;
use super::waveform::Waveform;

// -------------------------------------------------------------------------------------------------

/// Operator and global settings shared between control threads and the audio thread.
#[derive(Debug)]
pub struct SynthParameters {
    operators: [OperatorConfig; OPERATOR_COUNT],
    algorithm: AtomicU8,
    feedback: AtomicF32, // Global feedback scale, 0-2
    pitch_bend: AtomicF32,
    pitch_bend_range: AtomicF32, // Semitones
    vibrato_depth: AtomicF32,    // Semitones at full LFO swing
    lfo_rate: AtomicF32,
    volume: AtomicF32,
}

impl SynthParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operator(&self, index: usize) -> Option<&OperatorConfig> {
        self.operators.get(index)
    }

    pub fn operators(&self) -> &[OperatorConfig; OPERATOR_COUNT] {
        &self.operators
    }

    /// Copies all operator settings at once, for a render block.
    pub fn snapshot_operators(&self) -> [OperatorSnapshot; OPERATOR_COUNT] {
        std::array::from_fn(|index| self.operators[index].snapshot())
    }

    pub fn algorithm(&self) -> Algorithm {
        Algorithm::from_repr(self.algorithm.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Selects an algorithm and rewrites all carrier flags for it.
    pub fn set_algorithm(&self, algorithm: Algorithm) {
        for operator in self.operators.iter() {
            operator.set_carrier(false);
        }
        for &index in algorithm.carriers() {
            self.operators[index].set_carrier(true);
        }
        self.algorithm.store(algorithm as u8, Ordering::Relaxed);
    }

    pub fn feedback(&self) -> f32 {
        self.feedback.load()
    }
    pub fn set_feedback(&self, feedback: f32) {
        self.feedback.store(feedback);
    }

    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend.load()
    }
    pub fn set_pitch_bend(&self, bend: f32) {
        self.pitch_bend.store(bend);
    }

    pub fn pitch_bend_range(&self) -> f32 {
        self.pitch_bend_range.load()
    }
    pub fn set_pitch_bend_range(&self, semitones: f32) {
        self.pitch_bend_range.store(semitones);
    }

    pub fn vibrato_depth(&self) -> f32 {
        self.vibrato_depth.load()
    }
    pub fn set_vibrato_depth(&self, semitones: f32) {
        self.vibrato_depth.store(semitones);
    }

    pub fn lfo_rate(&self) -> f32 {
        self.lfo_rate.load()
    }
    pub fn set_lfo_rate(&self, rate: f32) {
        self.lfo_rate.store(rate);
    }

    pub fn volume(&self) -> f32 {
        self.volume.load()
    }
    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume);
    }
}

impl Default for SynthParameters {
    fn default() -> Self {
        let operators = std::array::from_fn(|index| {
            OperatorConfig::from_snapshot(&OperatorSnapshot {
                level: if index == 0 { 1.0 } else { 0.5 },
                ..Default::default()
            })
        });
        let parameters = Self {
            operators,
            algorithm: AtomicU8::new(0),
            feedback: AtomicF32::new(1.0),
            pitch_bend: AtomicF32::new(0.0),
            pitch_bend_range: AtomicF32::new(2.0),
            vibrato_depth: AtomicF32::new(0.0),
            lfo_rate: AtomicF32::new(5.0),
            volume: AtomicF32::new(0.7),
        };
        parameters.set_algorithm(Algorithm::Stack6);
        parameters
    }
}

// -------------------------------------------------------------------------------------------------

type Setter = Box<dyn Fn(&SynthParameters, f32) + Send + Sync>;
type Getter = Box<dyn Fn(&SynthParameters) -> f32 + Send + Sync>;

type OperatorSetter = fn(&OperatorConfig, f32);
type OperatorGetter = fn(&OperatorConfig) -> f32;

/// A named, typed entry of the [`ParameterTable`].
pub struct Parameter {
    key: String,
    set: Setter,
    get: Getter,
    in_presets: bool,
}

impl Parameter {
    fn new(key: impl Into<String>, set: Setter, get: Getter) -> Self {
        Self {
            key: key.into(),
            set,
            get,
            in_presets: true,
        }
    }

    /// Excludes the parameter from preset data. Used for performance state like pitch bend.
    fn transient(mut self) -> Self {
        self.in_presets = false;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Maps normalized parameter names to setters and getters. Built once per synth.
pub struct ParameterTable {
    parameters: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterTable {
    pub fn new() -> Self {
        let mut parameters = Vec::new();
        for index in 0..OPERATOR_COUNT {
            for (field, set, get) in operator_fields() {
                parameters.push(operator_parameter(index, field, set, get));
            }
        }
        parameters.extend(global_parameters());

        let index = parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| (parameter.key.clone(), position))
            .collect();
        Self { parameters, index }
    }

    /// Lowercases and trims a parameter name.
    pub fn normalize(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&Self::normalize(name))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|parameter| parameter.key())
    }

    /// Applies `value` to the named parameter. Returns false, without touching anything,
    /// for unknown names.
    pub fn set(&self, parameters: &SynthParameters, name: &str, value: f32) -> bool {
        match self.index.get(&Self::normalize(name)) {
            Some(&position) => {
                (self.parameters[position].set)(parameters, value);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, parameters: &SynthParameters, name: &str) -> Option<f32> {
        self.index
            .get(&Self::normalize(name))
            .map(|&position| (self.parameters[position].get)(parameters))
    }

    /// Collects the current value of every preset parameter.
    pub fn export(&self, parameters: &SynthParameters) -> PresetData {
        self.parameters
            .iter()
            .filter(|parameter| parameter.in_presets)
            .map(|parameter| (parameter.key.clone(), (parameter.get)(parameters)))
            .collect()
    }
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self::new()
    }
}

fn operator_fields() -> [(&'static str, OperatorSetter, OperatorGetter); 12] {
    [
        ("ratio", |op, value| op.set_ratio(value), |op| op.ratio()),
        (
            "level",
            |op, value| op.set_level(value.clamp(0.0, 1.0)),
            |op| op.level(),
        ),
        ("detune", |op, value| op.set_detune(value), |op| op.detune()),
        (
            "feedback",
            |op, value| op.set_feedback(value.clamp(0.0, 1.0)),
            |op| op.feedback(),
        ),
        ("attack", |op, value| op.set_attack(value), |op| op.envelope().attack),
        ("decay", |op, value| op.set_decay(value), |op| op.envelope().decay),
        ("sustain", |op, value| op.set_sustain(value), |op| op.envelope().sustain),
        ("release", |op, value| op.set_release(value), |op| op.envelope().release),
        (
            "velocity",
            |op, value| op.set_velocity_sensitivity(value.clamp(0.0, 1.0)),
            |op| op.velocity_sensitivity(),
        ),
        (
            "waveform",
            |op, value| {
                if let Some(waveform) = Waveform::from_value(value) {
                    op.set_waveform(waveform);
                }
            },
            |op| op.waveform().as_value(),
        ),
        (
            "fixed",
            |op, value| op.set_fixed_frequency(value.max(0.0)),
            |op| op.fixed_frequency(),
        ),
        (
            "keyscaling",
            |op, value| op.set_key_scaling(value),
            |op| op.key_scaling(),
        ),
    ]
}

fn operator_parameter(
    index: usize,
    field: &str,
    set: OperatorSetter,
    get: OperatorGetter,
) -> Parameter {
    Parameter::new(
        format!("op{}_{}", index + 1, field),
        Box::new(move |parameters: &SynthParameters, value: f32| {
            if let Some(operator) = parameters.operator(index) {
                set(operator, value);
            }
        }),
        Box::new(move |parameters: &SynthParameters| {
            parameters.operator(index).map(get).unwrap_or_default()
        }),
    )
}

fn global_parameters() -> Vec<Parameter> {
    vec![
        Parameter::new(
            "volume",
            Box::new(|p: &SynthParameters, value: f32| p.set_volume(value.clamp(0.0, 1.0))),
            Box::new(|p: &SynthParameters| p.volume()),
        ),
        Parameter::new(
            "algorithm",
            Box::new(|p: &SynthParameters, value: f32| {
                p.set_algorithm(Algorithm::from_value(value))
            }),
            Box::new(|p: &SynthParameters| p.algorithm().as_value()),
        ),
        Parameter::new(
            "feedback",
            Box::new(|p: &SynthParameters, value: f32| p.set_feedback(value.clamp(0.0, 2.0))),
            Box::new(|p: &SynthParameters| p.feedback()),
        ),
        Parameter::new(
            "pitchbend",
            Box::new(|p: &SynthParameters, value: f32| p.set_pitch_bend(value.clamp(-1.0, 1.0))),
            Box::new(|p: &SynthParameters| p.pitch_bend()),
        )
        .transient(),
        Parameter::new(
            "pitchbendrange",
            Box::new(|p: &SynthParameters, value: f32| p.set_pitch_bend_range(value)),
            Box::new(|p: &SynthParameters| p.pitch_bend_range()),
        ),
        Parameter::new(
            "vibratodepth",
            Box::new(|p: &SynthParameters, value: f32| p.set_vibrato_depth(value)),
            Box::new(|p: &SynthParameters| p.vibrato_depth()),
        ),
        Parameter::new(
            "lforate",
            Box::new(|p: &SynthParameters, value: f32| p.set_lfo_rate(value.max(0.0))),
            Box::new(|p: &SynthParameters| p.lfo_rate()),
        ),
    ]
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_algorithm_flags_carrier() {
        let parameters = SynthParameters::new();
        assert_eq!(parameters.algorithm(), Algorithm::Stack6);
        let carriers: Vec<bool> = parameters.operators().iter().map(|op| op.is_carrier()).collect();
        assert_eq!(carriers, [true, false, false, false, false, false]);
    }

    #[test]
    fn set_algorithm_resets_flags() {
        let parameters = SynthParameters::new();
        parameters.set_algorithm(Algorithm::AllParallel);
        assert!(parameters.operators().iter().all(|op| op.is_carrier()));
        parameters.set_algorithm(Algorithm::Split2_4);
        let carriers: Vec<usize> = (0..OPERATOR_COUNT)
            .filter(|&index| parameters.operators()[index].is_carrier())
            .collect();
        assert_eq!(carriers, [0, 4]);
    }

    #[test]
    fn operator_keys_are_one_based_and_case_insensitive() {
        let table = ParameterTable::new();
        let parameters = SynthParameters::new();

        assert!(table.set(&parameters, "op1_ratio", 3.0));
        assert_eq!(parameters.operators()[0].ratio(), 3.0);

        assert!(table.set(&parameters, "OP6_Release", 1.5));
        assert_eq!(parameters.operators()[5].envelope().release, 1.5);

        assert!(!table.set(&parameters, "op0_ratio", 2.0));
        assert!(!table.set(&parameters, "op7_ratio", 2.0));
        assert!(!table.set(&parameters, "op1_bogus", 2.0));
        assert!(!table.set(&parameters, "nonsense", 2.0));
    }

    #[test]
    fn clamped_fields() {
        let table = ParameterTable::new();
        let parameters = SynthParameters::new();

        table.set(&parameters, "op2_level", 4.0);
        assert_eq!(parameters.operators()[1].level(), 1.0);
        table.set(&parameters, "op2_feedback", -1.0);
        assert_eq!(parameters.operators()[1].feedback(), 0.0);
        table.set(&parameters, "op2_velocity", 2.0);
        assert_eq!(parameters.operators()[1].velocity_sensitivity(), 1.0);
        table.set(&parameters, "op2_detune", -5000.0);
        assert_eq!(parameters.operators()[1].detune(), -5000.0);

        table.set(&parameters, "volume", 3.0);
        assert_eq!(parameters.volume(), 1.0);
        table.set(&parameters, "feedback", 5.0);
        assert_eq!(parameters.feedback(), 2.0);
        table.set(&parameters, "PitchBend", -7.0);
        assert_eq!(parameters.pitch_bend(), -1.0);
        table.set(&parameters, "pitchbendrange", 24.0);
        assert_eq!(parameters.pitch_bend_range(), 24.0);
    }

    #[test]
    fn algorithm_and_waveform_from_numbers() {
        let table = ParameterTable::new();
        let parameters = SynthParameters::new();

        table.set(&parameters, "algorithm", 16.0);
        assert_eq!(parameters.algorithm(), Algorithm::Organ);
        table.set(&parameters, "algorithm", 99.0);
        assert_eq!(parameters.algorithm(), Algorithm::Stack6);

        table.set(&parameters, "op3_waveform", 2.0);
        assert_eq!(parameters.operators()[2].waveform(), Waveform::Sawtooth);
        table.set(&parameters, "op3_waveform", 42.0);
        assert_eq!(parameters.operators()[2].waveform(), Waveform::Sawtooth);
    }

    #[test]
    fn export_skips_transient_parameters() {
        let table = ParameterTable::new();
        let parameters = SynthParameters::new();
        let preset = table.export(&parameters);

        assert_eq!(preset.len(), OPERATOR_COUNT * 12 + 6);
        assert_eq!(preset.get("pitchbend"), None);
        assert_eq!(preset.get("op1_level"), Some(1.0));
        assert_eq!(preset.get("op2_level"), Some(0.5));
        assert_eq!(preset.get("algorithm"), Some(0.0));
        assert_eq!(table.get(&parameters, "PITCHBEND"), Some(0.0));
    }

    #[test]
    fn table_lists_every_key_once() {
        let table = ParameterTable::new();
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys.len(), OPERATOR_COUNT * 12 + 7);
        assert!(keys.iter().all(|key| *key == ParameterTable::normalize(key)));
        let unique: std::collections::BTreeSet<&str> = keys.iter().copied().collect();
        assert_eq!(unique.len(), keys.len());

        assert!(table.contains(" OP1_RATIO "));
        assert!(table.contains("pitchbend"));
        assert!(!table.contains("op7_ratio"));
        assert!(!table.contains("bogus"));
    }
}
