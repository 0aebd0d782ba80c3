use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::algorithm::Algorithm;
use super::config::SynthConfig;
use super::envelope::EnvelopeParameters;
use super::lfo::Lfo;
use super::note::{validate_note, NoteEvent};
use super::operator::{OperatorSnapshot, OPERATOR_COUNT};
use super::parameter::{ParameterTable, SynthParameters};
use super::preset::{ListenerId, PresetData, PresetListeners};
use super::voice::RenderContext;
use super::voice_pool::{StealStrategy, VoicePool};
use super::waveform::{CycleDirection, Waveform};
use crate::error::Result;

/// State owned by the render path, guarded by a single lock.
struct RenderState {
    pool: VoicePool,
    vibrato_lfo: Option<Lfo>,
}

/// Polyphonic six operator FM synthesizer.
///
/// Notes and rendering share one lock around the voice pool. Operator and global settings
/// are atomics and can be changed from any thread without touching that lock; [`Synth::read`]
/// picks them up at the start of each call.
///
/// ```
/// use sixop::synth::{Algorithm, Synth};
///
/// let synth = Synth::new();
/// synth.set_algorithm(Algorithm::EPiano);
/// synth.note_on(60, 100);
///
/// let mut buffer = vec![0.0; 512];
/// assert_eq!(synth.read(&mut buffer, 0, 512), 512);
/// ```
pub struct Synth {
    config: SynthConfig,
    parameters: SynthParameters,
    parameter_table: ParameterTable,
    render_state: Mutex<RenderState>,
    preset_listeners: PresetListeners,
}

impl Synth {
    /// Creates a synth with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SynthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new_unchecked(config))
    }

    fn new_unchecked(config: SynthConfig) -> Self {
        let pool = VoicePool::new(config.max_voices);
        Self {
            config,
            parameters: SynthParameters::new(),
            parameter_table: ParameterTable::new(),
            render_state: Mutex::new(RenderState {
                pool,
                vibrato_lfo: None,
            }),
            preset_listeners: PresetListeners::new(),
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    // --- Algorithm & Operators ---

    pub fn algorithm(&self) -> Algorithm {
        self.parameters.algorithm()
    }

    /// Selects the operator routing. All carrier flags are cleared, then set for the
    /// algorithm's carriers.
    pub fn set_algorithm(&self, algorithm: Algorithm) {
        self.parameters.set_algorithm(algorithm);
    }

    /// Carrier flags indexed by operator.
    pub fn carriers(&self) -> [bool; OPERATOR_COUNT] {
        std::array::from_fn(|index| self.parameters.operators()[index].is_carrier())
    }

    /// Current settings of operator `index` (0-5).
    pub fn operator(&self, index: usize) -> Option<OperatorSnapshot> {
        self.parameters.operator(index).map(|operator| operator.snapshot())
    }

    /// Sets the main operator values. Values are stored as given; out of range indices are
    /// ignored.
    pub fn set_operator(
        &self,
        index: usize,
        ratio: f32,
        level: f32,
        detune: f32,
        feedback: f32,
        waveform: Waveform,
    ) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_ratio(ratio);
            operator.set_level(level);
            operator.set_detune(detune);
            operator.set_feedback(feedback);
            operator.set_waveform(waveform);
        }
    }

    pub fn set_operator_envelope(
        &self,
        index: usize,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
    ) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_envelope(EnvelopeParameters::new(attack, decay, sustain, release));
        }
    }

    pub fn set_operator_waveform(&self, index: usize, waveform: Waveform) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_waveform(waveform);
        }
    }

    /// Sets a fixed operator frequency in Hz. Zero makes the operator follow the note again.
    pub fn set_operator_fixed_frequency(&self, index: usize, frequency: f32) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_fixed_frequency(frequency);
        }
    }

    pub fn set_operator_key_scaling(&self, index: usize, key_scaling: f32) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_key_scaling(key_scaling);
        }
    }

    pub fn set_operator_velocity_sensitivity(&self, index: usize, sensitivity: f32) {
        if let Some(operator) = self.parameters.operator(index) {
            operator.set_velocity_sensitivity(sensitivity);
        }
    }

    /// Cycles the waveform of all operators.
    pub fn cycle_waveforms(&self, direction: CycleDirection) {
        for operator in self.parameters.operators() {
            operator.cycle_waveform(direction);
        }
    }

    // --- Globals ---

    pub fn master_volume(&self) -> f32 {
        self.parameters.volume()
    }

    /// Set the master volume level (0.0 to 1.0)
    pub fn set_master_volume(&self, volume: f32) {
        self.parameters.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn feedback(&self) -> f32 {
        self.parameters.feedback()
    }

    /// Global scale for all operator feedback amounts (0.0 to 2.0).
    pub fn set_feedback(&self, feedback: f32) {
        self.parameters.set_feedback(feedback.clamp(0.0, 2.0));
    }

    /// Pitch bend in [-1, 1], scaled by the pitch bend range.
    pub fn set_pitch_bend(&self, bend: f32) {
        self.parameters.set_pitch_bend(bend.clamp(-1.0, 1.0));
    }

    pub fn set_pitch_bend_range(&self, semitones: f32) {
        self.parameters.set_pitch_bend_range(semitones);
    }

    pub fn set_vibrato_depth(&self, semitones: f32) {
        self.parameters.set_vibrato_depth(semitones);
    }

    /// Installs or removes the vibrato LFO. The LFO's rate becomes the `lforate` parameter.
    pub fn set_vibrato_lfo(&self, lfo: Option<Lfo>) {
        if let Some(lfo) = &lfo {
            self.parameters.set_lfo_rate(lfo.rate());
        }
        self.lock_render_state().vibrato_lfo = lfo;
    }

    // --- Parameters & Presets ---

    /// Sets a parameter by name, see [`ParameterTable`](super::parameter::ParameterTable).
    /// Unknown names are ignored.
    pub fn set_parameter(&self, name: &str, value: f32) {
        if !self.parameter_table.set(&self.parameters, name, value) {
            log::debug!("Ignoring unknown synth parameter '{name}'");
        }
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameter_table.get(&self.parameters, name)
    }

    /// Exports all operator and global settings.
    pub fn preset_data(&self) -> PresetData {
        self.parameter_table.export(&self.parameters)
    }

    /// Applies every value of `preset` via [`Self::set_parameter`], then notifies preset
    /// listeners.
    pub fn load_preset_data(&self, preset: &PresetData) {
        for (name, value) in preset.iter() {
            self.set_parameter(name, value);
        }
        log::info!("Loaded preset with {} values", preset.len());
        self.preset_listeners.notify(preset);
    }

    /// Registers a callback which runs after each [`Self::load_preset_data`].
    pub fn add_preset_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PresetData) + Send + Sync + 'static,
    {
        self.preset_listeners.add(Arc::new(listener))
    }

    pub fn remove_preset_listener(&self, id: ListenerId) -> bool {
        self.preset_listeners.remove(id)
    }

    // --- Notes ---

    /// Starts a note. Invalid note numbers or velocities are ignored.
    pub fn note_on(&self, note_number: u8, velocity: u8) {
        if let Err(err) = validate_note(note_number, velocity) {
            log::warn!("Ignoring note on: {err}");
            return;
        }
        let operators = self.parameters.snapshot_operators();
        self.lock_render_state()
            .pool
            .note_on(note_number, velocity, &operators);
    }

    /// Releases a note. Its voice keeps playing the release tail.
    pub fn note_off(&self, note_number: u8) {
        if let Err(err) = validate_note(note_number, 0) {
            log::warn!("Ignoring note off: {err}");
            return;
        }
        self.lock_render_state().pool.note_off(note_number);
    }

    pub fn all_notes_off(&self) {
        self.lock_render_state().pool.all_notes_off();
    }

    pub fn handle_note_event(&self, event: NoteEvent) {
        if event.is_on {
            self.note_on(event.note_number, event.velocity);
        } else {
            self.note_off(event.note_number);
        }
    }

    /// Replaces the policy used to pick a voice when all voices are busy.
    pub fn set_steal_strategy(&self, strategy: Box<dyn StealStrategy>) {
        self.lock_render_state().pool.set_steal_strategy(strategy);
    }

    /// True while any voice is still sounding.
    pub fn is_active(&self) -> bool {
        self.active_voice_count() > 0
    }

    pub fn active_voice_count(&self) -> usize {
        self.lock_render_state().pool.active_count()
    }

    /// Number of allocated voices, including idle ones.
    pub fn voice_count(&self) -> usize {
        self.lock_render_state().pool.len()
    }

    pub fn is_note_mapped(&self, note_number: u8) -> bool {
        self.lock_render_state().pool.is_note_mapped(note_number)
    }

    // --- Rendering ---

    /// Renders `count` interleaved samples into `buffer[offset..]` and returns the number of
    /// samples written. Every channel of a frame gets the same value.
    ///
    /// Writes silence when no voice is active. Writing stops at the end of `buffer`, so the
    /// result is `count` whenever the requested range fits.
    pub fn read(&self, buffer: &mut [f32], offset: usize, count: usize) -> usize {
        let end = offset.saturating_add(count).min(buffer.len());
        if offset >= end {
            return 0;
        }
        let output = &mut buffer[offset..end];

        let operators = self.parameters.snapshot_operators();
        let context = RenderContext {
            sample_rate: self.config.sample_rate as f32,
            algorithm: self.parameters.algorithm(),
            operators: &operators,
            global_feedback: self.parameters.feedback(),
        };
        let delta_time = 1.0 / context.sample_rate;
        let volume = self.parameters.volume();
        let bend = self.parameters.pitch_bend() * self.parameters.pitch_bend_range();
        let vibrato_depth = self.parameters.vibrato_depth();
        let lfo_rate = self.parameters.lfo_rate();

        let mut state = self.lock_render_state();
        let RenderState { pool, vibrato_lfo } = &mut *state;
        if let Some(lfo) = vibrato_lfo.as_mut() {
            lfo.set_rate(lfo_rate);
        }

        for frame in output.chunks_mut(self.config.channels) {
            let pitch_mod = match vibrato_lfo.as_mut() {
                Some(lfo) => {
                    let vibrato = lfo.value() * vibrato_depth;
                    lfo.tick(delta_time);
                    bend + vibrato
                }
                None => bend,
            };

            let mut sample = 0.0;
            for voice in pool.voices_mut() {
                if voice.is_active() {
                    sample += voice.process(&context, delta_time, pitch_mod);
                }
            }
            let sample = (sample * volume).tanh();
            frame.fill(sample);
        }

        output.len()
    }

    fn lock_render_state(&self) -> MutexGuard<'_, RenderState> {
        self.render_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Synth {
    fn default() -> Self {
        Self::new_unchecked(SynthConfig::default())
    }
}

// -------------------------------------------------------------------------------------------------
