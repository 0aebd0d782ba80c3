/// Timing template of an operator envelope: attack, decay and release in seconds, sustain as
/// a level relative to the triggered peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParameters {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeParameters {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Returns a copy with all stage times divided by `key_scale`. The sustain level is kept.
    pub fn time_scaled(&self, key_scale: f32) -> Self {
        let factor = 1.0 / key_scale;
        Self {
            attack: self.attack * factor,
            decay: self.decay * factor,
            sustain: self.sustain,
            release: self.release * factor,
        }
    }
}

impl Default for EnvelopeParameters {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
        }
    }
}

#[derive(PartialEq, Debug, Default, Copy, Clone)]
pub enum EnvelopeState {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Linear ADSR state machine, advanced by wall-clock deltas.
///
/// Each stage ramps linearly from the value it started with to its target over the stage's
/// duration. A triggered envelope peaks at `velocity / 127` and sustains at
/// `sustain * peak`.
#[derive(Debug, Clone)]
pub struct EnvelopeGenerator {
    parameters: EnvelopeParameters,
    state: EnvelopeState,
    value: f32,
    peak: f32,
    stage_start_value: f32,
    stage_elapsed: f32,
}

impl EnvelopeGenerator {
    pub fn new(parameters: EnvelopeParameters) -> Self {
        Self {
            parameters,
            state: EnvelopeState::Idle,
            value: 0.0,
            peak: 0.0,
            stage_start_value: 0.0,
            stage_elapsed: 0.0,
        }
    }

    pub fn parameters(&self) -> &EnvelopeParameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: EnvelopeParameters) {
        self.parameters = parameters;
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Restarts the envelope from zero. `velocity` is in MIDI units (0-127) and may be
    /// fractional.
    pub fn trigger(&mut self, velocity: f32) {
        self.peak = velocity / 127.0;
        self.value = 0.0;
        self.enter(EnvelopeState::Attack);
    }

    /// Moves into release from whatever value the envelope currently holds.
    pub fn release_gate(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.enter(EnvelopeState::Release);
        }
    }

    /// Advances the envelope by `delta_time` seconds and returns its new value.
    pub fn process(&mut self, delta_time: f32) -> f32 {
        self.stage_elapsed += delta_time;
        match self.state {
            EnvelopeState::Idle => {
                self.value = 0.0;
            }
            EnvelopeState::Attack => {
                if self.ramp(self.parameters.attack, self.peak) {
                    self.enter(EnvelopeState::Decay);
                }
            }
            EnvelopeState::Decay => {
                if self.ramp(self.parameters.decay, self.sustain_level()) {
                    self.enter(EnvelopeState::Sustain);
                }
            }
            EnvelopeState::Sustain => {}
            EnvelopeState::Release => {
                if self.ramp(self.parameters.release, 0.0) {
                    self.value = 0.0;
                    self.enter(EnvelopeState::Idle);
                }
            }
        }
        self.value
    }

    fn sustain_level(&self) -> f32 {
        self.parameters.sustain * self.peak
    }

    fn enter(&mut self, state: EnvelopeState) {
        self.state = state;
        self.stage_start_value = self.value;
        self.stage_elapsed = 0.0;
    }

    /// Interpolates the current stage towards `target`. Returns true once the stage's
    /// duration has fully elapsed.
    fn ramp(&mut self, duration: f32, target: f32) -> bool {
        if duration <= 0.0 || self.stage_elapsed >= duration {
            self.value = target;
            true
        } else {
            let t = self.stage_elapsed / duration;
            self.value = self.stage_start_value + (target - self.stage_start_value) * t;
            false
        }
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new(EnvelopeParameters::default())
    }
}

// -------------------------------------------------------------------------------------------------
