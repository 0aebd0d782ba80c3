use std::f32::consts::{PI, TAU};

/// Oscillator shape of a single operator.
///
/// `FeedbackSine` renders as a plain sine: feedback is applied to the phase by the voice,
/// not by the shape itself.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter, strum::FromRepr,
)]
#[repr(u8)]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
    FeedbackSine,
}

#[derive(Clone, Copy, Debug)]
pub enum CycleDirection {
    Forward,
    Backward,
}

impl Waveform {
    /// Converts a numeric parameter value into a waveform. Returns `None` for values that
    /// don't name a waveform.
    pub fn from_value(value: f32) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Self::from_repr(value.round() as u8)
    }

    pub fn as_value(self) -> f32 {
        self as u8 as f32
    }

    /// Evaluates the waveform at `phase` radians. The phase is wrapped into [0, 2π) first,
    /// so modulated phases may run outside of a single period.
    #[inline]
    pub fn evaluate(self, phase: f32) -> f32 {
        let phase = wrap_phase(phase);
        match self {
            Waveform::Sine | Waveform::FeedbackSine => phase.sin(),
            Waveform::Triangle => {
                let t = phase / TAU;
                if t < 0.5 {
                    4.0 * t - 1.0
                } else {
                    3.0 - 4.0 * t
                }
            }
            Waveform::Sawtooth => phase / PI - 1.0,
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    pub fn cycled(self, direction: CycleDirection) -> Self {
        match direction {
            CycleDirection::Forward => match self {
                Waveform::Sine => Waveform::Square,
                Waveform::Square => Waveform::Sawtooth,
                Waveform::Sawtooth => Waveform::Triangle,
                Waveform::Triangle => Waveform::FeedbackSine,
                Waveform::FeedbackSine => Waveform::Sine,
            },
            CycleDirection::Backward => match self {
                Waveform::Sine => Waveform::FeedbackSine,
                Waveform::FeedbackSine => Waveform::Triangle,
                Waveform::Triangle => Waveform::Sawtooth,
                Waveform::Sawtooth => Waveform::Square,
                Waveform::Square => Waveform::Sine,
            },
        }
    }
}

/// Wraps a phase into [0, 2π).
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid may round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

// -------------------------------------------------------------------------------------------------
