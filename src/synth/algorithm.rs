use std::f32::consts::{FRAC_PI_2, PI, TAU};

use super::operator::OPERATOR_COUNT;

// --- Routing Table ---

/// A single modulation connection: `source`'s output, scaled by `depth`, is added to the
/// phase of `target` before it evaluates its waveform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub depth: f32,
}

const fn edge(source: usize, target: usize, depth: f32) -> Edge {
    Edge {
        source,
        target,
        depth,
    }
}

// Operators are rendered from 5 down to 0, so every edge must point to a lower index.

const STACK_6: [Edge; 5] = [
    edge(5, 4, TAU),
    edge(4, 3, TAU),
    edge(3, 2, TAU),
    edge(2, 1, TAU),
    edge(1, 0, TAU),
];
const SPLIT_2_4: [Edge; 4] = [
    edge(5, 4, TAU),
    edge(3, 2, TAU),
    edge(2, 1, TAU),
    edge(1, 0, TAU),
];
const SPLIT_3_3: [Edge; 4] = [
    edge(5, 4, TAU),
    edge(4, 3, TAU),
    edge(2, 1, TAU),
    edge(1, 0, TAU),
];
const PAIRS: [Edge; 3] = [edge(5, 4, TAU), edge(3, 2, TAU), edge(1, 0, TAU)];
const ONE_TO_THREE: [Edge; 5] = [
    edge(5, 4, TAU),
    edge(4, 3, TAU),
    edge(3, 2, TAU),
    edge(3, 1, TAU),
    edge(3, 0, TAU),
];
const CROSSED_STACKS: [Edge; 4] = [
    edge(5, 3, TAU),
    edge(4, 2, TAU),
    edge(3, 1, TAU),
    edge(2, 0, TAU),
];
const BELLS: [Edge; 4] = [
    edge(5, 1, PI),
    edge(4, 1, PI),
    edge(3, 0, PI),
    edge(2, 0, PI),
];
const ORGAN: [Edge; 3] = [
    edge(5, 2, FRAC_PI_2),
    edge(4, 1, FRAC_PI_2),
    edge(3, 0, FRAC_PI_2),
];

// --- Algorithm ---

/// The fixed operator topologies. Numeric values are stable and used by the `algorithm`
/// parameter.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumCount,
    strum::FromRepr,
)]
#[repr(u8)]
pub enum Algorithm {
    #[default]
    Stack6,
    Split2_4,
    Split3_3,
    Triple,
    AllParallel,
    DualStack,
    OneToThree,
    TwoToThree,
    StackWithFB,
    ThreePairs,
    TwoByTwo,
    DualPath,
    EPiano,
    Brass,
    Bass,
    Bells,
    Organ,
    Pad,
    Lead,
    Pluck,
}

impl Algorithm {
    /// Converts a numeric parameter value into an algorithm. Anything that doesn't name an
    /// algorithm falls back to [`Algorithm::Stack6`].
    pub fn from_value(value: f32) -> Self {
        if !value.is_finite() || value < 0.0 || value > u8::MAX as f32 {
            return Self::Stack6;
        }
        Self::from_repr(value as u8).unwrap_or_default()
    }

    pub fn as_value(self) -> f32 {
        self as u8 as f32
    }

    /// Operators whose output is summed into the voice output.
    pub fn carriers(self) -> &'static [usize] {
        match self {
            Algorithm::Stack6 | Algorithm::StackWithFB => &[0],
            Algorithm::Split2_4 => &[0, 4],
            Algorithm::Split3_3 | Algorithm::DualStack => &[0, 3],
            Algorithm::Triple | Algorithm::ThreePairs => &[0, 2, 4],
            Algorithm::AllParallel => &[0, 1, 2, 3, 4, 5],
            Algorithm::OneToThree | Algorithm::TwoToThree | Algorithm::Organ => &[0, 1, 2],
            Algorithm::TwoByTwo => &[0, 2],
            Algorithm::DualPath
            | Algorithm::EPiano
            | Algorithm::Brass
            | Algorithm::Bass
            | Algorithm::Bells => &[0, 1],
            Algorithm::Pad | Algorithm::Lead | Algorithm::Pluck => &[0],
        }
    }

    /// Carrier flags indexed by operator.
    pub fn carrier_mask(self) -> [bool; OPERATOR_COUNT] {
        let mut mask = [false; OPERATOR_COUNT];
        for &index in self.carriers() {
            mask[index] = true;
        }
        mask
    }

    /// Modulation edges of this algorithm.
    ///
    /// TwoToThree, StackWithFB, TwoByTwo and DualPath have their own carrier sets but no
    /// dedicated routing: they modulate along the Stack6 chain, as do all algorithms
    /// without an entry here.
    pub fn edges(self) -> &'static [Edge] {
        match self {
            Algorithm::Split2_4 => &SPLIT_2_4,
            Algorithm::Split3_3 | Algorithm::DualStack => &SPLIT_3_3,
            Algorithm::Triple | Algorithm::ThreePairs => &PAIRS,
            Algorithm::AllParallel => &[],
            Algorithm::OneToThree => &ONE_TO_THREE,
            Algorithm::EPiano | Algorithm::Brass | Algorithm::Bass => &CROSSED_STACKS,
            Algorithm::Bells => &BELLS,
            Algorithm::Organ => &ORGAN,
            _ => &STACK_6,
        }
    }

    /// Phase contribution into operator `index` from the already rendered `outputs` of this
    /// sample. Only outputs of higher indexed operators are read.
    #[inline]
    pub fn modulation_input(self, index: usize, outputs: &[f32; OPERATOR_COUNT]) -> f32 {
        self.edges()
            .iter()
            .filter(|edge| edge.target == index)
            .map(|edge| outputs[edge.source] * edge.depth)
            .sum()
    }
}

// -------------------------------------------------------------------------------------------------
