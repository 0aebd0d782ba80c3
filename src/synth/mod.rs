pub mod algorithm;
pub mod atomic;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod lfo;
pub mod note;
pub mod operator;
pub mod parameter;
pub mod preset;
pub mod voice;
pub mod voice_pool;
pub mod waveform;

pub use algorithm::Algorithm;
pub use config::SynthConfig;
pub use engine::Synth;
pub use envelope::{EnvelopeGenerator, EnvelopeParameters, EnvelopeState};
pub use lfo::Lfo;
pub use note::{midi_to_frequency, NoteEvent};
pub use operator::{OperatorConfig, OperatorSnapshot, OPERATOR_COUNT};
pub use preset::{ListenerId, PresetData};
pub use voice::Voice;
pub use voice_pool::{OldestFirst, StealStrategy, VoicePool};
pub use waveform::{CycleDirection, Waveform};
