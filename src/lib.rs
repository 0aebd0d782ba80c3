//! Polyphonic six operator FM synthesizer.
//!
//! The [`synth`] module holds the engine: twenty fixed operator algorithms, per voice
//! phase modulation with feedback, per operator envelopes, and a bounded voice pool with
//! retrigger and voice stealing. [`audio`] and [`input`] connect it to an output device
//! and the computer keyboard.

mod error;

pub mod audio;
pub mod input;
pub mod synth;

pub use error::{Error, Result};
