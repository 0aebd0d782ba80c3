use std::sync::OnceLock;

use crate::error::{Error, Result};

/// A note on or off request, as sent by input handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note_number: u8,
    pub velocity: u8,
    pub is_on: bool,
}

impl NoteEvent {
    pub fn new(note_number: u8, velocity: u8, is_on: bool) -> Result<Self> {
        validate_note(note_number, velocity)?;
        Ok(Self {
            note_number,
            velocity,
            is_on,
        })
    }

    pub fn note_on(note_number: u8, velocity: u8) -> Result<Self> {
        Self::new(note_number, velocity, true)
    }

    pub fn note_off(note_number: u8) -> Result<Self> {
        Self::new(note_number, 0, false)
    }

    pub fn frequency(&self) -> f32 {
        midi_to_frequency(self.note_number)
    }
}

/// Checks that a note number and velocity are valid 7-bit MIDI values.
pub fn validate_note(note_number: u8, velocity: u8) -> Result<()> {
    if note_number > 127 {
        return Err(Error::InvalidNote(note_number));
    }
    if velocity > 127 {
        return Err(Error::InvalidVelocity(velocity));
    }
    Ok(())
}

/// Equal tempered frequency of a MIDI note with A4 (69) at 440 Hz.
pub fn midi_to_frequency(note_number: u8) -> f32 {
    match midi_frequencies().get(note_number as usize) {
        Some(frequency) => *frequency,
        None => note_frequency(note_number as f32),
    }
}

#[inline]
fn note_frequency(note: f32) -> f32 {
    440.0 * 2.0f32.powf((note - 69.0) / 12.0)
}

/// Global frequency table for MIDI notes
fn midi_frequencies() -> &'static [f32; 128] {
    static FREQUENCIES: OnceLock<[f32; 128]> = OnceLock::new();

    FREQUENCIES.get_or_init(|| {
        let mut frequencies = [0.0; 128];
        for (note, frequency) in frequencies.iter_mut().enumerate() {
            *frequency = note_frequency(note as f32);
        }
        frequencies
    })
}

// -------------------------------------------------------------------------------------------------
