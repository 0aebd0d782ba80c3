use crate::synth::{Algorithm, CycleDirection, NoteEvent, Synth};
use device_query::{DeviceQuery, DeviceState, Keycode};
use std::collections::HashMap;
use strum::EnumCount;

const VELOCITY: u8 = 100;

/// Plays a [`Synth`] from the computer keyboard.
///
/// Two rows of keys starting at `A` map to the notes A4 to C#6. `,` and `.` cycle the
/// operator waveforms, the up and down arrows step through the algorithms.
pub struct KeyboardHandler {
    device_state: DeviceState,
    key_states: HashMap<Keycode, bool>,
    key_to_note: HashMap<Keycode, u8>,
    control_keys: HashMap<Keycode, bool>,
}

impl KeyboardHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polls the keyboard and forwards changes to `synth`.
    pub fn update(&mut self, synth: &Synth) {
        let keys: Vec<Keycode> = self.device_state.get_keys();

        for (key, note) in &self.key_to_note {
            let is_pressed = keys.contains(key);
            let was_pressed = self.key_states.get(key).cloned().unwrap_or(false);

            if is_pressed != was_pressed {
                let event = if is_pressed {
                    NoteEvent::note_on(*note, VELOCITY)
                } else {
                    NoteEvent::note_off(*note)
                };
                match event {
                    Ok(event) => {
                        log::debug!("Key '{:?}' -> {:?}", key, event);
                        synth.handle_note_event(event);
                    }
                    Err(err) => log::warn!("Invalid note for key '{:?}': {}", key, err),
                }
                self.key_states.insert(*key, is_pressed);
            }
        }

        for key in [Keycode::Comma, Keycode::Dot, Keycode::Up, Keycode::Down] {
            let is_pressed = keys.contains(&key);
            let was_pressed = self.control_keys.get(&key).cloned().unwrap_or(false);

            if is_pressed && !was_pressed {
                match key {
                    Keycode::Comma => synth.cycle_waveforms(CycleDirection::Backward),
                    Keycode::Dot => synth.cycle_waveforms(CycleDirection::Forward),
                    Keycode::Up => Self::step_algorithm(synth, 1),
                    Keycode::Down => Self::step_algorithm(synth, Algorithm::COUNT - 1),
                    _ => {}
                }
            }

            self.control_keys.insert(key, is_pressed);
        }
    }

    fn step_algorithm(synth: &Synth, step: usize) {
        let next = (synth.algorithm() as usize + step) % Algorithm::COUNT;
        let algorithm = Algorithm::from_repr(next as u8).unwrap_or_default();
        log::info!("Algorithm: {algorithm}");
        synth.set_algorithm(algorithm);
    }
}

/// Home row plays A4 up to C6, the row above adds the black keys.
const NOTE_KEYS: [(Keycode, u8); 17] = [
    (Keycode::A, 69),
    (Keycode::W, 70),
    (Keycode::S, 71),
    (Keycode::D, 72),
    (Keycode::R, 73),
    (Keycode::F, 74),
    (Keycode::T, 75),
    (Keycode::G, 76),
    (Keycode::H, 77),
    (Keycode::U, 78),
    (Keycode::J, 79),
    (Keycode::I, 80),
    (Keycode::K, 81),
    (Keycode::O, 82),
    (Keycode::L, 83),
    (Keycode::Semicolon, 84),
    (Keycode::LeftBracket, 85),
];

const CONTROL_KEYS: [Keycode; 4] = [Keycode::Comma, Keycode::Dot, Keycode::Up, Keycode::Down];

impl Default for KeyboardHandler {
    fn default() -> Self {
        Self {
            device_state: DeviceState::new(),
            key_states: NOTE_KEYS.iter().map(|&(key, _)| (key, false)).collect(),
            key_to_note: NOTE_KEYS.into_iter().collect(),
            control_keys: CONTROL_KEYS.into_iter().map(|key| (key, false)).collect(),
        }
    }
}

// -------------------------------------------------------------------------------------------------
