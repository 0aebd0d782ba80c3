use std::collections::HashMap;

use super::operator::{OperatorSnapshot, OPERATOR_COUNT};
use super::voice::Voice;

/// Picks the voice to reuse when the pool is exhausted.
pub trait StealStrategy: Send {
    /// Returns the index of the voice to steal, or `None` when `voices` is empty.
    fn select(&self, voices: &[Voice]) -> Option<usize>;
}

/// Steals the voice with the oldest trigger, regardless of its envelope stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct OldestFirst;

impl StealStrategy for OldestFirst {
    fn select(&self, voices: &[Voice]) -> Option<usize> {
        voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| voice.trigger_time())
            .map(|(index, _)| index)
    }
}

/// Bounded set of voices plus the map of currently held notes.
///
/// Voices are created lazily up to `max_voices` and then recycled. A released note is
/// unmapped right away; its voice keeps sounding its release tail and only becomes
/// reusable once all of its envelopes went idle.
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
    note_map: HashMap<u8, usize>,
    trigger_counter: u64,
    steal_strategy: Box<dyn StealStrategy>,
}

impl VoicePool {
    pub fn new(max_voices: usize) -> Self {
        Self::with_strategy(max_voices, Box::new(OldestFirst))
    }

    pub fn with_strategy(max_voices: usize, steal_strategy: Box<dyn StealStrategy>) -> Self {
        Self {
            voices: Vec::with_capacity(max_voices),
            max_voices,
            // preallocate so note handling doesn't allocate on the audio path
            note_map: HashMap::with_capacity(128),
            trigger_counter: 0,
            steal_strategy,
        }
    }

    pub fn set_steal_strategy(&mut self, steal_strategy: Box<dyn StealStrategy>) {
        self.steal_strategy = steal_strategy;
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Number of allocated voices, sounding or not.
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    pub fn is_note_mapped(&self, note_number: u8) -> bool {
        self.note_map.contains_key(&note_number)
    }

    /// The voice currently holding `note_number`, if any.
    pub fn voice_for_note(&self, note_number: u8) -> Option<&Voice> {
        self.note_map
            .get(&note_number)
            .and_then(|index| self.voices.get(*index))
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Starts a note and returns the index of the voice that plays it. Returns `None` only
    /// for a pool without any voices.
    pub fn note_on(
        &mut self,
        note_number: u8,
        velocity: u8,
        operators: &[OperatorSnapshot; OPERATOR_COUNT],
    ) -> Option<usize> {
        self.trigger_counter += 1;
        let trigger_time = self.trigger_counter;

        // A held note restarts on its own voice
        if let Some(&index) = self.note_map.get(&note_number) {
            self.voices[index].trigger(note_number, velocity, operators, trigger_time);
            return Some(index);
        }

        let index = if let Some(index) = self.find_free_voice() {
            index
        } else if self.voices.len() < self.max_voices {
            self.voices.push(Voice::new());
            self.voices.len() - 1
        } else {
            let index = self
                .steal_strategy
                .select(&self.voices)
                .filter(|index| *index < self.voices.len())?;
            log::debug!(
                "Stealing voice {} (note {}) for note {}",
                index,
                self.voices[index].note_number(),
                note_number
            );
            index
        };

        self.unmap_voice(index);
        self.voices[index].trigger(note_number, velocity, operators, trigger_time);
        self.note_map.insert(note_number, index);
        Some(index)
    }

    /// Releases a held note. Returns false when the note wasn't mapped.
    pub fn note_off(&mut self, note_number: u8) -> bool {
        match self.note_map.remove(&note_number) {
            Some(index) => {
                self.voices[index].release();
                true
            }
            None => false,
        }
    }

    /// Releases every voice and forgets all held notes.
    pub fn all_notes_off(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.release();
        }
        self.note_map.clear();
    }

    /// Find an available voice (one whose envelopes have all finished)
    fn find_free_voice(&self) -> Option<usize> {
        self.voices.iter().position(|voice| !voice.is_active())
    }

    fn unmap_voice(&mut self, index: usize) {
        self.note_map.retain(|_, mapped| *mapped != index);
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::algorithm::Algorithm;
    use crate::synth::envelope::EnvelopeParameters;
    use crate::synth::voice::RenderContext;

    fn operators() -> [OperatorSnapshot; OPERATOR_COUNT] {
        std::array::from_fn(|index| OperatorSnapshot {
            carrier: index == 0,
            envelope: EnvelopeParameters::new(0.0, 0.0, 1.0, 0.01),
            ..Default::default()
        })
    }

    fn render(pool: &mut VoicePool, operators: &[OperatorSnapshot; OPERATOR_COUNT], seconds: f32) {
        let context = RenderContext {
            sample_rate: 1000.0,
            algorithm: Algorithm::Stack6,
            operators,
            global_feedback: 1.0,
        };
        for _ in 0..(seconds * 1000.0) as usize {
            for voice in pool.voices_mut() {
                if voice.is_active() {
                    voice.process(&context, 0.001, 0.0);
                }
            }
        }
    }

    #[test]
    fn allocates_lazily() {
        let ops = operators();
        let mut pool = VoicePool::new(4);
        assert!(pool.is_empty());
        pool.note_on(60, 100, &ops);
        pool.note_on(64, 100, &ops);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.active_count(), 2);
        assert!(pool.is_note_mapped(60));
        assert!(pool.is_note_mapped(64));
    }

    #[test]
    fn same_note_retriggers_same_voice() {
        let ops = operators();
        let mut pool = VoicePool::new(4);
        let first = pool.note_on(60, 100, &ops);
        let second = pool.note_on(60, 100, &ops);
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.voice_for_note(60).unwrap().trigger_time(), 2);
    }

    #[test]
    fn note_off_unmaps_but_keeps_tail() {
        let ops = operators();
        let mut pool = VoicePool::new(4);
        let first = pool.note_on(60, 100, &ops);
        assert!(pool.note_off(60));
        assert!(!pool.is_note_mapped(60));
        assert!(!pool.note_off(60));
        assert_eq!(pool.active_count(), 1);

        // re-pressing during the release tail takes a different voice
        let second = pool.note_on(60, 100, &ops);
        assert_ne!(first, second);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn idle_voices_are_reused() {
        let ops = operators();
        let mut pool = VoicePool::new(4);
        let first = pool.note_on(60, 100, &ops);
        pool.note_off(60);
        render(&mut pool, &ops, 0.05);
        assert_eq!(pool.active_count(), 0);

        let second = pool.note_on(62, 100, &ops);
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn steals_oldest_voice() {
        let ops = operators();
        let mut pool = VoicePool::new(3);
        let oldest = pool.note_on(60, 100, &ops);
        pool.note_on(62, 100, &ops);
        pool.note_on(64, 100, &ops);
        let stolen = pool.note_on(65, 100, &ops);

        assert_eq!(stolen, oldest);
        assert_eq!(pool.len(), 3);
        assert!(!pool.is_note_mapped(60));
        assert!(pool.is_note_mapped(65));
        assert_eq!(pool.voice_for_note(65).unwrap().note_number(), 65);
    }

    #[test]
    fn steal_considers_released_voices_too() {
        let ops = operators();
        let mut pool = VoicePool::new(2);
        let oldest = pool.note_on(60, 100, &ops);
        pool.note_on(62, 100, &ops);
        pool.note_off(60);
        // voice 0 is still in its release tail, so the pool is full
        let stolen = pool.note_on(64, 100, &ops);
        assert_eq!(stolen, oldest);
        assert!(pool.is_note_mapped(62));
    }

    #[test]
    fn custom_strategy() {
        struct Newest;
        impl StealStrategy for Newest {
            fn select(&self, voices: &[Voice]) -> Option<usize> {
                voices
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, voice)| voice.trigger_time())
                    .map(|(index, _)| index)
            }
        }

        let ops = operators();
        let mut pool = VoicePool::with_strategy(2, Box::new(Newest));
        pool.note_on(60, 100, &ops);
        let newest = pool.note_on(62, 100, &ops);
        assert_eq!(pool.note_on(64, 100, &ops), newest);
        assert!(pool.is_note_mapped(60));
        assert!(!pool.is_note_mapped(62));
    }

    #[test]
    fn empty_pool_plays_nothing() {
        let ops = operators();
        let mut pool = VoicePool::new(0);
        assert_eq!(pool.note_on(60, 100, &ops), None);
        assert!(!pool.is_note_mapped(60));
    }

    #[test]
    fn all_notes_off_releases_everything() {
        let ops = operators();
        let mut pool = VoicePool::new(4);
        for note in [60, 64, 67] {
            pool.note_on(note, 100, &ops);
        }
        pool.all_notes_off();
        assert!(!pool.is_note_mapped(60));
        render(&mut pool, &ops, 0.05);
        assert_eq!(pool.active_count(), 0);
    }
}
