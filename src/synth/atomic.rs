use std::sync::atomic::{AtomicU32, Ordering};

/// An `f32` stored as raw bits in an [`AtomicU32`].
///
/// Used for parameters written by control threads and read by the audio thread. Loads and
/// stores are relaxed: every field is an independent scalar and the renderer only needs to
/// see some recent value.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}
