mod cpal_backend;

pub use self::cpal_backend::CpalBackend;

use crate::error::Result;

/// An output that pulls interleaved samples from a synth.
pub trait AudioBackend {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    /// Renders into `output` without going through the device. Returns the number of
    /// samples written.
    fn process_audio(&mut self, output: &mut [f32]) -> usize;
}
