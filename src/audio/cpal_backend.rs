use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

use crate::audio::AudioBackend;
use crate::error::{Error, Result};
use crate::synth::{Synth, SynthConfig};

/// Plays a [`Synth`] on a cpal output device.
pub struct CpalBackend {
    stream: Option<Stream>,
    synth: Arc<Synth>,
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(synth: Arc<Synth>) -> Self {
        Self {
            stream: None,
            synth,
            device_name: None,
        }
    }

    /// Prefer the output device whose name contains `name` (case-insensitive). Falls back to
    /// the host's default device when none matches.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn synth(&self) -> &Arc<Synth> {
        &self.synth
    }

    /// Synth configuration matching the default output device's sample rate and channels.
    pub fn default_output_config() -> Result<SynthConfig> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::OutputDevice("No output device available".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|err| Error::OutputDevice(err.to_string()))?;
        Ok(SynthConfig::default()
            .with_sample_rate(config.sample_rate().0)
            .with_channels(config.channels() as usize))
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device> {
        if let Some(wanted) = &self.device_name {
            let wanted = wanted.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|err| Error::OutputDevice(err.to_string()))?;
            for device in devices {
                let name = device.name().unwrap_or_default();
                log::debug!("Found output device: {name}");
                if name.to_lowercase().contains(&wanted) {
                    return Ok(device);
                }
            }
            log::warn!("No output device matching '{wanted}', using the default device");
        }
        host.default_output_device()
            .ok_or_else(|| Error::OutputDevice("No output device available".to_string()))
    }

    fn build_stream(&self) -> Result<Stream> {
        let host = cpal::default_host();
        let device = self.find_device(&host)?;
        log::info!("Selected device: {}", device.name().unwrap_or_default());

        let supported = device
            .default_output_config()
            .map_err(|err| Error::OutputDevice(err.to_string()))?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(Error::OutputDevice(format!(
                "Unsupported sample format: {:?}",
                supported.sample_format()
            )));
        }

        let synth_config = self.synth.config();
        let channels = u16::try_from(synth_config.channels)
            .map_err(|_| Error::OutputDevice("Too many output channels".to_string()))?;
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(synth_config.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let synth = Arc::clone(&self.synth);
        device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    synth.read(data, 0, data.len());
                },
                |err| log::error!("An error occurred on the output stream: {err}"),
                None,
            )
            .map_err(|err| Error::OutputDevice(err.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    fn start(&mut self) -> Result<()> {
        let stream = self.build_stream()?;
        stream
            .play()
            .map_err(|err| Error::OutputDevice(err.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|err| Error::OutputDevice(err.to_string()))?;
        }
        Ok(())
    }

    fn process_audio(&mut self, output: &mut [f32]) -> usize {
        self.synth.read(output, 0, output.len())
    }
}
