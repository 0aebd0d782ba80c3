use std::sync::Arc;

use sixop::audio::{AudioBackend, CpalBackend};
use sixop::input::KeyboardHandler;
use sixop::synth::{Algorithm, Synth};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    // Match the synth's format to the output device
    let config = CpalBackend::default_output_config()?;
    log::info!(
        "Output: {} Hz, {} channels, {} voices",
        config.sample_rate,
        config.channels,
        config.max_voices
    );
    let synth = Arc::new(Synth::with_config(config)?);
    synth.set_algorithm(Algorithm::EPiano);
    synth.set_parameter("op3_ratio", 14.0);
    synth.set_parameter("op5_ratio", 1.0);
    synth.set_parameter("op2_detune", 7.0);

    let mut audio_backend = CpalBackend::new(Arc::clone(&synth));
    if let Some(name) = std::env::args().nth(1) {
        audio_backend = audio_backend.with_device_name(name);
    }
    audio_backend.start()?;

    let mut keyboard_handler = KeyboardHandler::new();
    loop {
        keyboard_handler.update(&synth);
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
