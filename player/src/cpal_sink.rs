//! Audio output through the default cpal device

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use retroglue_core::{AudioBridge, AudioError, AudioSink, OutputTap};
use tracing::{debug, error, warn};

/// Conversion buffer size for integer sample formats, allocated once per stream
const SCRATCH_FRAMES: usize = 2048;

/// Sink playing the bridge through the system's default output device
///
/// The device callback pulls exactly the frames it is asked for from an
/// [`OutputTap`]; when the emulator falls behind the bridge replays stale
/// samples rather than starving the device.
#[derive(Default)]
pub struct CpalSink {
    stream: Option<cpal::Stream>,
    tap: Option<OutputTap>,
}

impl CpalSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for CpalSink {
    fn open(&mut self, bridge: Arc<AudioBridge>, volume: f32) -> Result<u32, AudioError> {
        self.close();

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = usize::from(config.channels());
        let sample_format = config.sample_format();
        let stream_config: cpal::StreamConfig = config.into();
        let tap = OutputTap::new(bridge, volume);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                let tap = tap.clone();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        tap.fill(data, channels);
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let tap = tap.clone();
                let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels];
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        tap.fill_converted(data, &mut scratch, channels, |s| {
                            (s * 32767.0).clamp(-32768.0, 32767.0) as i16
                        });
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                )
            }
            cpal::SampleFormat::U16 => {
                let tap = tap.clone();
                let mut scratch = vec![0.0f32; SCRATCH_FRAMES * channels];
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                        tap.fill_converted(data, &mut scratch, channels, |s| {
                            (s * 32767.0 + 32768.0).clamp(0.0, 65535.0) as u16
                        });
                    },
                    |err| error!("Audio stream error: {}", err),
                    None,
                )
            }
            other => {
                return Err(AudioError::Config(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(|e| AudioError::Stream(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(format!("Failed to play audio stream: {}", e)))?;

        debug!(
            "Audio stream started ({} Hz, {} channels, {:?})",
            sample_rate, channels, sample_format
        );

        self.stream = Some(stream);
        self.tap = Some(tap);
        Ok(sample_rate)
    }

    fn set_paused(&mut self, paused: bool) {
        let Some(stream) = &self.stream else {
            return;
        };
        let result = if paused {
            stream.pause().map_err(|e| e.to_string())
        } else {
            stream.play().map_err(|e| e.to_string())
        };
        if let Err(e) = result {
            warn!(
                "Failed to {} audio stream: {}",
                if paused { "pause" } else { "resume" },
                e
            );
        }
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(tap) = &self.tap {
            tap.set_volume(volume);
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Audio stream closed");
        }
        self.tap = None;
    }
}
