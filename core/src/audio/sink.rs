//! Host audio engine interface

use std::sync::Arc;

use super::{AudioBridge, AudioError, DEFAULT_SAMPLE_RATE};

/// Host audio engine consuming an [`AudioBridge`]
///
/// Implementations pull exactly the number of frames their device asks for,
/// synchronously, from a context that must never block.
pub trait AudioSink {
    /// Start pulling from `bridge`
    ///
    /// Returns the output sample rate the emulator should generate at.
    fn open(&mut self, bridge: Arc<AudioBridge>, volume: f32) -> Result<u32, AudioError>;

    /// Suspend or resume pulling without releasing the bridge
    fn set_paused(&mut self, paused: bool);

    /// Set the output gain (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Stop pulling and release the bridge
    fn close(&mut self);
}

/// Sink that accepts everything and never pulls
///
/// Used when audio is required for wiring but not for playback.
#[derive(Debug, Default)]
pub struct NullSink {
    sample_rate: Option<u32>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fixed sample rate from `open`
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate: Some(sample_rate),
        }
    }
}

impl AudioSink for NullSink {
    fn open(&mut self, _bridge: Arc<AudioBridge>, _volume: f32) -> Result<u32, AudioError> {
        Ok(self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE))
    }

    fn set_paused(&mut self, _paused: bool) {}

    fn set_volume(&mut self, _volume: f32) {}

    fn close(&mut self) {}
}
