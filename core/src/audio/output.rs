//! Consumer-side handle used inside host audio callbacks

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::AudioBridge;

/// Reads the bridge and applies the output gain
///
/// Cloned into audio callbacks. Holding an `Arc` keeps the bridge alive for
/// an in-flight pull even after the session has released its reference.
#[derive(Clone)]
pub struct OutputTap {
    bridge: Arc<AudioBridge>,
    /// Gain as `f32` bits so it can change while the stream runs
    gain: Arc<AtomicU32>,
}

impl OutputTap {
    pub fn new(bridge: Arc<AudioBridge>, volume: f32) -> Self {
        Self {
            bridge,
            gain: Arc::new(AtomicU32::new(volume.clamp(0.0, 1.0).to_bits())),
        }
    }

    pub fn bridge(&self) -> &Arc<AudioBridge> {
        &self.bridge
    }

    /// Set the output gain (0.0 - 1.0)
    pub fn set_volume(&self, volume: f32) {
        self.gain
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    /// Fill a frame-major output block with `channels` channels
    ///
    /// Never blocks and never allocates.
    pub fn fill(&self, out: &mut [f32], channels: usize) {
        self.bridge.pull_frames(out, channels);

        // Skip scaling if volume is at 100%
        let gain = self.volume();
        if (gain - 1.0).abs() >= f32::EPSILON {
            for sample in out.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Fill an integer-format block through a fixed `scratch` buffer
    ///
    /// `out` is filled one scratch-sized run of whole frames at a time, so
    /// blocks larger than `scratch` never grow it. If `scratch` cannot hold a
    /// single frame the block is silenced.
    pub fn fill_converted<T>(
        &self,
        out: &mut [T],
        scratch: &mut [f32],
        channels: usize,
        convert: impl Fn(f32) -> T,
    ) {
        let run = if channels == 0 {
            0
        } else {
            scratch.len() / channels * channels
        };
        if run == 0 {
            out.iter_mut().for_each(|sample| *sample = convert(0.0));
            return;
        }

        for chunk in out.chunks_mut(run) {
            let block = &mut scratch[..chunk.len()];
            self.fill(block, channels);
            for (dst, &src) in chunk.iter_mut().zip(block.iter()) {
                *dst = convert(src);
            }
        }
    }
}
