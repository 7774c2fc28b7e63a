//! Headless audio sink driven by its own clock thread
//!
//! Stands in for a hardware callback when no output device is wanted: a
//! named thread pulls one fixed-size block every `block_frames / sample_rate`
//! seconds, exactly like a device would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{AudioBridge, AudioError, AudioSink, BRIDGE_CHANNELS, DEFAULT_SAMPLE_RATE, OutputTap};

/// Default block size per pull (128 frames, the Web Audio render quantum)
pub const DEFAULT_BLOCK_FRAMES: usize = 128;

/// State shared between the sink and its clock thread
#[derive(Debug, Default)]
struct ClockShared {
    running: AtomicBool,
    paused: AtomicBool,
    frames_rendered: AtomicU64,
    blocks_rendered: AtomicU64,
    /// Peak absolute sample of the most recent block, as `f32` bits
    last_peak: AtomicU32,
}

/// Read-only view of a [`ClockedSink`]'s progress
///
/// Stays valid after the sink is boxed into a session.
#[derive(Debug, Clone)]
pub struct ClockMonitor {
    shared: Arc<ClockShared>,
}

impl ClockMonitor {
    /// Total frames pulled from bridges since the sink was created
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames_rendered.load(Ordering::Relaxed)
    }

    pub fn blocks_rendered(&self) -> u64 {
        self.shared.blocks_rendered.load(Ordering::Relaxed)
    }

    /// Peak absolute level of the last rendered block
    pub fn last_peak(&self) -> f32 {
        f32::from_bits(self.shared.last_peak.load(Ordering::Relaxed))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

/// Audio sink pulling from the bridge on a dedicated timer thread
pub struct ClockedSink {
    sample_rate: u32,
    block_frames: usize,
    channels: usize,
    shared: Arc<ClockShared>,
    tap: Option<OutputTap>,
    handle: Option<JoinHandle<()>>,
}

impl ClockedSink {
    pub fn new(sample_rate: u32, block_frames: usize) -> Self {
        Self::with_channels(sample_rate, block_frames, BRIDGE_CHANNELS)
    }

    /// Render into a layout with `channels` channels (1 = mono downmix)
    pub fn with_channels(sample_rate: u32, block_frames: usize, channels: usize) -> Self {
        Self {
            sample_rate: if sample_rate == 0 { DEFAULT_SAMPLE_RATE } else { sample_rate },
            block_frames: block_frames.max(1),
            channels: channels.max(1),
            shared: Arc::new(ClockShared::default()),
            tap: None,
            handle: None,
        }
    }

    pub fn monitor(&self) -> ClockMonitor {
        ClockMonitor {
            shared: self.shared.clone(),
        }
    }

    /// Wall-clock period of one block
    pub fn block_period(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / self.sample_rate as f64)
    }

    fn spawn(&self, tap: OutputTap) -> Result<JoinHandle<()>, AudioError> {
        let shared = self.shared.clone();
        let period = self.block_period();
        let channels = self.channels;
        let mut block = vec![0.0f32; self.block_frames * channels];
        let block_frames = self.block_frames as u64;

        shared.running.store(true, Ordering::Release);
        thread::Builder::new()
            .name("audio-clock".into())
            .spawn(move || {
                debug!("Audio clock thread started ({:?} per block)", period);
                let mut next = Instant::now();
                while shared.running.load(Ordering::Acquire) {
                    if !shared.paused.load(Ordering::Acquire) {
                        tap.fill(&mut block, channels);
                        let peak = block.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
                        shared.last_peak.store(peak.to_bits(), Ordering::Relaxed);
                        shared
                            .frames_rendered
                            .fetch_add(block_frames, Ordering::Relaxed);
                        shared.blocks_rendered.fetch_add(1, Ordering::Relaxed);
                    }

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        // Fell behind (e.g. suspended process); restart the cadence
                        next = now;
                    }
                }
                debug!("Audio clock thread finished");
            })
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                AudioError::Stream(format!("failed to spawn audio clock thread: {}", e))
            })
    }

    fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Audio clock thread panicked");
        }
        self.tap = None;
    }
}

impl AudioSink for ClockedSink {
    fn open(&mut self, bridge: Arc<AudioBridge>, volume: f32) -> Result<u32, AudioError> {
        if self.handle.is_some() {
            self.shutdown();
        }

        let tap = OutputTap::new(bridge, volume);
        let handle = self.spawn(tap.clone())?;
        self.tap = Some(tap);
        self.handle = Some(handle);
        Ok(self.sample_rate)
    }

    fn set_paused(&mut self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Release);
    }

    fn set_volume(&mut self, volume: f32) {
        if let Some(tap) = &self.tap {
            tap.set_volume(volume);
        }
    }

    fn close(&mut self) {
        self.shutdown();
        self.shared.paused.store(false, Ordering::Release);
    }
}

impl Drop for ClockedSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
