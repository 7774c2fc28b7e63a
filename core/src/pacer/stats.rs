//! Pacer health counters

use std::time::{Duration, Instant};

use tracing::debug;

use crate::audio::AudioBridge;

const LOG_INTERVAL: Duration = Duration::from_secs(1);

/// Counters for pacer health monitoring and diagnostics
///
/// `total_*` fields accumulate for the session; the rest reset after each
/// periodic log line so they read as per-second rates.
#[derive(Debug, Clone, Default)]
pub struct PacerStats {
    /// Frames advanced since the session started
    pub total_frames: u64,
    /// Samples pushed into the bridge since the session started
    pub total_samples: u64,
    /// Frames advanced since the last log
    pub frames: u64,
    /// Samples pushed since the last log
    pub samples: u64,
    /// Frames advanced more than one interval after their deadline
    pub late_frames: u64,
    /// Samples drained while no bridge was attached
    pub discarded_samples: u64,
    /// Slowest frame advance since the last log
    pub slowest_advance: Duration,
    last_log: Option<Instant>,
}

impl PacerStats {
    pub(super) fn record_frame(&mut self, took: Duration, late: bool) {
        self.total_frames += 1;
        self.frames += 1;
        if late {
            self.late_frames += 1;
        }
        self.slowest_advance = self.slowest_advance.max(took);
    }

    pub(super) fn record_samples(&mut self, count: usize, delivered: bool) {
        if delivered {
            self.total_samples += count as u64;
            self.samples += count as u64;
        } else {
            self.discarded_samples += count as u64;
        }
    }

    /// Log and reset the interval counters once per second of host time
    pub(super) fn maybe_log(&mut self, now: Instant, bridge: Option<&AudioBridge>) {
        let Some(last) = self.last_log else {
            self.last_log = Some(now);
            return;
        };
        if now.saturating_duration_since(last) < LOG_INTERVAL {
            return;
        }

        match bridge.map(AudioBridge::stats) {
            Some(audio) => debug!(
                "PACER: frames={}, samples={}, late={}, slowest={:?}, \
                 bridge lag={}/{} relocations={}",
                self.frames,
                self.samples,
                self.late_frames,
                self.slowest_advance,
                audio.lag,
                audio.capacity,
                audio.relocations
            ),
            None => debug!(
                "PACER: frames={}, samples={}, late={}, slowest={:?}, no audio (discarded={})",
                self.frames,
                self.samples,
                self.late_frames,
                self.slowest_advance,
                self.discarded_samples
            ),
        }

        self.frames = 0;
        self.samples = 0;
        self.late_frames = 0;
        self.slowest_advance = Duration::ZERO;
        self.last_log = Some(now);
    }
}
