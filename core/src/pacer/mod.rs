//! Deadline-driven frame pacing
//!
//! The host calls [`FramePacer::tick`] from its periodic timing source, at any
//! rate above the emulated refresh rate. Each tick advances the emulator by at
//! most one frame, however many deadlines have passed: when the host falls
//! behind, emulation slows down instead of bursting through a backlog of
//! frames (which would also flood the audio bridge with oversized pushes).

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::audio::AudioBridge;
use crate::emulator::Emulator;

mod config;
mod stats;

#[cfg(test)]
mod tests;

pub use config::{
    DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_FRAME_RATE, PacerConfig, frame_interval_for,
};
pub use stats::PacerStats;

/// Scheduling state of the pacer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    /// No active session
    Idle,
    /// Deadline scheduling active
    Running,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// One frame was advanced
    pub advanced: bool,
    /// The autosave countdown elapsed; the owner should persist now
    pub persist_due: bool,
    /// Samples drained from the emulator and pushed into the bridge
    pub samples_pushed: usize,
}

/// Frame pacer
///
/// Owns the deadline schedule, steps the emulator and moves its audio into
/// the bridge.
pub struct FramePacer {
    config: PacerConfig,
    state: PacerState,
    paused: bool,
    /// Instant the next frame is due
    next_deadline: Instant,
    /// Emulated time left until the next persistence trigger
    persist_countdown: Duration,
    /// Reused drain buffer (avoids allocation per tick)
    drain_buffer: Vec<f32>,
    stats: PacerStats,
}

impl FramePacer {
    pub fn new(config: PacerConfig) -> Self {
        let persist_countdown = config.autosave_interval;
        Self {
            config,
            state: PacerState::Idle,
            paused: false,
            next_deadline: Instant::now(),
            persist_countdown,
            drain_buffer: Vec::with_capacity(2048), // ~739*2 stereo samples per frame
            stats: PacerStats::default(),
        }
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PacerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn frame_interval(&self) -> Duration {
        self.config.frame_interval
    }

    /// Instant the next frame is due, while running
    pub fn next_deadline(&self) -> Option<Instant> {
        self.is_running().then_some(self.next_deadline)
    }

    pub fn persist_countdown(&self) -> Duration {
        self.persist_countdown
    }

    pub fn stats(&self) -> &PacerStats {
        &self.stats
    }

    /// Begin scheduling frames
    ///
    /// The frame period is measured from `now`: the first frame is due one
    /// interval later.
    pub fn start(&mut self, now: Instant) {
        self.state = PacerState::Running;
        self.paused = false;
        self.next_deadline = now + self.config.frame_interval;
        self.persist_countdown = self.config.autosave_interval;
        self.stats = PacerStats::default();
        debug!(
            "Frame pacer started ({:.2} Hz, autosave every {:?})",
            self.config.frame_rate(),
            self.config.autosave_interval
        );
    }

    /// Stop scheduling frames
    pub fn stop(&mut self) {
        if self.state == PacerState::Running {
            debug!(
                "Frame pacer stopped after {} frames",
                self.stats.total_frames
            );
        }
        self.state = PacerState::Idle;
        self.paused = false;
    }

    /// Freeze or resume frame advancement
    ///
    /// Resuming restarts the schedule from `now`, so the time spent paused
    /// never turns into catch-up frames.
    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if !paused {
            self.next_deadline = now + self.config.frame_interval;
        }
        debug!("Frame pacer {}", if paused { "paused" } else { "resumed" });
    }

    /// Run one host tick
    ///
    /// Advances at most one frame when its deadline has passed, then drains
    /// the emulator's audio into `bridge` (or discards it when audio is not
    /// attached yet). Emulator errors are returned unchanged; the pacer does
    /// not retry.
    pub fn tick<E: Emulator + ?Sized>(
        &mut self,
        now: Instant,
        emulator: &mut E,
        bridge: Option<&AudioBridge>,
    ) -> Result<TickReport> {
        let mut report = TickReport::default();
        if self.state == PacerState::Idle || self.paused {
            return Ok(report);
        }

        if now >= self.next_deadline {
            let deadline = self.next_deadline;

            let started = Instant::now();
            emulator.advance_one_frame()?;
            let took = started.elapsed();
            if took > self.config.cpu_budget {
                warn!(
                    "Frame took {:?}, exceeds budget of {:?}",
                    took, self.config.cpu_budget
                );
            }

            self.next_deadline = deadline + self.config.frame_interval;
            let late = now >= self.next_deadline;
            if late {
                trace!(
                    "Frame {:?} behind schedule",
                    now.saturating_duration_since(deadline)
                );
            }
            self.stats.record_frame(took, late);
            report.advanced = true;

            // A zero interval disables autosave
            self.persist_countdown = self
                .persist_countdown
                .saturating_sub(self.config.frame_interval);
            if self.persist_countdown.is_zero() && !self.config.autosave_interval.is_zero() {
                report.persist_due = true;
                self.persist_countdown = self.config.autosave_interval;
            }
        }

        self.drain_buffer.clear();
        emulator.drain_audio_samples(&mut self.drain_buffer);
        if !self.drain_buffer.is_empty() {
            match bridge {
                Some(bridge) => {
                    bridge.push(&self.drain_buffer);
                    report.samples_pushed = self.drain_buffer.len();
                    self.stats.record_samples(self.drain_buffer.len(), true);
                }
                None => self.stats.record_samples(self.drain_buffer.len(), false),
            }
        }

        self.stats.maybe_log(now, bridge);
        Ok(report)
    }
}
