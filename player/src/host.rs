//! Host timer loop
//!
//! Stands in for a browser's animation-frame callback: ticks the session at a
//! fixed host rate, independent of the emulated refresh rate, until the run
//! time elapses or the session ends.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use retroglue_core::{Emulator, Session, TickOutcome};
use tracing::{debug, info};

/// When and how fast to drive the session
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Stop after this much wall-clock time (`None` runs until the session ends)
    pub run_for: Option<Duration>,
    pub tick_interval: Duration,
    pub pause_at: Option<Duration>,
    pub resume_at: Option<Duration>,
}

impl HostOptions {
    pub fn new(run_for: Option<Duration>, tick_hz: u32) -> Self {
        Self {
            run_for,
            tick_interval: Duration::from_secs_f64(1.0 / f64::from(tick_hz.max(1))),
            pause_at: None,
            resume_at: None,
        }
    }
}

/// What the loop did
#[derive(Debug, Clone, Default)]
pub struct HostSummary {
    pub ticks: u64,
    pub frames: u64,
    pub persist_triggers: u64,
    pub elapsed: Duration,
    /// The session ended on its own rather than by the run time elapsing
    pub session_ended: bool,
}

/// Tick `session` until the run time elapses or the session ends
///
/// Emulator errors end the loop and are returned.
pub fn run<E: Emulator>(session: &mut Session<E>, options: &HostOptions) -> Result<HostSummary> {
    let start = Instant::now();
    let mut summary = HostSummary::default();
    let mut next_tick = start;
    let mut paused_once = false;
    let mut resumed_once = false;

    loop {
        let now = Instant::now();
        let elapsed = now - start;
        if options.run_for.is_some_and(|limit| elapsed >= limit) {
            break;
        }

        if !paused_once && options.pause_at.is_some_and(|at| elapsed >= at) {
            paused_once = true;
            info!("Pausing at {:.2}s", elapsed.as_secs_f64());
            session.set_paused(true, now);
        }
        if paused_once
            && !resumed_once
            && options.resume_at.is_some_and(|at| elapsed >= at)
        {
            resumed_once = true;
            info!("Resuming at {:.2}s", elapsed.as_secs_f64());
            session.set_paused(false, now);
        }

        summary.ticks += 1;
        match session.tick(now)? {
            TickOutcome::Scheduled(report) => {
                summary.frames += u64::from(report.advanced);
                summary.persist_triggers += u64::from(report.persist_due);
            }
            TickOutcome::Ended => {
                debug!("Session ended after {} ticks", summary.ticks);
                summary.session_ended = true;
                break;
            }
        }

        next_tick += options.tick_interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}
