//! Frame pacer tests

use std::time::{Duration, Instant};

use crate::audio::AudioBridge;
use crate::test_utils::ScriptedEmulator;

use super::*;

const T: Duration = Duration::from_millis(10);

fn config() -> PacerConfig {
    PacerConfig {
        frame_interval: T,
        autosave_interval: Duration::from_secs(300),
        cpu_budget: Duration::from_secs(1),
    }
}

fn running_pacer(config: PacerConfig) -> (FramePacer, Instant) {
    let mut pacer = FramePacer::new(config);
    let t0 = Instant::now();
    pacer.start(t0);
    (pacer, t0)
}

// ============================================================================
// PacerConfig Tests
// ============================================================================

#[test]
fn test_pacer_config_default() {
    let config = PacerConfig::default();
    assert!((config.frame_rate() - 59.7).abs() < 1e-3);
    assert_eq!(config.autosave_interval, Duration::from_secs(300));
    assert_eq!(config.cpu_budget, config.frame_interval);
    // 1000 / 59.7 ms
    assert_eq!(config.frame_interval.as_micros(), 16_750);
}

#[test]
fn test_pacer_config_invalid_rate_falls_back() {
    assert_eq!(PacerConfig::for_frame_rate(0.0), PacerConfig::default());
    assert_eq!(PacerConfig::for_frame_rate(-5.0), PacerConfig::default());
    assert_eq!(PacerConfig::for_frame_rate(f64::INFINITY), PacerConfig::default());
    assert_eq!(frame_interval_for(50.0), Some(Duration::from_millis(20)));
    assert_eq!(frame_interval_for(f64::NAN), None);
}

#[test]
fn test_pacer_config_tiny_rate_falls_back() {
    assert_eq!(frame_interval_for(1e-300), None);
    assert_eq!(frame_interval_for(f64::MIN_POSITIVE), None);
    assert_eq!(PacerConfig::for_frame_rate(1e-300), PacerConfig::default());
    // Periods shorter than a nanosecond round to zero and are rejected too
    assert_eq!(frame_interval_for(1e12), None);
}

// ============================================================================
// Deadline Scheduling
// ============================================================================

#[test]
fn test_idle_pacer_does_nothing() {
    let mut pacer = FramePacer::new(config());
    let mut emu = ScriptedEmulator::new("idle");
    emu.pending = vec![0.5; 4];

    let report = pacer.tick(Instant::now(), &mut emu, None).unwrap();
    assert_eq!(report, TickReport::default());
    assert_eq!(emu.frames, 0);
    assert_eq!(emu.pending.len(), 4);
    assert_eq!(pacer.state(), PacerState::Idle);
    assert!(pacer.next_deadline().is_none());
}

#[test]
fn test_tick_stream_advances_once_per_elapsed_deadline() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("stream");

    let ticks = [Duration::ZERO, T / 2, T * 3 / 2, T * 3];
    let advanced: Vec<bool> = ticks
        .iter()
        .map(|&at| pacer.tick(t0 + at, &mut emu, None).unwrap().advanced)
        .collect();

    assert_eq!(advanced, vec![false, false, true, true]);
    assert_eq!(emu.frames, 2);
}

#[test]
fn test_deadline_advances_from_previous_deadline() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("deadline");
    assert_eq!(pacer.next_deadline(), Some(t0 + T));

    pacer.tick(t0 + T * 3 / 2, &mut emu, None).unwrap();
    // Not rescheduled relative to the tick time
    assert_eq!(pacer.next_deadline(), Some(t0 + T * 2));
}

#[test]
fn test_backlog_never_bursts() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("backlog");

    // Ten intervals late: each tick still advances only one frame
    let now = t0 + T * 10;
    for expected in 1..=3 {
        let report = pacer.tick(now, &mut emu, None).unwrap();
        assert!(report.advanced);
        assert_eq!(emu.frames, expected);
    }
    assert_eq!(pacer.next_deadline(), Some(t0 + T * 4));
    assert!(pacer.stats().late_frames >= 3);
}

#[test]
fn test_stop_returns_to_idle() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("stop");
    pacer.tick(t0 + T, &mut emu, None).unwrap();

    pacer.stop();
    assert_eq!(pacer.state(), PacerState::Idle);
    assert!(pacer.next_deadline().is_none());

    let report = pacer.tick(t0 + T * 5, &mut emu, None).unwrap();
    assert!(!report.advanced);
    assert_eq!(emu.frames, 1);
}

#[test]
fn test_emulator_error_propagates_without_retry() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("broken");
    emu.fail_at_frame = Some(1);

    let err = pacer.tick(t0 + T, &mut emu, None).unwrap_err();
    assert!(err.to_string().contains("CPU halted"));
    assert_eq!(emu.frames, 0);
    assert_eq!(pacer.stats().total_frames, 0);
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[test]
fn test_pause_freezes_advancement_and_drain() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("paused");
    let bridge = AudioBridge::new(64).unwrap();

    pacer.set_paused(true, t0);
    assert!(pacer.is_paused());
    emu.pending = vec![0.25; 6];

    let report = pacer.tick(t0 + T * 5, &mut emu, Some(&bridge)).unwrap();
    assert_eq!(report, TickReport::default());
    assert_eq!(emu.frames, 0);
    assert_eq!(emu.pending.len(), 6);
    assert_eq!(bridge.insert_pos(), 0);
}

#[test]
fn test_resume_does_not_catch_up() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("resume");

    assert!(pacer.tick(t0 + T, &mut emu, None).unwrap().advanced);
    pacer.set_paused(true, t0 + T * 6 / 5);
    assert!(!pacer.tick(t0 + T * 50, &mut emu, None).unwrap().advanced);

    // Resume long after the schedule would have expired
    let resumed = t0 + T * 100;
    pacer.set_paused(false, resumed);
    assert_eq!(pacer.next_deadline(), Some(resumed + T));

    assert!(!pacer.tick(resumed, &mut emu, None).unwrap().advanced);
    assert!(!pacer.tick(resumed + T / 2, &mut emu, None).unwrap().advanced);
    assert!(pacer.tick(resumed + T, &mut emu, None).unwrap().advanced);
    assert!(!pacer.tick(resumed + T * 6 / 5, &mut emu, None).unwrap().advanced);
    assert_eq!(emu.frames, 2);
}

#[test]
fn test_redundant_resume_keeps_schedule() {
    let (mut pacer, t0) = running_pacer(config());
    pacer.set_paused(false, t0 + T * 7);
    assert_eq!(pacer.next_deadline(), Some(t0 + T));
}

// ============================================================================
// Autosave Countdown
// ============================================================================

#[test]
fn test_persist_fires_when_countdown_elapses() {
    let (mut pacer, t0) = running_pacer(config().with_autosave_interval(T * 3));
    let mut emu = ScriptedEmulator::new("autosave");

    let due: Vec<bool> = (1..=7)
        .map(|i| pacer.tick(t0 + T * i, &mut emu, None).unwrap().persist_due)
        .collect();

    assert_eq!(due, vec![false, false, true, false, false, true, false]);
    assert_eq!(pacer.persist_countdown(), T * 2);
}

#[test]
fn test_persist_counts_frames_not_ticks() {
    let (mut pacer, t0) = running_pacer(config().with_autosave_interval(T * 2));
    let mut emu = ScriptedEmulator::new("autosave");

    // Many ticks between deadlines leave the countdown alone
    for i in 0..10 {
        let report = pacer.tick(t0 + T / 20 * i, &mut emu, None).unwrap();
        assert!(!report.persist_due);
    }
    assert_eq!(pacer.persist_countdown(), T * 2);
}

#[test]
fn test_zero_autosave_interval_disables_persist() {
    let (mut pacer, t0) = running_pacer(config().with_autosave_interval(Duration::ZERO));
    let mut emu = ScriptedEmulator::new("no autosave");

    for i in 1..=5 {
        assert!(!pacer.tick(t0 + T * i, &mut emu, None).unwrap().persist_due);
    }
    assert_eq!(emu.frames, 5);
}

// ============================================================================
// Audio Drain
// ============================================================================

#[test]
fn test_advanced_frame_audio_reaches_bridge() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("audio").with_samples_per_frame(6);
    let bridge = AudioBridge::new(64).unwrap();

    let report = pacer.tick(t0 + T, &mut emu, Some(&bridge)).unwrap();
    assert!(report.advanced);
    assert_eq!(report.samples_pushed, 6);
    assert_eq!(bridge.insert_pos(), 6);
    assert!(emu.pending.is_empty());
    assert_eq!(pacer.stats().total_samples, 6);
}

#[test]
fn test_drain_runs_without_a_new_frame() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("late audio");
    let bridge = AudioBridge::new(64).unwrap();
    emu.pending = vec![0.1; 8];

    let report = pacer.tick(t0, &mut emu, Some(&bridge)).unwrap();
    assert!(!report.advanced);
    assert_eq!(report.samples_pushed, 8);
    assert_eq!(bridge.insert_pos(), 8);
}

#[test]
fn test_drain_without_bridge_discards() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("silent").with_samples_per_frame(10);

    let report = pacer.tick(t0 + T, &mut emu, None).unwrap();
    assert!(report.advanced);
    assert_eq!(report.samples_pushed, 0);
    assert!(emu.pending.is_empty());
    assert_eq!(pacer.stats().discarded_samples, 10);
    assert_eq!(pacer.stats().total_samples, 0);
}

#[test]
fn test_empty_drain_leaves_bridge_untouched() {
    let (mut pacer, t0) = running_pacer(config());
    let mut emu = ScriptedEmulator::new("quiet").with_samples_per_frame(0);
    let bridge = AudioBridge::new(16).unwrap();

    let report = pacer.tick(t0 + T, &mut emu, Some(&bridge)).unwrap();
    assert!(report.advanced);
    assert_eq!(report.samples_pushed, 0);
    assert_eq!(bridge.insert_pos(), 0);
    assert_eq!(bridge.read_pos(), 8);
}
