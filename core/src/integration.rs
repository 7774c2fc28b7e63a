//! Integration tests for the retroglue core
//!
//! Drive a full session the way a host would: config in, ticks from a timer,
//! audio pulled by a clocked sink on its own thread, save RAM into a store.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::audio::{ClockedSink, recommended_capacity};
    use crate::config::Config;
    use crate::pacer::PacerConfig;
    use crate::persist::{MemorySaveRamStore, SaveRamStore, save_emulator_ram};
    use crate::session::{Session, SessionConfig, SessionEvent, TickOutcome};
    use crate::test_utils::ScriptedEmulator;

    // ============================================================================
    // Real-time audio
    // ============================================================================

    #[test]
    fn test_realtime_session_feeds_clocked_sink() {
        const SAMPLE_RATE: u32 = 8_000;
        const FRAME_RATE: f64 = 100.0;

        let config = SessionConfig {
            pacer: PacerConfig::for_frame_rate(FRAME_RATE),
            buffer_capacity: recommended_capacity(SAMPLE_RATE, FRAME_RATE),
            volume: 1.0,
        };
        let mut session = Session::new(config);

        let sink = ClockedSink::new(SAMPLE_RATE, 64);
        let monitor = sink.monitor();
        session.set_audio_sink(Box::new(sink));

        // 80 stereo frames per emulated frame at 8 kHz / 100 Hz
        let emu = ScriptedEmulator::new("realtime").with_samples_per_frame(160);
        session.start_session(emu, true, Instant::now());
        assert_eq!(session.emulator().unwrap().sample_rate, Some(SAMPLE_RATE));
        assert!(monitor.is_running());

        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(250) {
            let outcome = session.tick(Instant::now()).unwrap();
            assert!(!outcome.is_ended());
            thread::sleep(Duration::from_millis(1));
        }

        let frames = session.emulator().unwrap().frames;
        assert!(frames >= 5, "only {} frames advanced", frames);
        assert!(monitor.frames_rendered() > 0);
        assert!(monitor.last_peak() > 0.0);

        let bridge = session.bridge().cloned().unwrap();
        let stats = bridge.stats();
        assert!(stats.insert_pos < stats.capacity);
        assert!(stats.read_pos < stats.capacity);

        session.stop_session();
        assert!(!monitor.is_running());
        assert!(session.tick(Instant::now()).unwrap().is_ended());
    }

    // ============================================================================
    // Save RAM
    // ============================================================================

    #[test]
    fn test_save_ram_survives_session_restart() {
        let mut config = Config::default();
        config.timing.frame_rate = 50.0;
        config.timing.autosave_secs = 0;
        let t = Duration::from_millis(20);

        let store = Rc::new(RefCell::new(MemorySaveRamStore::new()));
        let mut session = Session::new(config.session_config());
        let writer = store.clone();
        session.set_persist_callback(move |emu: &ScriptedEmulator| {
            save_emulator_ram(&mut *writer.borrow_mut(), emu).unwrap();
        });

        let events = Rc::new(RefCell::new(Vec::new()));
        let log = events.clone();
        session.set_event_listener(move |event| log.borrow_mut().push(event.clone()));

        let t0 = Instant::now();
        session.start_session(ScriptedEmulator::new("Cart"), false, t0);
        for i in 1..=12 {
            let outcome = session.tick(t0 + t * i).unwrap();
            assert!(matches!(outcome, TickOutcome::Scheduled(r) if r.advanced && !r.persist_due));
        }
        // Autosave disabled: nothing written until the session stops
        assert_eq!(store.borrow().writes(), 0);

        session.stop_session();
        assert_eq!(store.borrow().writes(), 1);

        // A later session can restore what the first one saved
        let ram = store.borrow().load("Cart").unwrap().unwrap();
        assert_eq!(ram, 12u64.to_le_bytes().to_vec());

        session.start_session(ScriptedEmulator::new("Other"), false, t0 + t * 20);
        assert_eq!(
            *events.borrow(),
            vec![
                SessionEvent::Started {
                    title: "Cart".to_string()
                },
                SessionEvent::Ended,
                SessionEvent::Started {
                    title: "Other".to_string()
                },
            ]
        );
    }
}
