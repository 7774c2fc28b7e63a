//! Shared test utilities for unit and integration tests

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::audio::{AudioBridge, AudioError, AudioSink};
use crate::emulator::{Button, Emulator};

// ============================================================================
// Test Emulator
// ============================================================================

/// Emulator stand-in with scripted output
///
/// Every advanced frame appends `samples_per_frame` samples whose value is the
/// frame number, so tests can tell which frame a sample came from.
#[derive(Debug, Clone)]
pub struct ScriptedEmulator {
    pub title: String,
    pub frames: u64,
    pub samples_per_frame: usize,
    pub pending: Vec<f32>,
    pub sample_rate: Option<u32>,
    pub buttons: Vec<(Button, bool)>,
    /// Fail when asked to produce this frame number
    pub fail_at_frame: Option<u64>,
    /// Report no more frames once this many were produced
    pub frame_limit: Option<u64>,
    pub has_ram: bool,
}

impl ScriptedEmulator {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            frames: 0,
            samples_per_frame: 4,
            pending: Vec::new(),
            sample_rate: None,
            buttons: Vec::new(),
            fail_at_frame: None,
            frame_limit: None,
            has_ram: true,
        }
    }

    pub fn with_samples_per_frame(mut self, samples: usize) -> Self {
        self.samples_per_frame = samples;
        self
    }
}

impl Emulator for ScriptedEmulator {
    fn title(&self) -> &str {
        &self.title
    }

    fn advance_one_frame(&mut self) -> anyhow::Result<()> {
        let frame = self.frames + 1;
        if self.fail_at_frame == Some(frame) {
            anyhow::bail!("CPU halted on frame {}", frame);
        }
        self.frames = frame;
        self.pending
            .extend(std::iter::repeat_n(frame as f32, self.samples_per_frame));
        Ok(())
    }

    fn drain_audio_samples(&mut self, out: &mut Vec<f32>) {
        out.append(&mut self.pending);
    }

    fn set_button_state(&mut self, button: Button, pressed: bool) {
        self.buttons.push((button, pressed));
    }

    fn open_audio(&mut self, sample_rate: u32) {
        self.sample_rate = Some(sample_rate);
    }

    fn save_ram(&self) -> Option<Vec<u8>> {
        self.has_ram.then(|| self.frames.to_le_bytes().to_vec())
    }

    fn has_more_frames(&self) -> bool {
        self.frame_limit.is_none_or(|limit| self.frames < limit)
    }
}

// ============================================================================
// Test Audio Sink
// ============================================================================

/// Everything a [`RecordingSink`] was asked to do
#[derive(Default)]
pub struct SinkLog {
    pub opened: u32,
    pub closed: u32,
    pub paused: Vec<bool>,
    pub volumes: Vec<f32>,
    pub bridge: Option<Arc<AudioBridge>>,
}

/// Audio sink that records calls instead of pulling
pub struct RecordingSink {
    pub log: Rc<RefCell<SinkLog>>,
    pub sample_rate: u32,
    pub fail_open: bool,
}

impl RecordingSink {
    pub fn new() -> (Self, Rc<RefCell<SinkLog>>) {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        (
            Self {
                log: log.clone(),
                sample_rate: 32_768,
                fail_open: false,
            },
            log,
        )
    }

    pub fn failing() -> (Self, Rc<RefCell<SinkLog>>) {
        let (mut sink, log) = Self::new();
        sink.fail_open = true;
        (sink, log)
    }
}

impl AudioSink for RecordingSink {
    fn open(&mut self, bridge: Arc<AudioBridge>, volume: f32) -> Result<u32, AudioError> {
        if self.fail_open {
            return Err(AudioError::NoDevice);
        }
        let mut log = self.log.borrow_mut();
        log.opened += 1;
        log.volumes.push(volume);
        log.bridge = Some(bridge);
        Ok(self.sample_rate)
    }

    fn set_paused(&mut self, paused: bool) {
        self.log.borrow_mut().paused.push(paused);
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.borrow_mut().volumes.push(volume);
    }

    fn close(&mut self) {
        let mut log = self.log.borrow_mut();
        log.closed += 1;
        log.bridge = None;
    }
}
