//! Demo emulator: a looping arpeggio driven by the frame clock
//!
//! Stands in for a real handheld core so the front end can be exercised end
//! to end. Each frame produces exactly the number of stereo frames the output
//! rate calls for, carrying the fractional remainder to the next frame, just
//! like an APU clocked in lockstep with the video.

use std::f64::consts::TAU;

use retroglue_core::{Button, Emulator};

/// Arpeggio notes in Hz (C major)
const MELODY: [f64; 4] = [261.63, 329.63, 392.00, 523.25];

/// Frames each note is held
const NOTE_FRAMES: u64 = 15;

const AMPLITUDE: f64 = 0.25;

/// Battery RAM layout: total frames played, little endian
const RAM_SIZE: usize = 8;

pub struct ToneEmulator {
    title: String,
    frame_rate: f64,
    sample_rate: Option<u32>,
    /// Frames advanced in this session
    frame: u64,
    /// Frames played across sessions (persisted)
    play_time: u64,
    frame_limit: Option<u64>,
    pending: Vec<f32>,
    phase: f64,
    /// Fractional output frames carried between emulated frames
    owed: f64,
    buttons: u8,
}

impl ToneEmulator {
    pub fn new(title: impl Into<String>, frame_rate: f64) -> Self {
        Self {
            title: title.into(),
            frame_rate,
            sample_rate: None,
            frame: 0,
            play_time: 0,
            frame_limit: None,
            pending: Vec::new(),
            phase: 0.0,
            owed: 0.0,
            buttons: 0,
        }
    }

    /// Restore battery RAM saved by an earlier session
    ///
    /// Images of the wrong size are ignored.
    pub fn with_ram(mut self, ram: &[u8]) -> Self {
        if let Ok(bytes) = <[u8; RAM_SIZE]>::try_from(ram) {
            self.play_time = u64::from_le_bytes(bytes);
        }
        self
    }

    /// Stop producing frames after `frames`
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn play_time(&self) -> u64 {
        self.play_time
    }

    fn pressed(&self, button: Button) -> bool {
        self.buttons & button.bit() != 0
    }

    fn frequency(&self) -> f64 {
        let note = MELODY[((self.play_time / NOTE_FRAMES) % MELODY.len() as u64) as usize];
        if self.pressed(Button::A) {
            note * 2.0
        } else {
            note
        }
    }

    /// Per-channel gain from the D-pad
    fn pan(&self) -> (f32, f32) {
        match (self.pressed(Button::Left), self.pressed(Button::Right)) {
            (true, false) => (1.0, 0.2),
            (false, true) => (0.2, 1.0),
            _ => (1.0, 1.0),
        }
    }
}

impl Emulator for ToneEmulator {
    fn title(&self) -> &str {
        &self.title
    }

    fn advance_one_frame(&mut self) -> anyhow::Result<()> {
        self.frame += 1;
        self.play_time += 1;

        let Some(sample_rate) = self.sample_rate else {
            return Ok(());
        };

        self.owed += f64::from(sample_rate) / self.frame_rate;
        let count = self.owed.floor();
        self.owed -= count;

        let step = TAU * self.frequency() / f64::from(sample_rate);
        let (left, right) = self.pan();
        let muted = self.pressed(Button::B);

        self.pending.reserve(count as usize * 2);
        for _ in 0..count as usize {
            let sample = if muted {
                0.0
            } else {
                (self.phase.sin() * AMPLITUDE) as f32
            };
            self.pending.push(sample * left);
            self.pending.push(sample * right);
            self.phase = (self.phase + step) % TAU;
        }
        Ok(())
    }

    fn drain_audio_samples(&mut self, out: &mut Vec<f32>) {
        out.append(&mut self.pending);
    }

    fn set_button_state(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons |= button.bit();
        } else {
            self.buttons &= !button.bit();
        }
    }

    fn open_audio(&mut self, sample_rate: u32) {
        self.sample_rate = Some(sample_rate);
        self.owed = 0.0;
        self.pending.clear();
    }

    fn save_ram(&self) -> Option<Vec<u8>> {
        Some(self.play_time.to_le_bytes().to_vec())
    }

    fn has_more_frames(&self) -> bool {
        self.frame_limit.is_none_or(|limit| self.frame < limit)
    }
}
