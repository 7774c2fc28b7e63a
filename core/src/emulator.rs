//! Emulator collaborator contract
//!
//! The emulated hardware (CPU/PPU/APU, cartridge parsing, rendering) lives
//! behind this trait. The front end only steps it, drains its audio, feeds it
//! input and asks it for battery-backed RAM to persist.

use serde::{Deserialize, Serialize};

/// Buttons of the emulated handheld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

impl Button {
    /// Every button, in D-pad then face-button order
    pub const ALL: [Button; 8] = [
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::A,
        Button::B,
        Button::Start,
        Button::Select,
    ];

    /// Bit position used by emulators that keep a button mask
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A running emulator instance with a cartridge loaded
pub trait Emulator {
    /// Cartridge title, used as the save-RAM key
    fn title(&self) -> &str;

    /// Run the emulated hardware until one display frame is produced
    fn advance_one_frame(&mut self) -> anyhow::Result<()>;

    /// Append every interleaved stereo sample generated since the last call
    /// to `out`, clearing the emulator's pending samples
    fn drain_audio_samples(&mut self, out: &mut Vec<f32>);

    /// Set the pressed state of a button
    fn set_button_state(&mut self, button: Button, pressed: bool);

    /// Start producing audio at `sample_rate`
    ///
    /// Until this is called the emulator may produce no samples at all.
    fn open_audio(&mut self, sample_rate: u32);

    /// Snapshot of the cartridge's battery-backed RAM, if it has any
    fn save_ram(&self) -> Option<Vec<u8>>;

    /// Whether more frames can be produced
    ///
    /// Returning `false` ends the session on the next tick.
    fn has_more_frames(&self) -> bool {
        true
    }
}
