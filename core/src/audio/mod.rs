//! Audio path between the frame loop and the host audio engine
//!
//! Architecture:
//! - The frame loop drains each emulated frame's interleaved stereo samples
//!   and pushes them into an [`AudioBridge`]
//! - The host audio engine pulls fixed-size blocks from the same bridge on its
//!   own thread through an [`OutputTap`]
//! - An [`AudioSink`] owns the consumer side and is registered on the session
//!
//! ```text
//! Frame Loop                         Audio Context
//!     │                                   │
//! [advance_one_frame]                     │
//! [drain samples]                         │
//! [push]──────────(bridge)──────────►[pull_frames]
//!     │                                   │
//! ```
//!
//! Neither side blocks. When the producer overruns the reader the bridge
//! relocates the read cursor half a ring away from the write head, trading
//! one audible discontinuity for clean playback afterwards.

mod bridge;
mod clocked;
mod output;
mod sink;


pub use bridge::{AudioBridge, BridgeStats, DEFAULT_CAPACITY, recommended_capacity};
pub use clocked::{ClockMonitor, ClockedSink, DEFAULT_BLOCK_FRAMES};
pub use output::OutputTap;
pub use sink::{AudioSink, NullSink};

/// Audio sample rate requested from the host (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Interleaved channel count carried by the bridge
pub const BRIDGE_CHANNELS: usize = 2;

/// Errors raised while setting up the audio path
///
/// Steady-state push and pull never fail; only construction and host device
/// setup can.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// Capacity must be a non-zero even number of sample slots
    #[error("invalid bridge capacity {0} (must be even and at least 2)")]
    InvalidCapacity(usize),

    /// No usable output device was found
    #[error("no audio output device available")]
    NoDevice,

    /// Device configuration could not be queried or is unsupported
    #[error("audio device configuration failed: {0}")]
    Config(String),

    /// The output stream could not be created or started
    #[error("audio stream failed: {0}")]
    Stream(String),
}
