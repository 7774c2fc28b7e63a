//! Retroglue Core - emulator front-end plumbing
//!
//! This crate connects an emulator core to a host's timer and audio output
//! without blocking either side.
//!
//! # Architecture
//!
//! - [`AudioBridge`] - Lock-free lapping ring carrying stereo samples to the audio thread
//! - [`FramePacer`] - Deadline scheduler advancing at most one frame per host tick
//! - [`Session`] - Explicit session object owning the emulator, pacer and audio sink
//! - [`Emulator`] - Trait implemented by the emulated machine

pub mod audio;
pub mod config;
pub mod emulator;
pub mod input;
#[cfg(test)]
mod integration;
pub mod pacer;
pub mod persist;
pub mod session;
#[cfg(test)]
pub mod test_utils;

// Re-export core traits and types
pub use audio::{
    AudioBridge, AudioError, AudioSink, BridgeStats, ClockMonitor, ClockedSink, NullSink,
    OutputTap, recommended_capacity,
};
pub use emulator::{Button, Emulator};
pub use input::KeyboardMapping;
pub use pacer::{FramePacer, PacerConfig, PacerState, PacerStats, TickReport};
pub use session::{Session, SessionConfig, SessionError, SessionEvent, TickOutcome};

// Re-export configuration and persistence types
pub use config::{Config, ConfigError, Settings};
pub use persist::{
    FileSaveRamStore, MemorySaveRamStore, PersistError, SaveRamStore, save_emulator_ram,
};
