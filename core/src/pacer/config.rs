//! Pacer configuration

use std::time::Duration;

/// Native refresh rate of the emulated handheld in Hz
pub const DEFAULT_FRAME_RATE: f64 = 59.7;

/// Time between automatic save-RAM persistence (5 minutes)
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(300);

/// Frame period for a refresh rate, or `None` if the rate is not usable
pub fn frame_interval_for(frame_rate: f64) -> Option<Duration> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Duration::try_from_secs_f64(1.0 / frame_rate)
            .ok()
            .filter(|interval| !interval.is_zero())
    } else {
        None
    }
}

/// Pacer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PacerConfig {
    /// Wall-clock time between emulated frames
    pub frame_interval: Duration,
    /// Emulated time between persistence triggers
    pub autosave_interval: Duration,
    /// CPU budget warning threshold for a single frame advance
    pub cpu_budget: Duration,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self::for_frame_rate(DEFAULT_FRAME_RATE)
    }
}

impl PacerConfig {
    /// Configuration for a refresh rate, falling back to the native rate
    pub fn for_frame_rate(frame_rate: f64) -> Self {
        let frame_interval = frame_interval_for(frame_rate).unwrap_or_else(|| {
            tracing::warn!(
                "Invalid frame rate {}, using {} Hz",
                frame_rate,
                DEFAULT_FRAME_RATE
            );
            Duration::from_secs_f64(1.0 / DEFAULT_FRAME_RATE)
        });

        Self {
            frame_interval,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            cpu_budget: frame_interval,
        }
    }

    /// Set the time between persistence triggers
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Frames produced per second with this interval
    pub fn frame_rate(&self) -> f64 {
        1.0 / self.frame_interval.as_secs_f64()
    }
}
