//! Emulation session lifecycle
//!
//! A [`Session`] ties one emulator instance to the frame pacer and, when audio
//! is enabled, to an [`AudioBridge`] shared with the host's audio sink. The
//! host owns the session and drives it from its periodic timer:
//!
//! ```text
//! host timer ──tick(now)──► Session ──► FramePacer ──► Emulator
//!                               │             │
//!                               │             └─push─► AudioBridge ◄─pull── AudioSink
//!                               └─ persist callback / event listener
//! ```
//!
//! There is no global state: stopping a session drops the emulator, and the
//! next tick notices the missing handle and reports [`TickOutcome::Ended`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::audio::{AudioBridge, AudioSink, DEFAULT_CAPACITY};
use crate::emulator::{Button, Emulator};
use crate::input::KeyboardMapping;
use crate::pacer::{FramePacer, PacerConfig, TickReport};


/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub pacer: PacerConfig,
    /// Bridge capacity in samples (even, at least 2)
    pub buffer_capacity: usize,
    /// Initial output volume (0.0 - 1.0)
    pub volume: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            buffer_capacity: DEFAULT_CAPACITY,
            volume: 1.0,
        }
    }
}

/// Lifecycle notifications delivered to the event listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session started running the named title
    Started { title: String },
    /// The session ended; the host should stop scheduling ticks
    Ended,
}

/// Result of a session tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is live; keep scheduling ticks
    Scheduled(TickReport),
    /// No session is running
    Ended,
}

impl TickOutcome {
    pub fn is_ended(&self) -> bool {
        matches!(self, TickOutcome::Ended)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The emulator failed to produce a frame; the session was torn down
    #[error("emulator failed: {0:#}")]
    Emulator(#[source] anyhow::Error),
}

type PersistCallback<E> = Box<dyn FnMut(&E)>;
type EventListener = Box<dyn FnMut(&SessionEvent)>;

/// Explicit session object owning the emulator, pacer and audio plumbing
pub struct Session<E: Emulator> {
    config: SessionConfig,
    emulator: Option<E>,
    pacer: FramePacer,
    audio_enabled: bool,
    /// Present while the sink is open
    bridge: Option<Arc<AudioBridge>>,
    sink: Option<Box<dyn AudioSink>>,
    volume: f32,
    persist: Option<PersistCallback<E>>,
    listener: Option<EventListener>,
}

impl<E: Emulator> Session<E> {
    pub fn new(config: SessionConfig) -> Self {
        let volume = config.volume.clamp(0.0, 1.0);
        Self {
            pacer: FramePacer::new(config.pacer.clone()),
            config,
            emulator: None,
            audio_enabled: false,
            bridge: None,
            sink: None,
            volume,
            persist: None,
            listener: None,
        }
    }

    /// Start running `emulator`, replacing any session already running
    ///
    /// The previous session is stopped first, persisting its save RAM.
    pub fn start_session(&mut self, emulator: E, audio_enabled: bool, now: Instant) {
        if self.emulator.is_some() {
            self.stop_session();
        }
        self.finish();

        let title = emulator.title().to_string();
        self.emulator = Some(emulator);
        self.audio_enabled = audio_enabled;
        self.pacer.start(now);
        self.open_audio();

        info!(
            "Session started: {} (audio {})",
            title,
            if audio_enabled { "on" } else { "off" }
        );
        self.emit(&SessionEvent::Started { title });
    }

    /// Persist save RAM, release the emulator and close audio
    ///
    /// The pacer keeps its schedule until the next [`tick`](Self::tick), which
    /// reports the end of the session.
    pub fn stop_session(&mut self) {
        if let Some(emulator) = self.emulator.take() {
            if let Some(persist) = self.persist.as_mut() {
                persist(&emulator);
            }
            debug!("Session stopped: {}", emulator.title());
        }
        self.close_audio();
    }

    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if self.pacer.is_paused() == paused {
            return;
        }
        self.pacer.set_paused(paused, now);
        if self.bridge.is_some()
            && let Some(sink) = self.sink.as_mut()
        {
            sink.set_paused(paused);
        }
    }

    /// Run one host tick
    ///
    /// Returns [`TickOutcome::Ended`] once no session is running. An emulator
    /// error tears the session down without persisting and is returned.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, SessionError> {
        let Some(emulator) = self.emulator.as_mut() else {
            self.finish();
            return Ok(TickOutcome::Ended);
        };

        if !emulator.has_more_frames() {
            debug!("Emulator has no more frames");
            self.stop_session();
            self.finish();
            return Ok(TickOutcome::Ended);
        }

        match self.pacer.tick(now, emulator, self.bridge.as_deref()) {
            Ok(report) => {
                if report.persist_due {
                    self.persist_now();
                }
                Ok(TickOutcome::Scheduled(report))
            }
            Err(err) => {
                error!("Emulator error, ending session: {:#}", err);
                self.emulator = None;
                self.close_audio();
                self.finish();
                Err(SessionError::Emulator(err))
            }
        }
    }

    /// Register the callback that writes save RAM to storage
    pub fn set_persist_callback(&mut self, callback: impl FnMut(&E) + 'static) {
        self.persist = Some(Box::new(callback));
    }

    pub fn set_event_listener(&mut self, listener: impl FnMut(&SessionEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Register the host audio engine
    ///
    /// Opens it right away when a session with audio enabled is running.
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.close_audio();
        self.sink = Some(sink);
        self.open_audio();
    }

    pub fn set_button_state(&mut self, button: Button, pressed: bool) {
        if let Some(emulator) = self.emulator.as_mut() {
            emulator.set_button_state(button, pressed);
        }
    }

    /// Translate a host key through `mapping` and forward it
    ///
    /// Returns `true` when the key is bound and a session is running.
    pub fn press_key(&mut self, mapping: &KeyboardMapping, key: &str, pressed: bool) -> bool {
        let (Some(button), Some(emulator)) = (mapping.button_for(key), self.emulator.as_mut())
        else {
            return false;
        };
        emulator.set_button_state(button, pressed);
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_mut() {
            sink.set_volume(self.volume);
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_running(&self) -> bool {
        self.emulator.is_some() && self.pacer.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.pacer.is_paused()
    }

    pub fn bridge(&self) -> Option<&Arc<AudioBridge>> {
        self.bridge.as_ref()
    }

    pub fn emulator(&self) -> Option<&E> {
        self.emulator.as_ref()
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn persist_now(&mut self) {
        if let (Some(emulator), Some(persist)) = (self.emulator.as_ref(), self.persist.as_mut()) {
            debug!("Autosave: {}", emulator.title());
            persist(emulator);
        }
    }

    /// Move the pacer to idle and announce the end, once per session
    fn finish(&mut self) {
        if !self.pacer.is_running() {
            return;
        }
        self.pacer.stop();
        self.emit(&SessionEvent::Ended);
    }

    fn emit(&mut self, event: &SessionEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }

    fn open_audio(&mut self) {
        if !self.audio_enabled || self.bridge.is_some() {
            return;
        }
        let (Some(emulator), Some(sink)) = (self.emulator.as_mut(), self.sink.as_mut()) else {
            return;
        };

        let bridge = match AudioBridge::new(self.config.buffer_capacity) {
            Ok(bridge) => Arc::new(bridge),
            Err(e) => {
                warn!("Audio disabled: {}", e);
                return;
            }
        };

        match sink.open(Arc::clone(&bridge), self.volume) {
            Ok(sample_rate) => {
                emulator.open_audio(sample_rate);
                if self.pacer.is_paused() {
                    sink.set_paused(true);
                }
                debug!(
                    "Audio opened at {} Hz ({} sample bridge)",
                    sample_rate,
                    bridge.capacity()
                );
                self.bridge = Some(bridge);
            }
            Err(e) => warn!("Failed to open audio, continuing without sound: {}", e),
        }
    }

    fn close_audio(&mut self) {
        if self.bridge.take().is_none() {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.close();
        }
    }
}
