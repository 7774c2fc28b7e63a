//! Retroglue headless player
//!
//! Runs the demo tone emulator through a full front-end session: config and
//! save RAM are loaded from disk, frames are paced by a host timer loop and
//! audio is pulled through the lock-free bridge by a clocked sink (or the
//! default output device with the `cpal-output` feature).
//!
//! # Usage
//!
//! ```bash
//! # Five seconds of audio at the native refresh rate
//! retroglue
//!
//! # Hold A (octave up) and pan left, pause between 2s and 3s
//! retroglue --hold x --hold ArrowLeft --pause-at 2 --resume-at 3
//! ```

mod host;
mod tone;

#[cfg(feature = "cpal-output")]
mod cpal_sink;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use retroglue_core::config::{Settings, data_dir};
use retroglue_core::{
    AudioSink, Emulator, FileSaveRamStore, SaveRamStore, Session, SessionEvent, save_emulator_ram,
};
use tracing::{info, warn};

use crate::host::HostOptions;
use crate::tone::ToneEmulator;

/// Retroglue - headless handheld emulator front end
#[derive(Parser, Debug)]
#[command(name = "retroglue")]
#[command(about = "Paces a demo emulator and streams its audio through the lock-free bridge")]
#[command(version)]
struct Args {
    /// Seconds to run (0 runs until interrupted)
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    /// Emulated refresh rate in Hz (overrides the config file)
    #[arg(long)]
    frame_rate: Option<f64>,

    /// Output volume 0.0-1.0 (saved to the config file)
    #[arg(long)]
    volume: Option<f32>,

    /// Run without opening audio
    #[arg(long)]
    no_audio: bool,

    /// Key held for the whole run, e.g. `x` or `ArrowLeft` (repeatable)
    #[arg(long = "hold", value_name = "KEY")]
    hold: Vec<String>,

    /// Pause after this many seconds
    #[arg(long, value_name = "SECS")]
    pause_at: Option<f64>,

    /// Resume after this many seconds
    #[arg(long, value_name = "SECS", requires = "pause_at")]
    resume_at: Option<f64>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for save RAM (defaults to the platform data directory)
    #[arg(long, value_name = "DIR")]
    save_dir: Option<PathBuf>,

    /// Stop after this many emulated frames
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Host timer rate in Hz
    #[arg(long, default_value_t = 240)]
    tick_hz: u32,

    /// Cartridge title, used as the save-RAM key
    #[arg(long, default_value = "Tone Demo")]
    title: String,
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid --{}: {}", flag, value))
}

fn save_dir(args: &Args) -> PathBuf {
    args.save_dir
        .clone()
        .or_else(|| data_dir().map(|dir| dir.join("saves")))
        .unwrap_or_else(|| PathBuf::from("saves"))
}

#[cfg(feature = "cpal-output")]
fn audio_sink(_settings: &Settings) -> Box<dyn AudioSink> {
    Box::new(cpal_sink::CpalSink::new())
}

#[cfg(not(feature = "cpal-output"))]
fn audio_sink(settings: &Settings) -> Box<dyn AudioSink> {
    let audio = &settings.config().audio;
    Box::new(retroglue_core::ClockedSink::new(
        audio.sample_rate,
        audio.block_frames,
    ))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut settings = Settings::load(args.config.clone());
    if let Some(volume) = args.volume {
        settings.set_volume(volume);
    }
    let mut config = settings.config().clone();
    if let Some(frame_rate) = args.frame_rate {
        config.timing.frame_rate = frame_rate;
    }
    let session_config = config.session_config();
    let frame_rate = session_config.pacer.frame_rate();

    let run_for = match seconds(args.seconds, "seconds")? {
        d if d.is_zero() => None,
        d => Some(d),
    };
    let mut options = HostOptions::new(run_for, args.tick_hz);
    options.pause_at = args.pause_at.map(|s| seconds(s, "pause-at")).transpose()?;
    options.resume_at = args.resume_at.map(|s| seconds(s, "resume-at")).transpose()?;

    // Save RAM
    let store = Rc::new(RefCell::new(FileSaveRamStore::new(save_dir(&args))));
    let mut emulator = ToneEmulator::new(args.title.clone(), frame_rate);
    match store.borrow().load(&args.title) {
        Ok(Some(ram)) => emulator = emulator.with_ram(&ram),
        Ok(None) => {}
        Err(e) => warn!("Failed to load save RAM: {}", e),
    }
    if let Some(frames) = args.frames {
        emulator = emulator.with_frame_limit(frames);
    }

    let mut session = Session::new(session_config);
    let writer = store.clone();
    session.set_persist_callback(move |emu: &ToneEmulator| {
        if let Err(e) = save_emulator_ram(&mut *writer.borrow_mut(), emu) {
            warn!("Failed to save RAM for {}: {}", emu.title(), e);
        }
    });
    session.set_event_listener(|event| match event {
        SessionEvent::Started { title } => info!("ROM started: {}", title),
        SessionEvent::Ended => info!("ROM ended"),
    });
    if !args.no_audio {
        session.set_audio_sink(audio_sink(&settings));
    }

    session.start_session(emulator, !args.no_audio, Instant::now());
    for key in &args.hold {
        if !session.press_key(&config.input, key, true) {
            warn!("Key '{}' is not bound to a button", key);
        }
    }

    let result = host::run(&mut session, &options);

    let counters = session.emulator().map(|emu| (emu.frame(), emu.play_time()));
    if let Some(bridge) = session.bridge() {
        let stats = bridge.stats();
        info!(
            "Bridge: capacity={}, lag={}, relocations={}",
            stats.capacity, stats.lag, stats.relocations
        );
    }
    session.stop_session();

    if let Err(e) = settings.save_if_dirty() {
        warn!("Failed to save config: {}", e);
    }

    let summary = result?;
    info!(
        "Ran {} frames in {:.2}s ({} ticks, {} autosaves){}",
        summary.frames,
        summary.elapsed.as_secs_f64(),
        summary.ticks,
        summary.persist_triggers,
        counters
            .map(|(frame, total)| format!(", frame {} of {} played in total", frame, total))
            .unwrap_or_default()
    );
    Ok(())
}
