//! Top-level application loop.
//!
//! A pose source thread feeds frames over a channel; the loop keeps only the
//! newest one, runs the [`GestureEngine`] at a fixed tick rate and forwards
//! every command to the audio backend and to a [`CommandTally`] for the
//! end-of-run summary.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use pose_smoother::{FrameSize, PoseFrame};
use tracing::info;

use crate::audio::{AudioEngine, CommandTally, NullEngine};
use crate::controller::PlaybackState;
use crate::engine::GestureEngine;
use crate::error::OrchestraError;
use crate::player::{MidiPlayer, PlayerConfig};
use crate::replay::ReplaySource;
use crate::source::{pace, spawn_pose_source, SimPoseSource};

pub const USAGE: &str = "\
usage: pose_orchestra [--replay <file.jsonl>] [--seconds <n>] [--no-midi]
                      [--width <px>] [--height <px>]

  --replay <file>   play back a JSON-lines pose recording instead of the
                    built-in performer
  --seconds <n>     stop after n seconds (default: when the source ends)
  --no-midi         do not open a MIDI output
  --width <px>      frame width the poses are measured in (default 640)
  --height <px>     frame height (default 480)";

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where poses come from.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceKind {
    /// The built-in scripted performer.
    Simulated,
    Replay(PathBuf),
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub frame:     FrameSize,
    pub source:    SourceKind,
    /// Send notes to a MIDI port; otherwise commands are only counted.
    pub midi:      bool,
    pub player:    PlayerConfig,
    /// Engine ticks per second.
    pub tick_rate: u32,
    /// Stop after this long even if the source has more.
    pub run_for:   Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            frame:     FrameSize::default(),
            source:    SourceKind::Simulated,
            midi:      true,
            player:    PlayerConfig::default(),
            tick_rate: 60,
            run_for:   None,
        }
    }
}

impl AppConfig {
    /// Build a config from command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> Result<AppConfig, OrchestraError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cfg = AppConfig::default();
        let (mut width, mut height) = (cfg.frame.width(), cfg.frame.height());
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--replay" => {
                    let path = value_for(&flag, args.next())?;
                    cfg.source = SourceKind::Replay(PathBuf::from(path));
                }
                "--seconds" => {
                    let secs: f64 = parse_number(&flag, args.next())?;
                    let run_for = Duration::try_from_secs_f64(secs)
                        .ok()
                        .filter(|d| !d.is_zero())
                        .ok_or_else(|| OrchestraError::invalid_argument(&flag, "expected a positive number of seconds"))?;
                    cfg.run_for = Some(run_for);
                }
                "--no-midi" => cfg.midi = false,
                "--width"   => width  = parse_dimension(&flag, args.next())?,
                "--height"  => height = parse_dimension(&flag, args.next())?,
                other => return Err(OrchestraError::invalid_argument(other, "unknown flag")),
            }
        }

        cfg.frame = FrameSize::new(width, height);
        Ok(cfg)
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, OrchestraError> {
    value.ok_or_else(|| OrchestraError::invalid_argument(flag, "missing value"))
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, OrchestraError> {
    let raw = value_for(flag, value)?;
    raw.trim().parse()
        .map_err(|_| OrchestraError::invalid_argument(flag, format!("`{}` is not a number", raw)))
}

fn parse_dimension(flag: &str, value: Option<String>) -> Result<f32, OrchestraError> {
    let px: f32 = parse_number(flag, value)?;
    if px.is_finite() && px >= 1.0 {
        Ok(px)
    } else {
        Err(OrchestraError::invalid_argument(flag, "expected a size of at least 1 pixel"))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RunSummary
// ════════════════════════════════════════════════════════════════════════════

/// What happened during a run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub ticks:   u64,
    pub frames:  u64,
    pub elapsed: Duration,
    pub tally:   CommandTally,
    /// Controller state before the shutdown commands were sent.
    pub final_state: PlaybackState,
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// This is the entry point called from `main.rs`.  It starts the pose source
/// and the audio backend, then drives the engine until the source runs dry or
/// the configured run length is reached.
pub fn run(cfg: AppConfig) -> Result<RunSummary, OrchestraError> {
    let frames = match &cfg.source {
        SourceKind::Simulated => {
            info!(width = cfg.frame.width(), height = cfg.frame.height(), "using the simulated performer");
            spawn_pose_source(SimPoseSource::new(cfg.frame))
        }
        SourceKind::Replay(path) => spawn_pose_source(ReplaySource::open(path, cfg.frame)?),
    };

    let mut audio: Box<dyn AudioEngine> = if cfg.midi {
        Box::new(MidiPlayer::spawn(cfg.player.clone()))
    } else {
        Box::new(NullEngine)
    };

    Ok(drive(&frames, audio.as_mut(), cfg.tick_rate, cfg.run_for))
}

/// Tick the engine against `frames` until the sender hangs up or `run_for`
/// has passed, then send the commands that silence whatever is still on.
pub fn drive(
    frames:    &Receiver<PoseFrame>,
    audio:     &mut dyn AudioEngine,
    tick_rate: u32,
    run_for:   Option<Duration>,
) -> RunSummary {
    let period = Duration::from_secs(1) / tick_rate.max(1);
    let start  = Instant::now();

    let mut engine = GestureEngine::new();
    let mut tally  = CommandTally::default();
    let mut latest: Option<PoseFrame> = None;
    let mut frame_count = 0u64;
    let mut ticks       = 0u64;

    loop {
        // ── drain frames, keep the newest ────────────────────────────────
        let mut source_done = false;
        loop {
            match frames.try_recv() {
                Ok(frame) => {
                    latest = Some(frame);
                    frame_count += 1;
                }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => { source_done = true; break; }
            }
        }

        // ── per-tick logic ───────────────────────────────────────────────
        let now = start.elapsed();
        for cmd in engine.tick(latest.as_ref(), now) {
            tally.dispatch(cmd);
            audio.dispatch(cmd);
        }
        ticks += 1;

        if source_done {
            info!("pose source finished");
            break;
        }
        if run_for.map_or(false, |limit| now >= limit) {
            info!(?now, "run length reached");
            break;
        }

        pace(start, period.saturating_mul(ticks.min(u32::MAX as u64) as u32));
    }

    let final_state = engine.state().clone();
    for cmd in engine.shutdown_commands() {
        tally.dispatch(cmd);
        audio.dispatch(cmd);
    }

    RunSummary { ticks, frames: frame_count, elapsed: start.elapsed(), tally, final_state }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
