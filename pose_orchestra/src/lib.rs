//! # pose_orchestra
//!
//! Conduct a pentatonic note loop with your arms.  Each video frame's pose
//! is smoothed, classified into gestures, mapped to tempo and pitch, and fed
//! to a playback controller that issues commands to an audio engine.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Both wrists in the top quarter of the frame | Start the note loop |
//! | Both wrists in the bottom quarter | Stop the note loop |
//! | Right wrist height | Tempo: top = 180 BPM, bottom = 60 BPM |
//! | Left wrist height | Pitch: top = E4, bottom = C3 |
//! | Clap (wrists < 75 px apart) | Toggle the clap loop (1.5 s cooldown) |
//!
//! ## Pipeline
//!
//! ```text
//! PoseFrame ─► KeypointSmoother ─► classify ─► MusicParams ─► controller::step ─► AudioCommand
//! ```
//!
//! [`engine::GestureEngine`] runs that chain once per tick.  Everything in it
//! is synchronous and single-threaded; pose sources and the MIDI player run
//! on their own threads and talk to the app loop over channels.
//!
//! ## Feature flags
//!
//! * `midi` (default): send notes to the first available MIDI output port.
//!   Without it the player logs what it would have played.

pub mod scale;
pub mod mapper;
pub mod classifier;
pub mod controller;
pub mod audio;
pub mod engine;
pub mod player;
pub mod source;
pub mod replay;
pub mod error;
pub mod app;

pub use audio::{AudioCommand, AudioEngine};
pub use engine::GestureEngine;
pub use error::{OrchestraError, ReplayError};
pub use scale::Pitch;
