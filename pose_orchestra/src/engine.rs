//! The per-tick pipeline: smoother → classifier → mapper → controller.

use std::time::Duration;

use pose_smoother::{KeypointSmoother, PoseFrame};

use crate::audio::{AudioCommand, AudioEngine};
use crate::classifier::{classify, GestureState, WristPair};
use crate::controller::{step, PlaybackState};
use crate::mapper::MusicParams;

/// Owns the smoothing filters and the playback state for one session.
#[derive(Clone, Debug, Default)]
pub struct GestureEngine {
    smoother: KeypointSmoother,
    state:    PlaybackState,
    gesture:  GestureState,
}

impl GestureEngine {
    pub fn new() -> Self {
        GestureEngine::default()
    }

    /// Run one tick and return the commands it produced.
    ///
    /// `frame` is the most recent pose frame, which may be the same one as
    /// last tick; `None` before the source has delivered anything.  `now`
    /// is time since the session started.
    pub fn tick(&mut self, frame: Option<&PoseFrame>, now: Duration) -> Vec<AudioCommand> {
        let person = frame.and_then(|f| f.person.as_ref());
        if let Some(pose) = person {
            self.smoother.update(pose);
        }

        let cooldown = self.state.cooldown_active_at(now);
        let wrists   = person.and_then(|pose| WristPair::from_pose(&self.smoother, pose));
        let height   = frame.map(|f| f.size.height()).unwrap_or(1.0);

        self.gesture = classify(wrists.as_ref(), height, cooldown);
        let params   = MusicParams::from_gesture(&self.gesture, height);

        let (state, cmds) = step(&self.state, &self.gesture, params, now);
        self.state = state;
        cmds
    }

    /// [`tick`](Self::tick), sending the commands straight to `audio`.
    pub fn tick_into(&mut self, frame: Option<&PoseFrame>, now: Duration, audio: &mut dyn AudioEngine) {
        for cmd in self.tick(frame, now) {
            audio.dispatch(cmd);
        }
    }

    /// Commands that silence whatever is still running, for shutdown.
    pub fn shutdown_commands(&self) -> Vec<AudioCommand> {
        let mut cmds = Vec::new();
        if self.state.is_playing      { cmds.push(AudioCommand::StopLoop); }
        if self.state.clapping_active { cmds.push(AudioCommand::StopClapLoop); }
        cmds
    }

    pub fn state(&self)    -> &PlaybackState    { &self.state }
    pub fn smoother(&self) -> &KeypointSmoother { &self.smoother }
    /// Gesture classified on the last tick.
    pub fn gesture(&self)  -> &GestureState     { &self.gesture }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
