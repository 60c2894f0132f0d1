//! Playback controller: turns per-frame gestures into audio commands.
//!
//! All persistent playback data lives in [`PlaybackState`], a plain value
//! that [`step`] takes and returns.  Three independent machines share it:
//!
//! * note loop   — `Stopped` ⇄ `Playing` (arms raised / arms lowered)
//! * clap loop   — `ClapOff` ⇄ `ClapOn` (each accepted clap)
//! * clap cooldown — `Idle` → `Active` on every toggle, back to `Idle` once
//!   more than [`CLAP_COOLDOWN`] has passed, judged from timestamps
//!
//! While playing, the controller also keeps the loop's beat clock and emits
//! one [`AudioCommand::PlayNote`] per beat using whatever pitch is current
//! when the beat falls.

use std::time::Duration;

use pose_midi::beat_duration;
use tracing::{debug, info, trace};

use crate::audio::AudioCommand;
use crate::classifier::GestureState;
use crate::mapper::{MusicParams, DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO};
use crate::scale::{Pitch, NUM_NOTES};

/// Claps within this long of the last toggle are ignored.
pub const CLAP_COOLDOWN: Duration = Duration::from_millis(1500);

// ════════════════════════════════════════════════════════════════════════════
// PlaybackState
// ════════════════════════════════════════════════════════════════════════════

/// Everything the controller remembers between ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    pub is_playing:           bool,
    /// BPM, always within 60–180.
    pub current_tempo:        u32,
    /// Scale index, always within 0–7.
    pub current_pitch_index:  usize,
    pub clapping_active:      bool,
    /// Cooldown flag as of the last [`step`].
    pub clap_cooldown_active: bool,
    /// When the clap loop last toggled.
    pub last_clap_at:         Option<Duration>,
    /// When the note loop last sounded a note; `None` means the next tick
    /// that finds the loop playing sounds one straight away.
    pub last_beat_at:         Option<Duration>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState {
            is_playing:           false,
            current_tempo:        DEFAULT_TEMPO,
            current_pitch_index:  0,
            clapping_active:      false,
            clap_cooldown_active: false,
            last_clap_at:         None,
            last_beat_at:         None,
        }
    }
}

impl PlaybackState {
    /// Whether a clap toggle at `now` would still fall inside the cooldown.
    pub fn cooldown_active_at(&self, now: Duration) -> bool {
        match self.last_clap_at {
            Some(t) => now.saturating_sub(t) <= CLAP_COOLDOWN,
            None    => false,
        }
    }

    pub fn current_pitch(&self) -> Pitch {
        Pitch::from_index(self.current_pitch_index)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// step — one tick of the controller
// ════════════════════════════════════════════════════════════════════════════

/// Advance the controller by one tick.
///
/// Returns the new state and the commands to send, in order.  Never fails;
/// a neutral gesture with no `params` only runs the beat clock.
pub fn step(
    state:   &PlaybackState,
    gesture: &GestureState,
    params:  Option<MusicParams>,
    now:     Duration,
) -> (PlaybackState, Vec<AudioCommand>) {
    let mut next = state.clone();
    let mut cmds = Vec::new();

    next.clap_cooldown_active = next.cooldown_active_at(now);

    // ── start / stop ─────────────────────────────────────────────────────
    if gesture.arms_raised {
        if !next.is_playing {
            next.is_playing   = true;
            next.last_beat_at = None;
            cmds.push(AudioCommand::StartLoop { bpm: next.current_tempo });
            info!(bpm = next.current_tempo, "note loop started");
        }
    } else if gesture.arms_lowered && next.is_playing {
        next.is_playing   = false;
        next.last_beat_at = None;
        cmds.push(AudioCommand::StopLoop);
        info!("note loop stopped");
    }

    // ── tempo / pitch ────────────────────────────────────────────────────
    if let Some(p) = params {
        let tempo = p.tempo.clamp(MIN_TEMPO, MAX_TEMPO);
        if tempo != next.current_tempo {
            debug!(from = next.current_tempo, to = tempo, "tempo updated");
            next.current_tempo = tempo;
            if next.is_playing {
                cmds.push(AudioCommand::SetBpm { bpm: tempo });
            }
        }

        let pitch_index = p.pitch_index.min(NUM_NOTES - 1);
        if pitch_index != next.current_pitch_index {
            debug!(
                from = %Pitch::from_index(next.current_pitch_index),
                to   = %Pitch::from_index(pitch_index),
                "pitch updated"
            );
        }
        next.current_pitch_index = pitch_index;
    }

    // ── clap loop ────────────────────────────────────────────────────────
    if gesture.clap_detected && !next.clap_cooldown_active {
        next.clapping_active = !next.clapping_active;
        cmds.push(if next.clapping_active {
            AudioCommand::StartClapLoop
        } else {
            AudioCommand::StopClapLoop
        });
        next.last_clap_at         = Some(now);
        next.clap_cooldown_active = true;
        info!(clapping = next.clapping_active, "clap detected");
    }

    // ── beat clock ───────────────────────────────────────────────────────
    if next.is_playing {
        let beat = beat_duration(next.current_tempo);
        let due  = next.last_beat_at.map(|t| t + beat);
        match due {
            None => {
                next.last_beat_at = Some(now);
                cmds.push(AudioCommand::PlayNote(next.current_pitch()));
            }
            Some(due) if now >= due => {
                // after a stall longer than a beat, restart the grid at `now`
                let on_grid = now.saturating_sub(due) < beat;
                next.last_beat_at = Some(if on_grid { due } else { now });
                cmds.push(AudioCommand::PlayNote(next.current_pitch()));
            }
            Some(_) => {}
        }
        if let Some(AudioCommand::PlayNote(p)) = cmds.last() {
            trace!(note = %p, bpm = next.current_tempo, "beat");
        }
    }

    (next, cmds)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration { Duration::from_millis(v) }

    fn raised() -> GestureState {
        GestureState { arms_raised: true, ..GestureState::neutral() }
    }
    fn lowered() -> GestureState {
        GestureState { arms_lowered: true, ..GestureState::neutral() }
    }
    fn clap() -> GestureState {
        GestureState { clap_detected: true, ..GestureState::neutral() }
    }
    fn params(tempo: u32, pitch_index: usize) -> Option<MusicParams> {
        Some(MusicParams { tempo, pitch_index })
    }

    fn count(cmds: &[AudioCommand], want: AudioCommand) -> usize {
        cmds.iter().filter(|c| **c == want).count()
    }

    // ── start / stop ─────────────────────────────────────────────────────
    #[test]
    fn raise_starts_once() {
        let mut s = PlaybackState::default();
        let mut all = Vec::new();
        for i in 0..3 {
            let (n, c) = step(&s, &raised(), None, ms(i * 16));
            s = n;
            all.extend(c);
        }
        assert!(s.is_playing);
        assert_eq!(count(&all, AudioCommand::StartLoop { bpm: 120 }), 1);
    }

    #[test]
    fn lower_stops_only_when_playing() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &lowered(), None, ms(0));
        assert!(c.is_empty());
        let (s, _) = step(&s, &raised(), None, ms(10));
        let (s, c) = step(&s, &lowered(), None, ms(20));
        assert!(!s.is_playing);
        assert_eq!(c, [AudioCommand::StopLoop]);
        assert_eq!(s.last_beat_at, None);
    }

    #[test]
    fn start_uses_tempo_then_retimes() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &raised(), params(170, 3), ms(0));
        assert_eq!(
            c,
            [
                AudioCommand::StartLoop { bpm: 120 },
                AudioCommand::SetBpm { bpm: 170 },
                AudioCommand::PlayNote(Pitch::G3),
            ]
        );
        assert_eq!(s.current_tempo, 170);
    }

    // ── tempo / pitch ────────────────────────────────────────────────────
    #[test]
    fn tempo_changes_only_reach_engine_while_playing() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &GestureState::neutral(), params(90, 0), ms(0));
        assert!(c.is_empty());
        assert_eq!(s.current_tempo, 90);

        let (s, _) = step(&s, &raised(), params(90, 0), ms(10));
        let (_, c) = step(&s, &GestureState::neutral(), params(95, 0), ms(20));
        assert_eq!(c, [AudioCommand::SetBpm { bpm: 95 }]);
    }

    #[test]
    fn unchanged_tempo_is_silent() {
        let s = PlaybackState { is_playing: true, last_beat_at: Some(ms(0)), ..PlaybackState::default() };
        let (_, c) = step(&s, &GestureState::neutral(), params(120, 2), ms(10));
        assert!(c.is_empty());
    }

    #[test]
    fn pitch_updates_when_stopped() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &GestureState::neutral(), params(120, 6), ms(0));
        assert!(c.is_empty());
        assert_eq!(s.current_pitch(), Pitch::D4);
    }

    #[test]
    fn out_of_range_params_are_clamped() {
        let s = PlaybackState::default();
        let (s, _) = step(&s, &GestureState::neutral(), params(400, 40), ms(0));
        assert_eq!(s.current_tempo, MAX_TEMPO);
        assert_eq!(s.current_pitch_index, NUM_NOTES - 1);
        let (s, _) = step(&s, &GestureState::neutral(), params(0, 0), ms(1));
        assert_eq!(s.current_tempo, MIN_TEMPO);
    }

    #[test]
    fn neutral_gesture_leaves_state_alone() {
        let s = PlaybackState { current_tempo: 77, current_pitch_index: 4, ..PlaybackState::default() };
        let (n, c) = step(&s, &GestureState::neutral(), None, ms(5));
        assert!(c.is_empty());
        assert_eq!(n, s);
    }

    // ── clap loop / cooldown ─────────────────────────────────────────────
    #[test]
    fn clap_toggles_and_arms_cooldown() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &clap(), None, ms(1000));
        assert_eq!(c, [AudioCommand::StartClapLoop]);
        assert!(s.clapping_active);
        assert!(s.clap_cooldown_active);
        assert_eq!(s.last_clap_at, Some(ms(1000)));
    }

    #[test]
    fn clap_ignored_during_cooldown() {
        let s = PlaybackState::default();
        let (mut s, _) = step(&s, &clap(), None, ms(0));
        for t in (16..=1500).step_by(16) {
            let (n, c) = step(&s, &clap(), None, ms(t));
            assert!(c.is_empty(), "toggled again at {} ms", t);
            s = n;
        }
        assert!(s.clapping_active);
    }

    #[test]
    fn cooldown_expires_after_window() {
        let s = PlaybackState::default();
        let (s, _) = step(&s, &clap(), None, ms(0));
        let (s, c) = step(&s, &GestureState::neutral(), None, ms(1500));
        assert!(c.is_empty());
        assert!(s.clap_cooldown_active);
        let (s, _) = step(&s, &GestureState::neutral(), None, ms(1501));
        assert!(!s.clap_cooldown_active);
        let (s, c) = step(&s, &clap(), None, ms(1600));
        assert_eq!(c, [AudioCommand::StopClapLoop]);
        assert!(!s.clapping_active);
    }

    #[test]
    fn clap_loop_independent_of_note_loop() {
        let s = PlaybackState::default();
        let (s, _) = step(&s, &clap(), None, ms(0));
        let (s, _) = step(&s, &raised(), None, ms(10));
        let (s, _) = step(&s, &lowered(), None, ms(20));
        assert!(s.clapping_active);
        assert!(!s.is_playing);
    }

    // ── beat clock ───────────────────────────────────────────────────────
    #[test]
    fn first_note_on_start_then_one_per_beat() {
        let mut s = PlaybackState::default();
        let mut notes = Vec::new();
        let (n, c) = step(&s, &raised(), None, ms(0));
        s = n;
        notes.extend(c.into_iter().filter(|c| matches!(c, AudioCommand::PlayNote(_))).map(|_| 0));
        // 120 BPM → a note every 500 ms
        for t in (16..=2000).step_by(16) {
            let (n, c) = step(&s, &GestureState::neutral(), None, ms(t));
            s = n;
            if c.iter().any(|c| matches!(c, AudioCommand::PlayNote(_))) {
                notes.push(t);
            }
        }
        assert_eq!(notes, [0, 512, 1008, 1504, 2000]);
    }

    #[test]
    fn note_uses_pitch_current_at_the_beat() {
        let s = PlaybackState::default();
        let (s, c) = step(&s, &raised(), None, ms(0));
        assert_eq!(c.last(), Some(&AudioCommand::PlayNote(Pitch::C3)));
        let (s, c) = step(&s, &GestureState::neutral(), params(120, 7), ms(100));
        assert!(c.is_empty());
        let (_, c) = step(&s, &GestureState::neutral(), None, ms(500));
        assert_eq!(c, [AudioCommand::PlayNote(Pitch::E4)]);
    }

    #[test]
    fn tempo_change_shortens_next_beat() {
        let s = PlaybackState::default();
        let (s, _) = step(&s, &raised(), None, ms(0));
        // 180 BPM → beat of 333 ms
        let (s, c) = step(&s, &GestureState::neutral(), params(180, 0), ms(100));
        assert_eq!(c, [AudioCommand::SetBpm { bpm: 180 }]);
        let (_, c) = step(&s, &GestureState::neutral(), None, ms(340));
        assert_eq!(c, [AudioCommand::PlayNote(Pitch::C3)]);
    }

    #[test]
    fn stall_resyncs_instead_of_bursting() {
        let s = PlaybackState::default();
        let (s, _) = step(&s, &raised(), None, ms(0));
        let (s, c) = step(&s, &GestureState::neutral(), None, ms(5000));
        assert_eq!(c.len(), 1);
        assert_eq!(s.last_beat_at, Some(ms(5000)));
        let (_, c) = step(&s, &GestureState::neutral(), None, ms(5100));
        assert!(c.is_empty());
    }

    #[test]
    fn no_notes_while_stopped() {
        let s = PlaybackState::default();
        let (_, c) = step(&s, &GestureState::neutral(), None, ms(10_000));
        assert!(c.is_empty());
    }
}
