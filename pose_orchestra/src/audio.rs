//! The audio engine collaborator: the commands the controller issues and
//! the trait that receives them.

use crate::scale::Pitch;

// ════════════════════════════════════════════════════════════════════════════
// AudioCommand
// ════════════════════════════════════════════════════════════════════════════

/// One instruction for the audio engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCommand {
    /// Begin the note loop at `bpm`.
    StartLoop { bpm: u32 },
    StopLoop,
    /// Retime the running note loop without restarting it.
    SetBpm { bpm: u32 },
    /// Sound one note of the loop.
    PlayNote(Pitch),
    StartClapLoop,
    StopClapLoop,
}

// ════════════════════════════════════════════════════════════════════════════
// AudioEngine
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can play the loops.
pub trait AudioEngine {
    fn start_loop(&mut self, bpm: u32);
    fn stop_loop(&mut self);
    fn set_bpm(&mut self, bpm: u32);
    fn play_note(&mut self, note: Pitch);
    fn start_clap_loop(&mut self);
    fn stop_clap_loop(&mut self);

    /// Route a command to the matching method.
    fn dispatch(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::StartLoop { bpm } => self.start_loop(bpm),
            AudioCommand::StopLoop          => self.stop_loop(),
            AudioCommand::SetBpm { bpm }    => self.set_bpm(bpm),
            AudioCommand::PlayNote(note)    => self.play_note(note),
            AudioCommand::StartClapLoop     => self.start_clap_loop(),
            AudioCommand::StopClapLoop      => self.stop_clap_loop(),
        }
    }
}

// ── null backend (used with --no-midi) ───────────────────────────────────

/// Discards everything.
pub struct NullEngine;

impl AudioEngine for NullEngine {
    fn start_loop(&mut self, _bpm: u32)   {}
    fn stop_loop(&mut self)               {}
    fn set_bpm(&mut self, _bpm: u32)      {}
    fn play_note(&mut self, _note: Pitch) {}
    fn start_clap_loop(&mut self)         {}
    fn stop_clap_loop(&mut self)          {}
}

// ── tally backend (end-of-run summary) ───────────────────────────────────

/// Counts what it is asked to do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandTally {
    pub loop_starts:      u32,
    pub loop_stops:       u32,
    pub tempo_changes:    u32,
    pub notes:            u32,
    pub clap_loop_starts: u32,
    pub clap_loop_stops:  u32,
    /// Tempo of the most recent start or retime.
    pub last_bpm:         Option<u32>,
}

impl AudioEngine for CommandTally {
    fn start_loop(&mut self, bpm: u32) {
        self.loop_starts += 1;
        self.last_bpm = Some(bpm);
    }
    fn stop_loop(&mut self) { self.loop_stops += 1; }
    fn set_bpm(&mut self, bpm: u32) {
        self.tempo_changes += 1;
        self.last_bpm = Some(bpm);
    }
    fn play_note(&mut self, _note: Pitch) { self.notes += 1; }
    fn start_clap_loop(&mut self) { self.clap_loop_starts += 1; }
    fn stop_clap_loop(&mut self)  { self.clap_loop_stops += 1; }
}

// ── recording backend (tests) ────────────────────────────────────────────

/// Keeps every command in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub commands: Vec<AudioCommand>,
}

#[cfg(test)]
impl RecordingEngine {
    /// The commands that change loop state, without notes and retimes.
    pub fn transitions(&self) -> Vec<AudioCommand> {
        self.commands.iter().copied()
            .filter(|c| !matches!(c, AudioCommand::PlayNote(_) | AudioCommand::SetBpm { .. }))
            .collect()
    }
}

#[cfg(test)]
impl AudioEngine for RecordingEngine {
    fn start_loop(&mut self, bpm: u32)   { self.commands.push(AudioCommand::StartLoop { bpm }); }
    fn stop_loop(&mut self)              { self.commands.push(AudioCommand::StopLoop); }
    fn set_bpm(&mut self, bpm: u32)      { self.commands.push(AudioCommand::SetBpm { bpm }); }
    fn play_note(&mut self, note: Pitch) { self.commands.push(AudioCommand::PlayNote(note)); }
    fn start_clap_loop(&mut self)        { self.commands.push(AudioCommand::StartClapLoop); }
    fn stop_clap_loop(&mut self)         { self.commands.push(AudioCommand::StopClapLoop); }
}
