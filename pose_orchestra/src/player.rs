//! Real-time MIDI playback thread.
//!
//! The app loop hands [`AudioCommand`]s to a [`MidiPlayer`]; the player
//! thread turns them into MIDI messages, schedules note-offs and runs the
//! clap loop's own clock.  The note loop's beat is decided by the controller
//! (one `PlayNote` per beat); the player only sounds what it is told.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pose_midi::{
    beat_duration, GeneralMidi, MidiMessage, NoteValue, PitchMap, GM_HAND_CLAP, PERCUSSION_CHANNEL,
};
use tracing::{trace, warn};

use crate::audio::{AudioCommand, AudioEngine};
use crate::mapper::DEFAULT_TEMPO;
use crate::scale::Pitch;

/// The clap loop ignores the note loop's tempo and claps once a second.
pub const CLAP_LOOP_BPM: u32 = 60;

/// Wake-up interval while nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_millis(250);

// ════════════════════════════════════════════════════════════════════════════
// PlayerCommand — sent to the playback thread
// ════════════════════════════════════════════════════════════════════════════

pub enum PlayerCommand {
    Audio(AudioCommand),
    /// Silence everything and terminate the thread.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// MidiSink — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiSink: Send {
    fn send(&mut self, msg: MidiMessage);
}

// ── midir backend ─────────────────────────────────────────────────────────

#[cfg(feature = "midi")]
struct MidirSink {
    conn: midir::MidiOutputConnection,
}

#[cfg(feature = "midi")]
impl MidiSink for MidirSink {
    fn send(&mut self, msg: MidiMessage) {
        if let Err(e) = self.conn.send(&msg.to_bytes()) {
            warn!(error = %e, ?msg, "MIDI send failed");
        }
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

pub struct NullSink;

impl MidiSink for NullSink {
    fn send(&mut self, msg: MidiMessage) {
        trace!(?msg, "midi (no output)");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick first available
// ════════════════════════════════════════════════════════════════════════════

/// Try to open a MIDI output port, preferring a software synth.
/// Falls back to [`NullSink`] with a warning if none can be opened.
#[cfg(feature = "midi")]
pub fn open_midi_output() -> Box<dyn MidiSink> {
    let midi_out = match midir::MidiOutput::new("pose_orchestra") {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, using null output");
            return Box::new(NullSink);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        warn!("no MIDI output ports found, using null output");
        warn!("start a synthesiser such as `fluidsynth` or `timidity -iA` to hear the loop");
        return Box::new(NullSink);
    }

    let port_idx = ports.iter().enumerate()
        .find(|(_, p)| {
            midi_out.port_name(p).map(|n| {
                let n = n.to_lowercase();
                n.contains("fluid") || n.contains("timidity") ||
                n.contains("microsoft") || n.contains("synth")
            }).unwrap_or(false)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port)
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::info!(port = %name, "opening MIDI output");

    match midi_out.connect(port, "pose-orchestra-out") {
        Ok(conn) => Box::new(MidirSink { conn }),
        Err(e) => {
            warn!(error = %e, port = %name, "MIDI connect failed, using null output");
            Box::new(NullSink)
        }
    }
}

#[cfg(not(feature = "midi"))]
pub fn open_midi_output() -> Box<dyn MidiSink> {
    warn!("built without the `midi` feature, using null output");
    Box::new(NullSink)
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    /// Scale degree → MIDI note; degree 0 is C3.
    pub pitch_map:  PitchMap,
    pub instrument: u8,
    pub velocity:   u8,
    /// Channel of the note loop (the clap loop is always on percussion).
    pub channel:    u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            pitch_map:  PitchMap::pentatonic_major(48),
            instrument: GeneralMidi::AcousticGrandPiano.program(),
            velocity:   100,
            channel:    0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlayerCore — everything the thread does, minus the thread
// ════════════════════════════════════════════════════════════════════════════

/// Turns audio commands into timed MIDI messages.
pub struct PlayerCore<S: MidiSink> {
    cfg:       PlayerConfig,
    sink:      S,
    bpm:       u32,
    /// Messages waiting for their time, in no particular order.
    pending:   Vec<(Instant, MidiMessage)>,
    /// Note of the loop currently sounding.
    sounding:  Option<u8>,
    next_clap: Option<Instant>,
}

impl<S: MidiSink> PlayerCore<S> {
    pub fn new(cfg: PlayerConfig, mut sink: S) -> Self {
        sink.send(MidiMessage::ProgramChange { channel: cfg.channel, program: cfg.instrument });
        PlayerCore {
            cfg,
            sink,
            bpm:       DEFAULT_TEMPO,
            pending:   Vec::new(),
            sounding:  None,
            next_clap: None,
        }
    }

    pub fn sink(&self) -> &S { &self.sink }

    pub fn handle(&mut self, cmd: AudioCommand, now: Instant) {
        match cmd {
            AudioCommand::StartLoop { bpm } => {
                self.bpm = bpm;
                self.sink.send(MidiMessage::ProgramChange {
                    channel: self.cfg.channel,
                    program: self.cfg.instrument,
                });
            }
            AudioCommand::StopLoop => {
                self.release_note();
                self.sink.send(MidiMessage::AllNotesOff { channel: self.cfg.channel });
            }
            AudioCommand::SetBpm { bpm } => self.bpm = bpm,
            AudioCommand::PlayNote(pitch) => self.play(pitch, now),
            AudioCommand::StartClapLoop => {
                if self.next_clap.is_none() {
                    self.next_clap = Some(now);
                }
            }
            AudioCommand::StopClapLoop => self.next_clap = None,
        }
        self.fire_due(now);
    }

    fn play(&mut self, pitch: Pitch, now: Instant) {
        self.release_note();
        let note    = self.cfg.pitch_map.note_for(pitch.index());
        let channel = self.cfg.channel;
        self.sink.send(MidiMessage::NoteOn { channel, note, velocity: self.cfg.velocity });
        self.pending.push((now + NoteValue::Eighth.duration_at(self.bpm), MidiMessage::NoteOff { channel, note }));
        self.sounding = Some(note);
        trace!(%pitch, note, bpm = self.bpm, "note on");
    }

    /// Cut the sounding loop note short, if there is one.
    fn release_note(&mut self) {
        if let Some(note) = self.sounding.take() {
            let off = MidiMessage::NoteOff { channel: self.cfg.channel, note };
            self.pending.retain(|&(_, m)| m != off);
            self.sink.send(off);
        }
    }

    /// Send everything whose time has come.
    pub fn fire_due(&mut self, now: Instant) {
        let beat = beat_duration(CLAP_LOOP_BPM);
        while let Some(at) = self.next_clap.filter(|&at| at <= now) {
            self.clap(at);
            // after a stall, carry on from now instead of catching up
            let next = at + beat;
            self.next_clap = Some(if next <= now { now + beat } else { next });
        }

        let mut due: Vec<(Instant, MidiMessage)> = Vec::new();
        self.pending.retain(|&(at, msg)| {
            if at <= now { due.push((at, msg)); false } else { true }
        });
        due.sort_by_key(|&(at, _)| at);
        for (_, msg) in due {
            if let MidiMessage::NoteOff { channel, note } = msg {
                if channel == self.cfg.channel && self.sounding == Some(note) {
                    self.sounding = None;
                }
            }
            self.sink.send(msg);
        }
    }

    fn clap(&mut self, at: Instant) {
        let channel = PERCUSSION_CHANNEL;
        self.sink.send(MidiMessage::NoteOn { channel, note: GM_HAND_CLAP, velocity: self.cfg.velocity });
        self.pending.push((
            at + NoteValue::Sixteenth.duration_at(CLAP_LOOP_BPM),
            MidiMessage::NoteOff { channel, note: GM_HAND_CLAP },
        ));
        trace!("clap");
    }

    /// When [`fire_due`](Self::fire_due) next has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|&(at, _)| at)
            .chain(self.next_clap)
            .min()
    }

    /// Flush pending note-offs and silence both channels.
    pub fn silence(&mut self) {
        self.next_clap = None;
        self.sounding  = None;
        for (_, msg) in std::mem::take(&mut self.pending) {
            self.sink.send(msg);
        }
        self.sink.send(MidiMessage::AllNotesOff { channel: self.cfg.channel });
        self.sink.send(MidiMessage::AllNotesOff { channel: PERCUSSION_CHANNEL });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiPlayer — the playback thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the MIDI playback thread.  Dropping it silences the output and
/// joins the thread.
pub struct MidiPlayer {
    cmd_tx: Sender<PlayerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl MidiPlayer {
    /// Spawn the playback thread on the first usable MIDI output.
    pub fn spawn(cfg: PlayerConfig) -> Self {
        MidiPlayer::spawn_with(cfg, open_midi_output)
    }

    /// Spawn the playback thread; `open` runs on that thread to create the sink.
    pub fn spawn_with<S, F>(cfg: PlayerConfig, open: F) -> Self
    where
        S: MidiSink + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlayerCommand>();

        let handle = thread::spawn(move || {
            let mut core = PlayerCore::new(cfg, open());
            loop {
                let timeout = core.next_deadline()
                    .map(|at| at.saturating_duration_since(Instant::now()))
                    .unwrap_or(IDLE_WAIT);

                match cmd_rx.recv_timeout(timeout) {
                    Ok(PlayerCommand::Audio(cmd)) => core.handle(cmd, Instant::now()),
                    Ok(PlayerCommand::Quit) | Err(RecvTimeoutError::Disconnected) => {
                        core.silence();
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                }
                core.fire_due(Instant::now());
            }
        });

        MidiPlayer { cmd_tx, handle: Some(handle) }
    }

    fn send(&self, cmd: AudioCommand) {
        let _ = self.cmd_tx.send(PlayerCommand::Audio(cmd));
    }
}

impl MidiSink for Box<dyn MidiSink> {
    fn send(&mut self, msg: MidiMessage) {
        (**self).send(msg)
    }
}

impl AudioEngine for MidiPlayer {
    fn start_loop(&mut self, bpm: u32)    { self.send(AudioCommand::StartLoop { bpm }); }
    fn stop_loop(&mut self)               { self.send(AudioCommand::StopLoop); }
    fn set_bpm(&mut self, bpm: u32)       { self.send(AudioCommand::SetBpm { bpm }); }
    fn play_note(&mut self, note: Pitch)  { self.send(AudioCommand::PlayNote(note)); }
    fn start_clap_loop(&mut self)         { self.send(AudioCommand::StartClapLoop); }
    fn stop_clap_loop(&mut self)          { self.send(AudioCommand::StopClapLoop); }
}

impl Drop for MidiPlayer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlayerCommand::Quit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct LogSink {
        sent: Vec<MidiMessage>,
    }

    impl MidiSink for LogSink {
        fn send(&mut self, msg: MidiMessage) { self.sent.push(msg); }
    }

    /// Forwards to a channel so a test can watch the player thread.
    struct ChannelSink(Sender<MidiMessage>);

    impl MidiSink for ChannelSink {
        fn send(&mut self, msg: MidiMessage) { let _ = self.0.send(msg); }
    }

    fn ms(v: u64) -> Duration { Duration::from_millis(v) }

    fn core() -> PlayerCore<LogSink> {
        PlayerCore::new(PlayerConfig::default(), LogSink::default())
    }

    fn note_ons(sent: &[MidiMessage], channel: u8) -> usize {
        sent.iter()
            .filter(|m| matches!(m, MidiMessage::NoteOn { channel: c, .. } if *c == channel))
            .count()
    }

    #[test]
    fn program_change_on_open() {
        let c = core();
        assert_eq!(c.sink().sent, [MidiMessage::ProgramChange { channel: 0, program: 0 }]);
    }

    #[test]
    fn note_lasts_an_eighth() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::StartLoop { bpm: 120 }, t0);
        c.handle(AudioCommand::PlayNote(Pitch::C3), t0);
        assert_eq!(
            c.sink().sent.last(),
            Some(&MidiMessage::NoteOn { channel: 0, note: 48, velocity: 100 })
        );
        assert_eq!(c.next_deadline(), Some(t0 + ms(250)));

        c.fire_due(t0 + ms(249));
        assert!(!c.sink().sent.contains(&MidiMessage::NoteOff { channel: 0, note: 48 }));
        c.fire_due(t0 + ms(250));
        assert_eq!(c.sink().sent.last(), Some(&MidiMessage::NoteOff { channel: 0, note: 48 }));
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn retimed_loop_lengthens_notes() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::SetBpm { bpm: 60 }, t0);
        c.handle(AudioCommand::PlayNote(Pitch::E4), t0);
        assert_eq!(
            c.sink().sent.last(),
            Some(&MidiMessage::NoteOn { channel: 0, note: 64, velocity: 100 })
        );
        assert_eq!(c.next_deadline(), Some(t0 + ms(500)));
    }

    #[test]
    fn next_note_cuts_the_previous_one() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::PlayNote(Pitch::C3), t0);
        c.handle(AudioCommand::PlayNote(Pitch::D3), t0 + ms(100));
        let tail = &c.sink().sent[c.sink().sent.len() - 2..];
        assert_eq!(tail, [
            MidiMessage::NoteOff { channel: 0, note: 48 },
            MidiMessage::NoteOn  { channel: 0, note: 50, velocity: 100 },
        ]);
        // only the new note's release is still scheduled
        assert_eq!(c.next_deadline(), Some(t0 + ms(350)));
    }

    #[test]
    fn stop_loop_silences() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::PlayNote(Pitch::A3), t0);
        c.handle(AudioCommand::StopLoop, t0 + ms(10));
        let tail = &c.sink().sent[c.sink().sent.len() - 2..];
        assert_eq!(tail, [
            MidiMessage::NoteOff { channel: 0, note: 57 },
            MidiMessage::AllNotesOff { channel: 0 },
        ]);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn clap_loop_claps_once_a_second() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::StartClapLoop, t0);
        for step in 1..=350 {
            c.fire_due(t0 + ms(step * 10));
        }
        // t = 0, 1, 2, 3 s
        assert_eq!(note_ons(&c.sink().sent, PERCUSSION_CHANNEL), 4);
        assert!(c.sink().sent.contains(
            &MidiMessage::NoteOn { channel: PERCUSSION_CHANNEL, note: GM_HAND_CLAP, velocity: 100 }
        ));
    }

    #[test]
    fn clap_loop_stops() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::StartClapLoop, t0);
        c.handle(AudioCommand::StopClapLoop, t0 + ms(500));
        for step in 1..=30 {
            c.fire_due(t0 + ms(step * 100));
        }
        assert_eq!(note_ons(&c.sink().sent, PERCUSSION_CHANNEL), 1);
    }

    #[test]
    fn stalled_clap_loop_does_not_burst() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::StartClapLoop, t0);
        c.fire_due(t0 + ms(5500));
        assert_eq!(note_ons(&c.sink().sent, PERCUSSION_CHANNEL), 2);
        assert_eq!(c.next_deadline().map(|d| d >= t0 + ms(5500)), Some(true));
    }

    #[test]
    fn silence_flushes_everything() {
        let mut c = core();
        let t0 = Instant::now();
        c.handle(AudioCommand::StartClapLoop, t0);
        c.handle(AudioCommand::PlayNote(Pitch::G3), t0);
        c.silence();
        let sent = &c.sink().sent;
        assert!(sent.contains(&MidiMessage::NoteOff { channel: 0, note: 55 }));
        assert!(sent.contains(&MidiMessage::NoteOff { channel: PERCUSSION_CHANNEL, note: GM_HAND_CLAP }));
        assert!(sent.ends_with(&[
            MidiMessage::AllNotesOff { channel: 0 },
            MidiMessage::AllNotesOff { channel: PERCUSSION_CHANNEL },
        ]));
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn player_thread_plays_and_shuts_down() {
        let (tx, rx) = mpsc::channel();
        let mut player = MidiPlayer::spawn_with(PlayerConfig::default(), move || ChannelSink(tx));
        player.dispatch(AudioCommand::StartLoop { bpm: 120 });
        player.dispatch(AudioCommand::PlayNote(Pitch::C4));
        drop(player);

        let sent: Vec<_> = rx.iter().collect();
        assert!(sent.contains(&MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 }));
        assert!(sent.contains(&MidiMessage::NoteOff { channel: 0, note: 60 }));
        assert_eq!(sent.last(), Some(&MidiMessage::AllNotesOff { channel: PERCUSSION_CHANNEL }));
    }
}
