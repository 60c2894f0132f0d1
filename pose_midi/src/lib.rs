//! # pose_midi
//!
//! The small amount of MIDI knowledge a gesture-driven note loop needs:
//!
//! * [`Scale`] / [`PitchMap`]: scale degree → MIDI note number
//! * [`NoteValue`] and tick helpers: beat-relative durations at a tempo
//! * [`MidiMessage`]: raw channel-voice bytes for a live output port
//!
//! Dependency-free: messages are encoded to bytes here and the caller owns
//! the output port.
//!
//! ## Quick start
//!
//! ```rust
//! use pose_midi::{PitchMap, NoteValue, note_name};
//! use std::time::Duration;
//!
//! // C major pentatonic from C3, the loop's eight-note range
//! let pm = PitchMap::pentatonic_major(48);
//! assert_eq!(note_name(pm.note_for(0)), "C3");
//! assert_eq!(note_name(pm.note_for(7)), "E4");
//!
//! assert_eq!(NoteValue::Eighth.duration_at(120), Duration::from_millis(250));
//! ```

use std::time::Duration;

// ════════════════════════════════════════════════════════════════════════════
// Scale — pitch sets for the PitchMap
// ════════════════════════════════════════════════════════════════════════════

/// A pitch collection, defined as semitone intervals from the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scale {
    /// Semitone offsets from root, e.g. `[0,2,4,7,9]` for major pentatonic.
    pub intervals: Vec<u8>,
    pub name:      &'static str,
}

impl Scale {
    /// Major scale (Ionian): W W H W W W H
    pub fn major() -> Self {
        Scale { intervals: vec![0, 2, 4, 5, 7, 9, 11], name: "Major" }
    }
    /// Pentatonic major: W W 3H W 3H
    pub fn pentatonic_major() -> Self {
        Scale { intervals: vec![0, 2, 4, 7, 9], name: "Pentatonic Major" }
    }
    /// Pentatonic minor
    pub fn pentatonic_minor() -> Self {
        Scale { intervals: vec![0, 3, 5, 7, 10], name: "Pentatonic Minor" }
    }
    /// Custom scale from a list of semitone offsets.
    pub fn custom(intervals: Vec<u8>) -> Self {
        Scale { intervals, name: "Custom" }
    }
    pub fn len(&self) -> usize { self.intervals.len() }
    pub fn is_empty(&self) -> bool { self.intervals.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// PitchMap — scale degree → MIDI note number (0–127)
// ════════════════════════════════════════════════════════════════════════════

/// Maps a scale degree to a MIDI note number, wrapping into higher octaves
/// once the degree runs past the end of the scale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitchMap {
    /// MIDI note number for degree 0.
    pub root:  u8,
    pub scale: Scale,
}

impl PitchMap {
    pub fn major(root: u8) -> Self {
        PitchMap { root, scale: Scale::major() }
    }
    pub fn pentatonic_major(root: u8) -> Self {
        PitchMap { root, scale: Scale::pentatonic_major() }
    }
    pub fn pentatonic_minor(root: u8) -> Self {
        PitchMap { root, scale: Scale::pentatonic_minor() }
    }
    pub fn custom(root: u8, scale: Scale) -> Self {
        PitchMap { root, scale }
    }

    /// Resolve `degree` to a MIDI note number, clamped to 0–127.
    /// An empty scale always yields the root.
    pub fn note_for(&self, degree: usize) -> u8 {
        let n = self.scale.len();
        if n == 0 { return self.root.min(127); }
        let octave   = degree / n;
        let semitone = self.scale.intervals[degree % n] as usize;
        let note     = self.root as usize + octave * 12 + semitone;
        note.min(127) as u8
    }
}

/// Scientific pitch name of a MIDI note, with middle C (60) as `C4`.
pub fn note_name(note: u8) -> String {
    const NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NAMES[note as usize % 12], octave)
}

// ════════════════════════════════════════════════════════════════════════════
// Timing
// ════════════════════════════════════════════════════════════════════════════

/// MIDI resolution used for beat arithmetic.
pub const TICKS_PER_QUARTER: u32 = 480;

/// Beat-relative note lengths, named the way loop intervals usually are
/// ("4n", "8n", …).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl NoteValue {
    pub fn ticks(self) -> u32 {
        let q = TICKS_PER_QUARTER;
        match self {
            NoteValue::Whole     => q * 4,
            NoteValue::Half      => q * 2,
            NoteValue::Quarter   => q,
            NoteValue::Eighth    => q / 2,
            NoteValue::Sixteenth => q / 4,
        }
    }

    /// Wall-clock length at `bpm`.
    pub fn duration_at(self, bpm: u32) -> Duration {
        ticks_to_duration(self.ticks(), bpm)
    }
}

/// Convert ticks to wall-clock time at `bpm` (a quarter note per beat).
pub fn ticks_to_duration(ticks: u32, bpm: u32) -> Duration {
    // µs = ticks * (60_000_000 / bpm) / tpq
    let micros_per_beat = 60_000_000u64 / bpm.max(1) as u64;
    Duration::from_micros(ticks as u64 * micros_per_beat / TICKS_PER_QUARTER as u64)
}

/// Length of one beat at `bpm`.
pub fn beat_duration(bpm: u32) -> Duration {
    NoteValue::Quarter.duration_at(bpm)
}

// ════════════════════════════════════════════════════════════════════════════
// General MIDI bits
// ════════════════════════════════════════════════════════════════════════════

/// Channel 10 (0-based 9) is reserved for percussion in General MIDI.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// GM percussion key for a hand clap.
pub const GM_HAND_CLAP: u8 = 39;

/// A few General MIDI melodic programs that suit a soft synth loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralMidi {
    AcousticGrandPiano = 0,
    ElectricPiano1     = 4,
    Vibraphone         = 11,
    Marimba            = 12,
    Kalimba            = 108,
    Pad2Warm           = 89,
}

impl GeneralMidi {
    /// Raw MIDI program number (0–127).
    pub fn program(self) -> u8 { self as u8 }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiMessage — channel voice messages
// ════════════════════════════════════════════════════════════════════════════

/// The channel messages a live loop sends.  Channels are 0-based and masked
/// to 0–15; data bytes are masked to 7 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn        { channel: u8, note: u8, velocity: u8 },
    NoteOff       { channel: u8, note: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// Controller 123: silence everything on the channel.
    AllNotesOff   { channel: u8 },
}

impl MidiMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } =>
                vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::ProgramChange { channel, program } =>
                vec![0xC0 | (channel & 0x0F), program & 0x7F],
            MidiMessage::AllNotesOff { channel } =>
                vec![0xB0 | (channel & 0x0F), 123, 0],
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
