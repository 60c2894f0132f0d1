//! The fixed eight-note pentatonic scale the note loop plays from.

use std::fmt;

/// Notes in the loop's scale.
pub const NUM_NOTES: usize = 8;

/// One of the eight symbolic pitches, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pitch {
    C3,
    D3,
    E3,
    G3,
    A3,
    C4,
    D4,
    E4,
}

impl Pitch {
    /// C major pentatonic over an octave and a third.
    pub const PENTATONIC: [Pitch; NUM_NOTES] = [
        Pitch::C3, Pitch::D3, Pitch::E3, Pitch::G3,
        Pitch::A3, Pitch::C4, Pitch::D4, Pitch::E4,
    ];

    /// Position in the scale (0 = C3).
    pub fn index(self) -> usize { self as usize }

    /// Pitch at `index`, clamped to the top of the scale.
    pub fn from_index(index: usize) -> Pitch {
        Pitch::PENTATONIC[index.min(NUM_NOTES - 1)]
    }

    pub fn name(self) -> &'static str {
        match self {
            Pitch::C3 => "C3",
            Pitch::D3 => "D3",
            Pitch::E3 => "E3",
            Pitch::G3 => "G3",
            Pitch::A3 => "A3",
            Pitch::C4 => "C4",
            Pitch::D4 => "D4",
            Pitch::E4 => "E4",
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
