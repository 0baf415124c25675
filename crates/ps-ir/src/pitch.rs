//! Note-to-frequency mapping.
//!
//! Note codes count semitones from C at octave 0. Code 33 is A at
//! octave 2 (A4 in scientific pitch), the 440 Hz anchor. Letter notes are
//! turned into a code first, so both notations share a single formula.

/// Highest note code accepted by the `n` command.
pub const MAX_NOTE_CODE: u8 = 84;

/// Note code of the 440 Hz anchor.
pub const REFERENCE_NOTE_CODE: u8 = 33;

/// Frequency of the anchor note, in Hz.
pub const REFERENCE_FREQUENCY: f64 = 440.0;

/// Highest octave reachable by stepping with `>`.
pub const MAX_OCTAVE: u8 = 9;

/// Diatonic note letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Parse a lowercase note letter.
    pub fn from_ascii(c: u8) -> Option<Self> {
        match c {
            b'c' => Some(Self::C),
            b'd' => Some(Self::D),
            b'e' => Some(Self::E),
            b'f' => Some(Self::F),
            b'g' => Some(Self::G),
            b'a' => Some(Self::A),
            b'b' => Some(Self::B),
            _ => None,
        }
    }

    /// Semitones above C.
    pub const fn semitone(self) -> u8 {
        match self {
            Self::C => 0,
            Self::D => 2,
            Self::E => 4,
            Self::F => 5,
            Self::G => 7,
            Self::A => 9,
            Self::B => 11,
        }
    }
}

/// Pitch alteration of a letter note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    /// Parse `+`/`#` (sharp) or `-` (flat).
    pub fn from_ascii(c: u8) -> Option<Self> {
        match c {
            b'+' | b'#' => Some(Self::Sharp),
            b'-' => Some(Self::Flat),
            _ => None,
        }
    }

    /// Whether this accidental may be applied to `letter`.
    ///
    /// E and B have no sharp, C and F have no flat.
    pub fn applies_to(self, letter: Letter) -> bool {
        match self {
            Self::Natural => true,
            Self::Sharp => !matches!(letter, Letter::E | Letter::B),
            Self::Flat => !matches!(letter, Letter::C | Letter::F),
        }
    }
}

/// Note code of a letter at an octave.
///
/// Callers must check [`Accidental::applies_to`] first; a flat C is not
/// representable and saturates to the natural C.
pub fn note_code(letter: Letter, accidental: Accidental, octave: u8) -> u8 {
    let semitone = match accidental {
        Accidental::Natural => letter.semitone(),
        Accidental::Sharp => letter.semitone() + 1,
        Accidental::Flat => letter.semitone().saturating_sub(1),
    };
    semitone + octave * 12
}

/// Frequency in Hz of a note code, truncated to an integer.
pub fn frequency_from_code(code: u8) -> u16 {
    let exponent = (code as f64 - REFERENCE_NOTE_CODE as f64) / 12.0;
    (REFERENCE_FREQUENCY * libm::pow(2.0, exponent)) as u16
}

/// Frequency in Hz of a letter note.
pub fn frequency_from_note(letter: Letter, accidental: Accidental, octave: u8) -> u16 {
    frequency_from_code(note_code(letter, accidental, octave))
}
