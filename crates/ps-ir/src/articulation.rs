//! Articulation presets.

use crate::frame::TIME_UNIT;

/// How much of a note sounds before the envelope releases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Articulation {
    /// Full duration.
    Legato,
    /// Seven eighths.
    #[default]
    Normal,
    /// Two and a half quarters.
    Staccato,
}

impl Articulation {
    /// Parse the selector letter used after `m` (`l`, `n`, `s`).
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'l' => Some(Self::Legato),
            b'n' => Some(Self::Normal),
            b's' => Some(Self::Staccato),
            _ => None,
        }
    }

    /// Sounded fraction of the duration.
    pub fn ratio(self) -> f64 {
        match self {
            Self::Legato => 1.0,
            Self::Normal => 7.0 / 8.0,
            Self::Staccato => 2.5 / 4.0,
        }
    }

    /// Envelope step at which release begins.
    pub fn release_point(self) -> u8 {
        let steps = libm::round(TIME_UNIT as f64 * self.ratio()) as u32;
        steps.saturating_sub(1).min(TIME_UNIT - 1) as u8
    }
}
