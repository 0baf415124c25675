//! Sequencer frame: one note or pause on one channel.

/// Samples per time unit. Also the number of envelope steps a frame is
/// divided into, so each step lasts `duration_scale` samples.
pub const TIME_UNIT: u32 = 32;

/// Largest duration a frame can hold, in time units.
///
/// Persisted frames store `duration_scale - 1` in 16 bits.
pub const MAX_DURATION_SCALE: u32 = u16::MAX as u32 + 1;

/// Full-scale frame volume.
pub const MAX_VOLUME: u8 = 128;

/// Volume a fresh channel starts with.
pub const DEFAULT_VOLUME: u8 = 63;

/// A compiled note or pause.
///
/// Invariants: `1 <= duration_scale <= MAX_DURATION_SCALE`,
/// `release_point < TIME_UNIT`, `volume <= MAX_VOLUME`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeqFrame {
    /// Pitch in Hz, 0 for a pause.
    pub frequency: u16,
    /// Linear peak amplitude (0-128).
    pub volume: u8,
    /// Length in time units.
    pub duration_scale: u32,
    /// Envelope step at which release begins.
    pub release_point: u8,
}

impl SeqFrame {
    /// Create a sounding note.
    pub const fn note(frequency: u16, volume: u8, duration_scale: u32, release_point: u8) -> Self {
        Self {
            frequency,
            volume,
            duration_scale,
            release_point,
        }
    }

    /// Create a pause of the given length.
    pub const fn pause(duration_scale: u32, release_point: u8) -> Self {
        Self {
            frequency: 0,
            volume: 0,
            duration_scale,
            release_point,
        }
    }

    /// Is this frame silent?
    pub const fn is_pause(&self) -> bool {
        self.frequency == 0
    }

    /// Length of the frame in audio samples.
    pub const fn samples(&self) -> u64 {
        self.duration_scale as u64 * TIME_UNIT as u64
    }

    /// Check the frame invariants.
    pub const fn is_valid(&self) -> bool {
        self.duration_scale >= 1
            && self.duration_scale <= MAX_DURATION_SCALE
            && (self.release_point as u32) < TIME_UNIT
            && self.volume <= MAX_VOLUME
    }
}
