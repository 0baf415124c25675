//! Per-channel tuning state used while compiling.

use ps_ir::{Articulation, ChannelStats, DEFAULT_VOLUME, TIME_UNIT};

pub(crate) const DEFAULT_OCTAVE: u8 = 4;
pub(crate) const DEFAULT_LENGTH: u32 = 4;
pub(crate) const DEFAULT_TEMPO: u32 = 120;

#[derive(Clone, Debug)]
pub(crate) struct ChannelState {
    pub octave: u8,
    /// Default note length as a fraction of a whole note (4 = quarter).
    pub length: u32,
    pub dots: u32,
    /// Quarter notes per minute.
    pub tempo: u32,
    pub volume: u8,
    pub articulation: Articulation,
    /// Commands on the current line apply to this channel.
    pub active: bool,
    /// The next note extends the previous frame.
    pub pending_tie: bool,
    /// Ideal elapsed time.
    seconds: f64,
    /// Time units already emitted.
    time_units: u64,
}

impl ChannelState {
    pub fn new() -> Self {
        Self {
            octave: DEFAULT_OCTAVE,
            length: DEFAULT_LENGTH,
            dots: 0,
            tempo: DEFAULT_TEMPO,
            volume: DEFAULT_VOLUME,
            articulation: Articulation::Normal,
            active: false,
            pending_tie: false,
            seconds: 0.0,
            time_units: 0,
        }
    }

    /// Advance the running time by one note and return its length in
    /// time units.
    ///
    /// Each note gets the difference between the rounded ideal total and
    /// what was already emitted, so rounding never accumulates.
    pub fn advance(&mut self, length: u32, dots: u32, sample_rate: u32) -> u64 {
        let mut effective = length as f64;
        for _ in 0..dots {
            effective /= 1.5;
        }
        self.seconds += 240.0 / self.tempo as f64 / effective;

        let ideal = (self.seconds * sample_rate as f64 / TIME_UNIT as f64).round() as u64;
        let units = ideal.saturating_sub(self.time_units);
        self.time_units += units;
        units
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn time_units(&self) -> u64 {
        self.time_units
    }

    pub fn stats(&self, channel: usize) -> ChannelStats {
        ChannelStats {
            channel,
            seconds: self.seconds,
            time_units: self.time_units,
        }
    }
}
