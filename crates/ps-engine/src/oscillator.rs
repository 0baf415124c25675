//! Oscillator waveforms.
//!
//! Phase is a full-turn `u32` accumulator: 0 is the start of a cycle and
//! the value wraps once per period. A waveform maps a phase to a signed
//! level in -127..=127, so a voice at full volume never exceeds the
//! output range on its own.

/// A waveform shape the voice engine reads from.
pub trait Waveform {
    /// Signed level at `phase`, in -127..=127.
    fn level(&self, phase: u32) -> i8;
}

/// Built-in integer waveforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Shape {
    #[default]
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform for Shape {
    #[inline]
    fn level(&self, phase: u32) -> i8 {
        match self {
            Shape::Square => {
                if phase < 0x8000_0000 {
                    127
                } else {
                    -127
                }
            }
            Shape::Sawtooth => ((phase >> 24) as i32 - 128).max(-127) as i8,
            Shape::Triangle => {
                // 0..512 over one cycle: rise for the first half, fall for the second
                let p = (phase >> 23) as i32;
                let v = if p < 256 { p - 128 } else { 383 - p };
                v.max(-127) as i8
            }
        }
    }
}

/// A 256-entry lookup table indexed by the top phase byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Wavetable {
    table: &'static [i8; 256],
}

impl Wavetable {
    pub const fn new(table: &'static [i8; 256]) -> Self {
        Self { table }
    }
}

impl Waveform for Wavetable {
    #[inline]
    fn level(&self, phase: u32) -> i8 {
        self.table[(phase >> 24) as usize].max(-127)
    }
}

/// Per-sample phase step for `frequency` Hz at `sample_rate`.
///
/// Returns 0 for a pause or a zero sample rate. Frequencies above the
/// sample rate wrap, which is what the phase accumulator would do anyway.
pub fn phase_increment(frequency: u16, sample_rate: u32) -> u32 {
    if frequency == 0 || sample_rate == 0 {
        return 0;
    }
    (((frequency as u64) << 32) / sample_rate as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 16_000;

    #[test]
    fn square_is_symmetric() {
        assert_eq!(Shape::Square.level(0), 127);
        assert_eq!(Shape::Square.level(0x7FFF_FFFF), 127);
        assert_eq!(Shape::Square.level(0x8000_0000), -127);
        assert_eq!(Shape::Square.level(u32::MAX), -127);
    }

    #[test]
    fn sawtooth_rises_over_the_cycle() {
        assert_eq!(Shape::Sawtooth.level(0), -127);
        assert_eq!(Shape::Sawtooth.level(0x8000_0000), 0);
        assert_eq!(Shape::Sawtooth.level(u32::MAX), 127);
    }

    #[test]
    fn triangle_peaks_mid_cycle() {
        assert_eq!(Shape::Triangle.level(0), -127);
        assert_eq!(Shape::Triangle.level(0x7FFF_FFFF), 127);
        assert_eq!(Shape::Triangle.level(u32::MAX), -127);
    }

    #[test]
    fn shapes_stay_in_range() {
        for shape in [Shape::Square, Shape::Sawtooth, Shape::Triangle] {
            for i in 0..=255u32 {
                let l = shape.level(i << 24 | 0x00FF_FFFF);
                assert!((-127..=127).contains(&l));
            }
        }
    }

    #[test]
    fn wavetable_reads_top_byte() {
        static TABLE: [i8; 256] = {
            let mut t = [0i8; 256];
            t[1] = 50;
            t[255] = -128;
            t
        };
        let wt = Wavetable::new(&TABLE);
        assert_eq!(wt.level(0x0100_0000), 50);
        assert_eq!(wt.level(0x0000_FFFF), 0);
        // -128 is folded to keep contributions symmetric
        assert_eq!(wt.level(0xFF00_0000), -127);
    }

    #[test]
    fn increment_completes_one_cycle_per_period() {
        // 1000 Hz at 16 kHz: 16 samples per cycle
        let inc = phase_increment(1000, SAMPLE_RATE);
        let phase = (0..16).fold(0u32, |p, _| p.wrapping_add(inc));
        assert!(phase < inc || phase > u32::MAX - 16);
    }

    #[test]
    fn pause_has_no_increment() {
        assert_eq!(phase_increment(0, SAMPLE_RATE), 0);
        assert_eq!(phase_increment(440, 0), 0);
    }

    #[test]
    fn octave_doubles_increment() {
        let a = phase_increment(440, SAMPLE_RATE) as u64;
        let b = phase_increment(880, SAMPLE_RATE) as u64;
        assert!((b as i64 - 2 * a as i64).abs() <= 1);
    }
}
