//! Polyphonic mixer.

use ps_ir::SeqFrame;

use crate::oscillator::Waveform;
use crate::voice::Voice;

/// Largest supported voice count (one bit per voice in the mask).
pub const MAX_VOICES: usize = 16;

/// Bit `i` set means voice `i` is summed on the next tick.
pub type VoiceMask = u16;

#[inline]
const fn bit(index: usize) -> VoiceMask {
    1 << index
}

/// Fixed bank of voices mixed into one signed 8-bit sample per tick.
///
/// Voice indexes are not range-checked beyond Rust's own bounds checks:
/// passing an index `>= N` is a caller bug and panics.
pub struct PolySynth<W, const N: usize> {
    voices: [Voice<W>; N],
    enable: VoiceMask,
    sample_rate: u32,
    /// Ticks whose sum had to be clamped.
    clip_count: u32,
}

impl<W: Waveform + Copy, const N: usize> PolySynth<W, N> {
    const VOICE_COUNT_OK: () = assert!(N > 0 && N <= MAX_VOICES, "voice count must be 1..=16");

    /// Create a synth with every voice idle and using `waveform`.
    pub fn new(sample_rate: u32, waveform: W) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VOICE_COUNT_OK;
        Self {
            voices: core::array::from_fn(|_| Voice::new(waveform)),
            enable: 0,
            sample_rate,
            clip_count: 0,
        }
    }
}

impl<W: Waveform, const N: usize> PolySynth<W, N> {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Load a frame into a voice and enable it.
    pub fn load(&mut self, index: usize, frame: &SeqFrame) {
        self.voices[index].load(frame, self.sample_rate);
        self.enable |= bit(index);
    }

    /// Enable a voice without reloading it.
    pub fn enable(&mut self, index: usize) {
        debug_assert!(index < N);
        self.enable |= bit(index);
    }

    /// Stop summing a voice. Idempotent.
    pub fn disable(&mut self, index: usize) {
        debug_assert!(index < N);
        self.enable &= !bit(index);
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.enable & bit(index) != 0
    }

    pub fn enabled_mask(&self) -> VoiceMask {
        self.enable
    }

    pub fn active_count(&self) -> u32 {
        self.enable.count_ones()
    }

    /// Number of ticks that clipped since creation.
    pub fn clip_count(&self) -> u32 {
        self.clip_count
    }

    pub fn voice(&self, index: usize) -> &Voice<W> {
        &self.voices[index]
    }

    pub fn voice_mut(&mut self, index: usize) -> &mut Voice<W> {
        &mut self.voices[index]
    }

    pub fn voice_count(&self) -> usize {
        N
    }

    /// Compute the next output sample.
    ///
    /// Voices are visited from the highest index down. A voice whose
    /// envelope finishes during this tick is disabled before returning.
    pub fn next_sample(&mut self) -> i8 {
        let mut sum: i16 = 0;
        for index in (0..N).rev() {
            let mask = bit(index);
            if self.enable & mask == 0 {
                continue;
            }
            let voice = &mut self.voices[index];
            sum += voice.next();
            if voice.is_done() {
                self.enable &= !mask;
            }
        }

        if sum > i8::MAX as i16 || sum < i8::MIN as i16 {
            self.clip_count = self.clip_count.saturating_add(1);
        }
        sum.clamp(i8::MIN as i16, i8::MAX as i16) as i8
    }
}
