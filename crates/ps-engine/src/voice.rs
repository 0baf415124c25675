//! Voice: one oscillator plus envelope playing one frame at a time.

use ps_ir::SeqFrame;

use crate::envelope::{Envelope, EnvelopePhase};
use crate::oscillator::{phase_increment, Waveform};

/// A single synthesis voice.
#[derive(Clone, Debug)]
pub struct Voice<W> {
    /// Shape read by the oscillator.
    pub waveform: W,
    /// Oscillator phase (full turn = 2^32).
    phase: u32,
    /// Phase step per sample; 0 for a pause.
    increment: u32,
    envelope: Envelope,
    /// The frame currently playing.
    frame: SeqFrame,
}

impl<W: Waveform> Voice<W> {
    /// Create an idle voice.
    pub fn new(waveform: W) -> Self {
        Self {
            waveform,
            phase: 0,
            increment: 0,
            envelope: Envelope::new(),
            frame: SeqFrame::default(),
        }
    }

    /// Start playing `frame` from the beginning of its envelope.
    pub fn load(&mut self, frame: &SeqFrame, sample_rate: u32) {
        self.frame = *frame;
        self.phase = 0;
        self.increment = phase_increment(frame.frequency, sample_rate);
        self.envelope.load(frame.duration_scale, frame.release_point, frame.volume);
    }

    /// Advance one sample and return the signed contribution (-127..=127).
    ///
    /// Pauses still advance the envelope so their duration elapses.
    #[inline]
    pub fn next(&mut self) -> i16 {
        let amplitude = self.envelope.advance() as i32;
        if self.increment == 0 {
            return 0;
        }
        let level = self.waveform.level(self.phase) as i32;
        self.phase = self.phase.wrapping_add(self.increment);
        ((level * amplitude) >> 7) as i16
    }

    /// Has the envelope finished?
    pub fn is_done(&self) -> bool {
        self.envelope.is_done()
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.envelope.phase()
    }

    pub fn frame(&self) -> &SeqFrame {
        &self.frame
    }
}

impl<W: Waveform + Default> Default for Voice<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}
