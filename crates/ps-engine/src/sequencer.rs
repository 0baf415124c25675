//! Frame sequencer: feeds compiled channels into voices.
//!
//! Channel `i` plays on voice `i`. Whenever a voice is idle at the start
//! of a tick, the next frame of its channel is loaded, so consecutive
//! frames play back to back without gaps.

use heapless::Vec;
use ps_ir::{FrameMap, SeqFrame};

use crate::mixer::PolySynth;
use crate::oscillator::Waveform;

#[derive(Clone, Copy, Debug)]
struct Track<'a> {
    frames: &'a [SeqFrame],
    next: usize,
}

impl<'a> Track<'a> {
    fn is_exhausted(&self) -> bool {
        self.next >= self.frames.len()
    }
}

/// Cursor over up to `N` channels of frames.
#[derive(Clone, Debug)]
pub struct Sequencer<'a, const N: usize> {
    tracks: Vec<Track<'a>, N>,
    /// Samples produced so far.
    position: u64,
}

impl<'a, const N: usize> Sequencer<'a, N> {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            position: 0,
        }
    }

    /// Build a sequencer over every channel of `map`.
    ///
    /// Returns `None` if the map has more channels than voices.
    pub fn from_map(map: &'a FrameMap) -> Option<Self> {
        let mut seq = Self::new();
        for channel in map.channels() {
            seq.add_track(channel.as_slice()).ok()?;
        }
        Some(seq)
    }

    /// Append a channel; it plays on the next free voice index.
    pub fn add_track(&mut self, frames: &'a [SeqFrame]) -> Result<(), &'a [SeqFrame]> {
        self.tracks
            .push(Track { frames, next: 0 })
            .map_err(|track| track.frames)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Samples produced so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Load pending frames into idle voices, then mix one sample.
    pub fn tick<W: Waveform>(&mut self, synth: &mut PolySynth<W, N>) -> i8 {
        for (index, track) in self.tracks.iter_mut().enumerate() {
            if !synth.is_enabled(index) && !track.is_exhausted() {
                synth.load(index, &track.frames[track.next]);
                track.next += 1;
            }
        }
        self.position += 1;
        synth.next_sample()
    }

    /// Fill `out` until it is full or playback ends; returns the number
    /// of samples written.
    pub fn render<W: Waveform>(&mut self, synth: &mut PolySynth<W, N>, out: &mut [i8]) -> usize {
        #[cfg(feature = "alloc_check")]
        return assert_no_alloc::assert_no_alloc(|| self.render_block(synth, out));
        #[cfg(not(feature = "alloc_check"))]
        self.render_block(synth, out)
    }

    fn render_block<W: Waveform>(&mut self, synth: &mut PolySynth<W, N>, out: &mut [i8]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            if self.is_finished(synth) {
                break;
            }
            *slot = self.tick(synth);
            written += 1;
        }
        written
    }

    /// All frames consumed and every voice has finished.
    pub fn is_finished<W: Waveform>(&self, synth: &PolySynth<W, N>) -> bool {
        self.tracks.iter().all(Track::is_exhausted) && synth.enabled_mask() == 0
    }
}

impl<const N: usize> Default for Sequencer<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}
