//! Playback engine for polysynth.
//!
//! Turns sequencer frames into samples: each voice runs an envelope and
//! an oscillator, and the mixer sums the enabled voices into one signed
//! 8-bit sample per tick. The tick path is integer-only and never
//! allocates.

#![cfg_attr(not(feature = "std"), no_std)]

mod envelope;
mod mixer;
mod oscillator;
mod sequencer;
mod voice;

pub use envelope::{Envelope, EnvelopePhase};
pub use mixer::{PolySynth, VoiceMask, MAX_VOICES};
pub use oscillator::{phase_increment, Shape, Waveform, Wavetable};
pub use sequencer::Sequencer;
pub use voice::Voice;
