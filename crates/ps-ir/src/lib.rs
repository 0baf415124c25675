//! Core data types for polysynth.
//!
//! The note compiler emits sequencer frames grouped per channel, and the
//! voice engine consumes them one frame per voice. Everything here is
//! plain data so both sides can share it.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod articulation;
mod frame;
mod frame_map;
pub mod pitch;

pub use articulation::Articulation;
pub use frame::{SeqFrame, DEFAULT_VOLUME, MAX_DURATION_SCALE, MAX_VOLUME, TIME_UNIT};
pub use frame_map::{ChannelStats, FrameList, FrameMap, GrowError, MAX_CHANNELS};
pub use pitch::{Accidental, Letter, MAX_NOTE_CODE};
