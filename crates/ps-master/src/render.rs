//! Offline rendering.

use ps_engine::{PolySynth, Sequencer, Shape};
use ps_ir::FrameMap;

use crate::VOICES;

/// Output of an offline render.
#[derive(Clone, Debug, Default)]
pub struct Rendered {
    pub samples: Vec<i8>,
    /// Samples whose mix had to be clamped.
    pub clip_count: u32,
}

impl Rendered {
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }

    pub fn peak(&self) -> u8 {
        self.samples.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0)
    }
}

/// Play `map` from the start until it ends or `max_samples` is reached.
///
/// `map` must not have more channels than [`VOICES`].
pub(crate) fn render(map: &FrameMap, sample_rate: u32, waveform: Shape, max_samples: usize) -> Rendered {
    let Some(mut seq) = Sequencer::<VOICES>::from_map(map) else {
        return Rendered::default();
    };
    let mut synth: PolySynth<Shape, VOICES> = PolySynth::new(sample_rate, waveform);

    let total = map
        .channels()
        .iter()
        .map(|ch| ch.total_time_units() * ps_ir::TIME_UNIT as u64)
        .max()
        .unwrap_or(0);
    let mut samples = vec![0i8; total.min(max_samples as u64) as usize];
    let written = seq.render(&mut synth, &mut samples);
    samples.truncate(written);

    tracing::debug!(
        samples = written,
        clipped = synth.clip_count(),
        "rendered song"
    );
    Rendered {
        samples,
        clip_count: synth.clip_count(),
    }
}
