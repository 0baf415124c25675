//! Integer ADSR envelope driven by a frame's duration.
//!
//! A frame is split into `TIME_UNIT` steps of `duration_scale` samples.
//! Step 0 is the attack, step 1 the decay, the envelope then sustains until
//! the release step and ramps to zero over the remaining steps.

use ps_ir::TIME_UNIT;

/// Envelope phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopePhase {
    Attack,
    Decay,
    Sustain,
    Release,
    /// Terminal; the voice produces nothing more.
    #[default]
    Done,
}

/// Runtime envelope state for one voice.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    phase: EnvelopePhase,
    /// Current step (0..TIME_UNIT).
    step: u32,
    /// Samples elapsed within the current step.
    counter: u32,
    /// Samples per step.
    step_len: u32,
    release_point: u32,
    peak: u32,
    sustain: u32,
    /// Amplitude produced by the last advance.
    level: u32,
    /// Level the release ramp starts from.
    release_from: u32,
    release_elapsed: u32,
    release_len: u32,
}

impl Envelope {
    /// Create an envelope that is already done.
    pub const fn new() -> Self {
        Self {
            phase: EnvelopePhase::Done,
            step: 0,
            counter: 0,
            step_len: 0,
            release_point: 0,
            peak: 0,
            sustain: 0,
            level: 0,
            release_from: 0,
            release_elapsed: 0,
            release_len: 0,
        }
    }

    /// Restart from the attack phase.
    ///
    /// `duration_scale` must be at least 1 and `release_point` below
    /// `TIME_UNIT`; `peak` is the frame volume (0-128).
    pub fn load(&mut self, duration_scale: u32, release_point: u8, peak: u8) {
        let peak = peak as u32;
        *self = Self {
            phase: EnvelopePhase::Attack,
            step: 0,
            counter: 0,
            step_len: duration_scale.max(1),
            release_point: release_point as u32,
            peak,
            sustain: peak - peak / 4,
            level: 0,
            release_from: 0,
            release_elapsed: 0,
            release_len: 0,
        };
        self.enter_step();
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == EnvelopePhase::Done
    }

    /// Amplitude of the last advanced sample.
    pub fn level(&self) -> u8 {
        self.level as u8
    }

    /// Produce the amplitude for one sample (0-128) and move forward.
    pub fn advance(&mut self) -> u8 {
        let level = match self.phase {
            EnvelopePhase::Attack => self.peak * (self.counter + 1) / self.step_len,
            EnvelopePhase::Decay => {
                let drop = self.peak - self.sustain;
                self.peak - drop * (self.counter + 1) / self.step_len
            }
            EnvelopePhase::Sustain => self.sustain,
            EnvelopePhase::Release => {
                let left = self.release_len - self.release_elapsed;
                self.release_elapsed += 1;
                self.release_from * left / self.release_len
            }
            EnvelopePhase::Done => return 0,
        };
        self.level = level;

        self.counter += 1;
        if self.counter >= self.step_len {
            self.counter = 0;
            self.step += 1;
            self.enter_step();
        }
        level as u8
    }

    /// Pick the phase for the current step.
    fn enter_step(&mut self) {
        if self.step >= TIME_UNIT {
            self.phase = EnvelopePhase::Done;
            return;
        }
        if self.step >= self.release_point {
            if self.phase != EnvelopePhase::Release {
                self.release_from = self.level;
                self.release_elapsed = 0;
                self.release_len = (TIME_UNIT - self.step) * self.step_len;
                self.phase = EnvelopePhase::Release;
            }
            return;
        }
        self.phase = match self.step {
            0 => EnvelopePhase::Attack,
            1 => EnvelopePhase::Decay,
            _ => EnvelopePhase::Sustain,
        };
    }
}
