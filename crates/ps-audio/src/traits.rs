//! Audio output trait and error types.

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// Sink for signed 8-bit mono mixer output.
pub trait AudioOutput {
    /// Rate the device consumes samples at.
    fn sample_rate(&self) -> u32;

    /// Queue samples without blocking; returns how many were accepted.
    fn write(&mut self, samples: &[i8]) -> usize;

    /// Samples written but not yet handed to the device.
    fn queued(&self) -> usize;

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
