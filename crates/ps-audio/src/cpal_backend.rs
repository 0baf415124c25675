//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output.
///
/// Every mono sample is copied to all device channels.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<i8>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Create a new CPAL output with default device.
    pub fn new() -> Result<(Self, HeapCons<i8>), AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .into();

        // About 100ms of samples
        let rb = HeapRb::<i8>::new((config.sample_rate.0 as usize / 10).max(256));
        let (producer, consumer) = rb.split();

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "opened audio device"
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            running: Arc::new(AtomicBool::new(false)),
        };
        Ok((output, consumer))
    }

    /// Build and start the audio stream.
    pub fn build_stream(&mut self, mut consumer: HeapCons<i8>) -> Result<(), AudioError> {
        let running = self.running.clone();
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    for chunk in data.chunks_mut(channels) {
                        let value = consumer.try_pop().map_or(0.0, to_f32);
                        chunk.fill(value);
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, samples: &[i8]) -> usize {
        self.producer.push_slice(samples)
    }

    fn queued(&self) -> usize {
        self.producer.occupied_len()
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}

fn to_f32(sample: i8) -> f32 {
    sample as f32 / 128.0
}
