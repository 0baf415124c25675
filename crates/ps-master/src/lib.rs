//! Headless controller for polysynth.
//!
//! Provides a unified API for loading MML songs, real-time playback and
//! offline rendering that the CLI (and any other front end) can share.

mod render;

use ps_audio::{AudioOutput, CpalOutput};
use ps_engine::{PolySynth, Sequencer};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// Re-export common types so callers don't need the lower crates directly.
pub use ps_audio::AudioError;
pub use ps_engine::{Shape, MAX_VOICES};
pub use ps_formats::{samples_to_wav, FormatError};
pub use ps_ir::{ChannelStats, FrameMap, SeqFrame};
pub use ps_mml::{Compiled, ErrorKind, ParseError};

pub use render::Rendered;

/// Voices available for playback; one per channel.
pub const VOICES: usize = MAX_VOICES;

/// Rate used to validate songs on load.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Samples rendered per block on the playback thread.
const BLOCK_LEN: usize = 256;

/// Error type for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum MasterError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("song uses {channels} channels but only {voices} voices exist")]
    TooManyChannels { channels: usize, voices: usize },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where playback currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub samples: u64,
    pub sample_rate: u32,
}

impl PlaybackPosition {
    pub fn seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }
}

/// Headless synth controller: owns a song and manages playback.
pub struct Controller {
    source: String,
    waveform: Shape,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    samples: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new() -> Self {
        Self {
            source: String::new(),
            waveform: Shape::default(),
            playback: None,
        }
    }

    // --- Song management ---

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn waveform(&self) -> Shape {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Shape) {
        self.waveform = waveform;
    }

    /// Replace the song. The text is compiled once up front so a broken
    /// song is rejected here rather than on the audio thread.
    pub fn load_mml(&mut self, text: &str) -> Result<(), MasterError> {
        self.stop();
        let compiled = compile_checked(text, DEFAULT_SAMPLE_RATE)?;
        tracing::info!(
            channels = compiled.map.channel_count(),
            frames = compiled.map.frame_count(),
            "loaded song"
        );
        self.source = text.to_owned();
        Ok(())
    }

    /// Compile the current song for `sample_rate`.
    pub fn compile(&self, sample_rate: u32) -> Result<Compiled, MasterError> {
        compile_checked(&self.source, sample_rate)
    }

    /// Serialize the song's frames as compiled for `sample_rate`.
    pub fn encode_frames(&self, sample_rate: u32) -> Result<Vec<u8>, MasterError> {
        let compiled = self.compile(sample_rate)?;
        Ok(ps_formats::encode_frame_map(&compiled.map)?)
    }

    // --- Real-time playback ---

    /// Start playing on the default output device.
    ///
    /// Blocks until the playback thread has opened the device and compiled
    /// the song at the device's rate, and returns that rate. Startup
    /// failures are reported here instead of leaving a silent thread.
    pub fn play(&mut self) -> Result<u32, MasterError> {
        self.spawn_playback(open_device)
    }

    fn spawn_playback<O, F>(&mut self, open: F) -> Result<u32, MasterError>
    where
        O: AudioOutput,
        F: FnOnce() -> Result<O, AudioError> + Send + 'static,
    {
        self.stop();

        let source = self.source.clone();
        let waveform = self.waveform;
        let stop_signal = Arc::new(AtomicBool::new(false));
        let samples = Arc::new(AtomicU64::new(0));
        let sample_rate = Arc::new(AtomicU32::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let shared = Shared {
            stop_signal: stop_signal.clone(),
            samples: samples.clone(),
            sample_rate: sample_rate.clone(),
            finished: finished.clone(),
        };
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread = std::thread::spawn(move || {
            match open() {
                Ok(mut output) => stream_song(&mut output, &source, waveform, &shared, &ready_tx),
                Err(err) => {
                    tracing::warn!(%err, "audio output unavailable");
                    let _ = ready_tx.send(Err(err.into()));
                }
            }
            shared.finished.store(true, Ordering::Relaxed);
        });

        let started = ready_rx.recv().unwrap_or_else(|_| {
            Err(MasterError::Audio(AudioError::Playback(
                "playback thread exited before starting".into(),
            )))
        });
        self.playback = Some(PlaybackHandle {
            stop_signal,
            samples,
            sample_rate,
            finished,
            thread: Some(thread),
        });
        if started.is_err() {
            self.stop();
        }
        started
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                if handle.join().is_err() {
                    tracing::warn!("playback thread panicked");
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    pub fn position(&self) -> Option<PlaybackPosition> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        Some(PlaybackPosition {
            samples: pb.samples.load(Ordering::Relaxed),
            sample_rate: pb.sample_rate.load(Ordering::Relaxed),
        })
    }

    // --- Offline rendering ---

    /// Render at most `max_samples` samples of the song.
    pub fn render_samples(&self, sample_rate: u32, max_samples: usize) -> Result<Rendered, MasterError> {
        let compiled = self.compile(sample_rate)?;
        Ok(render::render(&compiled.map, sample_rate, self.waveform, max_samples))
    }

    /// Render to an 8-bit mono WAV file image.
    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: u32) -> Result<Vec<u8>, MasterError> {
        let max_samples = sample_rate as usize * max_seconds as usize;
        let rendered = self.render_samples(sample_rate, max_samples)?;
        Ok(ps_formats::samples_to_wav(&rendered.samples, sample_rate)?)
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn compile_checked(text: &str, sample_rate: u32) -> Result<Compiled, MasterError> {
    let compiled = ps_mml::compile(text, sample_rate)?;
    let channels = compiled.map.channel_count();
    if channels > VOICES {
        return Err(MasterError::TooManyChannels {
            channels,
            voices: VOICES,
        });
    }
    Ok(compiled)
}

/// State the playback thread reports through.
struct Shared {
    stop_signal: Arc<AtomicBool>,
    samples: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
}

fn open_device() -> Result<CpalOutput, AudioError> {
    let (mut output, consumer) = CpalOutput::new()?;
    output.build_stream(consumer)?;
    Ok(output)
}

/// Compile the song at the output's rate and feed it block by block.
///
/// The outcome of startup goes to `ready` before the first block is
/// written; nothing is sent after that.
fn stream_song<O: AudioOutput>(
    output: &mut O,
    source: &str,
    waveform: Shape,
    shared: &Shared,
    ready: &SyncSender<Result<u32, MasterError>>,
) {
    let sample_rate = output.sample_rate();
    shared.sample_rate.store(sample_rate, Ordering::Relaxed);

    let compiled = match compile_checked(source, sample_rate) {
        Ok(compiled) => compiled,
        Err(err) => {
            tracing::warn!(%err, sample_rate, "song does not compile at device rate");
            let _ = ready.send(Err(err));
            return;
        }
    };
    let Some(mut seq) = Sequencer::<VOICES>::from_map(&compiled.map) else {
        let _ = ready.send(Err(MasterError::TooManyChannels {
            channels: compiled.map.channel_count(),
            voices: VOICES,
        }));
        return;
    };
    let mut synth: PolySynth<Shape, VOICES> = PolySynth::new(sample_rate, waveform);

    if let Err(err) = output.start() {
        tracing::warn!(%err, "could not start stream");
        let _ = ready.send(Err(err.into()));
        return;
    }
    tracing::info!(sample_rate, "playback started");
    let _ = ready.send(Ok(sample_rate));

    let stopped = || shared.stop_signal.load(Ordering::Relaxed);
    let mut block = [0i8; BLOCK_LEN];
    'song: while !stopped() {
        let n = seq.render(&mut synth, &mut block);
        if n == 0 {
            break;
        }
        let mut pending = &block[..n];
        while !pending.is_empty() {
            if stopped() {
                break 'song;
            }
            let accepted = output.write(pending);
            if accepted == 0 {
                std::hint::spin_loop();
            }
            pending = &pending[accepted..];
        }
        shared.samples.store(seq.position(), Ordering::Relaxed);
    }

    // Let the tail drain before the stream is dropped
    while output.queued() > 0 && !stopped() {
        std::thread::sleep(Duration::from_millis(1));
    }
    if let Err(err) = output.stop() {
        tracing::warn!(%err, "could not stop stream");
    }
    if synth.clip_count() > 0 {
        tracing::warn!(clipped = synth.clip_count(), "mix clipped");
    }
    tracing::info!(samples = seq.position(), "playback finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct Sink {
        samples: Vec<i8>,
        started: bool,
        backlog_at_stop: Option<usize>,
    }

    /// Device stand-in that takes at most `chunk` samples per write and
    /// plays back `chunk` samples each time it is polled.
    struct FakeOutput {
        rate: u32,
        chunk: usize,
        backlog: Cell<usize>,
        sink: Arc<Mutex<Sink>>,
    }

    impl FakeOutput {
        fn opener(rate: u32, chunk: usize, sink: &Arc<Mutex<Sink>>) -> impl FnOnce() -> Result<Self, AudioError> + Send + 'static {
            let sink = sink.clone();
            move || {
                Ok(Self {
                    rate,
                    chunk,
                    backlog: Cell::new(0),
                    sink,
                })
            }
        }
    }

    impl AudioOutput for FakeOutput {
        fn sample_rate(&self) -> u32 {
            self.rate
        }

        fn write(&mut self, samples: &[i8]) -> usize {
            let n = samples.len().min(self.chunk);
            self.sink.lock().unwrap().samples.extend_from_slice(&samples[..n]);
            self.backlog.set(self.backlog.get() + n);
            n
        }

        fn queued(&self) -> usize {
            let queued = self.backlog.get();
            self.backlog.set(queued.saturating_sub(self.chunk));
            queued
        }

        fn start(&mut self) -> Result<(), AudioError> {
            self.sink.lock().unwrap().started = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AudioError> {
            self.sink.lock().unwrap().backlog_at_stop = Some(self.backlog.get());
            Ok(())
        }
    }

    fn wait_finished(ctl: &Controller) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !ctl.is_finished() {
            assert!(Instant::now() < deadline, "playback never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn playback_streams_the_song_through_write() {
        let mut ctl = Controller::new();
        ctl.load_mml("A t120 l4 c e\nB t120 l2 o3 g").unwrap();
        let sink = Arc::new(Mutex::new(Sink::default()));

        // 100 does not divide the block length, so writes come back short
        let rate = ctl.spawn_playback(FakeOutput::opener(16_000, 100, &sink)).unwrap();
        assert_eq!(rate, 16_000);
        wait_finished(&ctl);
        ctl.stop();

        let sink = sink.lock().unwrap();
        assert!(sink.started);
        assert_eq!(sink.backlog_at_stop, Some(0));
        let expected = ctl.render_samples(16_000, usize::MAX).unwrap();
        assert_eq!(sink.samples.len(), 16_000);
        assert_eq!(sink.samples, expected.samples);
    }

    #[test]
    fn play_reports_song_that_overflows_at_device_rate() {
        let mut ctl = Controller::new();
        // 60000 units at 16 kHz, 180000 at 48 kHz
        ctl.load_mml("t2 l1 c").unwrap();
        let sink = Arc::new(Mutex::new(Sink::default()));

        let err = ctl
            .spawn_playback(FakeOutput::opener(48_000, 256, &sink))
            .unwrap_err();
        match err {
            MasterError::Parse(e) => assert_eq!(e.kind, ErrorKind::DurationOverflow),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(!ctl.is_playing());
        assert!(ctl.position().is_none());
        let sink = sink.lock().unwrap();
        assert!(!sink.started);
        assert!(sink.samples.is_empty());
    }

    #[test]
    fn play_reports_missing_device() {
        let mut ctl = Controller::new();
        ctl.load_mml("c").unwrap();
        let err = ctl
            .spawn_playback(|| Err::<FakeOutput, _>(AudioError::NoDevice))
            .unwrap_err();
        assert!(matches!(err, MasterError::Audio(AudioError::NoDevice)));
        assert!(!ctl.is_playing());
    }

    #[test]
    fn stop_interrupts_a_full_device() {
        let mut ctl = Controller::new();
        ctl.load_mml("t60 l1 c").unwrap();
        let sink = Arc::new(Mutex::new(Sink::default()));

        // a chunk of 0 never accepts anything
        ctl.spawn_playback(FakeOutput::opener(16_000, 0, &sink)).unwrap();
        assert!(ctl.is_playing());
        ctl.stop();
        assert!(!ctl.is_playing());
        let sink = sink.lock().unwrap();
        assert!(sink.samples.is_empty());
        assert_eq!(sink.backlog_at_stop, Some(0));
    }

    #[test]
    fn load_rejects_broken_song() {
        let mut ctl = Controller::new();
        let err = ctl.load_mml("cde\nv300").unwrap_err();
        match err {
            MasterError::Parse(e) => {
                assert_eq!(e.kind, ErrorKind::InvalidVolume);
                assert_eq!(e.line, 2);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert_eq!(ctl.source(), "");
    }

    #[test]
    fn load_rejects_more_channels_than_voices() {
        let mut ctl = Controller::new();
        // Q is the 17th channel
        let err = ctl.load_mml("Q c").unwrap_err();
        assert!(matches!(
            err,
            MasterError::TooManyChannels { channels: 17, voices: 16 }
        ));
        assert!(ctl.load_mml("P c").is_ok());
    }

    #[test]
    fn compile_uses_requested_rate() {
        let mut ctl = Controller::new();
        ctl.load_mml("c").unwrap();
        let slow = ctl.compile(8_000).unwrap();
        let fast = ctl.compile(32_000).unwrap();
        let d = |c: &Compiled| c.map.channel(0).unwrap().as_slice()[0].duration_scale;
        assert_eq!(d(&fast), 4 * d(&slow));
    }

    #[test]
    fn encoded_frames_decode_to_compiled_map() {
        let mut ctl = Controller::new();
        ctl.load_mml("A cde\nB o3 g&g").unwrap();
        let bytes = ctl.encode_frames(DEFAULT_SAMPLE_RATE).unwrap();
        let map = ps_formats::decode_frame_map(&bytes).unwrap();
        assert_eq!(map, ctl.compile(DEFAULT_SAMPLE_RATE).unwrap().map);
    }

    #[test]
    fn render_to_wav_is_sized_by_the_song() {
        let mut ctl = Controller::new();
        ctl.load_mml("t120 l4 c").unwrap();
        let wav = ctl.render_to_wav(DEFAULT_SAMPLE_RATE, 10).unwrap();
        // quarter at 120 is half a second
        assert_eq!(wav.len(), 44 + DEFAULT_SAMPLE_RATE as usize / 2);
    }

    #[test]
    fn render_to_wav_respects_max_seconds() {
        let mut ctl = Controller::new();
        ctl.load_mml("t60 l1 c").unwrap();
        let wav = ctl.render_to_wav(8_000, 1).unwrap();
        assert_eq!(wav.len(), 44 + 8_000);
    }

    #[test]
    fn idle_controller_reports_nothing() {
        let ctl = Controller::new();
        assert!(!ctl.is_playing());
        assert!(!ctl.is_finished());
        assert!(ctl.position().is_none());
    }

    #[test]
    fn position_in_seconds() {
        let pos = PlaybackPosition {
            samples: 24_000,
            sample_rate: 16_000,
        };
        assert!((pos.seconds() - 1.5).abs() < 1e-12);
    }
}
