//! polysynth CLI: compile an MML song, then play it or export it.
//!
//! Usage:
//!   ps-cli song.mml
//!   ps-cli song.mml --wav out.wav --sample-rate 22050
//!   ps-cli song.mml --frames song.psfm --stats

use clap::{crate_version, Parser, ValueEnum};
use ps_master::{samples_to_wav, Controller, MasterError, Shape};
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, process};

#[derive(Parser)]
#[clap(version = crate_version!(), about = "A tiny polyphonic MML synthesizer.")]
struct Cli {
    /// The MML song to load.
    input: PathBuf,
    /// Sample rate used for compiling and rendering.
    #[arg(short, long, default_value_t = ps_master::DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
    /// Oscillator shape for every voice.
    #[arg(short, long, value_enum, default_value_t = WaveformArg::Square)]
    waveform: WaveformArg,
    /// Render to an 8-bit mono WAV file instead of playing.
    #[arg(long)]
    wav: Option<PathBuf>,
    /// Write the compiled frames to a binary file.
    #[arg(long)]
    frames: Option<PathBuf>,
    /// Longest render written with --wav.
    #[arg(long, default_value_t = 300)]
    max_seconds: u32,
    /// Print per-channel timing after compiling.
    #[arg(long)]
    stats: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WaveformArg {
    Square,
    Saw,
    Triangle,
}

impl From<WaveformArg> for Shape {
    fn from(arg: WaveformArg) -> Self {
        match arg {
            WaveformArg::Square => Shape::Square,
            WaveformArg::Saw => Shape::Sawtooth,
            WaveformArg::Triangle => Shape::Triangle,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{}: {}", cli.input.display(), err);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(&cli.input)?;
    tracing::debug!(path = %cli.input.display(), bytes = text.len(), "read song");

    let mut ctrl = Controller::new();
    ctrl.set_waveform(cli.waveform.into());
    ctrl.load_mml(&text)?;

    let compiled = ctrl.compile(cli.sample_rate)?;
    println!("Channels: {}", compiled.map.channel_count());
    println!("Frames:   {}", compiled.map.frame_count());
    if cli.stats {
        println!();
        println!("MML stats");
        for s in &compiled.stats {
            println!(
                "  {}: {:8.3} s  {:8} units",
                channel_letter(s.channel),
                s.seconds,
                s.time_units
            );
        }
    }
    println!();

    if let Some(path) = &cli.frames {
        let bytes = ctrl.encode_frames(cli.sample_rate)?;
        fs::write(path, &bytes)?;
        println!("Wrote {} bytes of frames to {}", bytes.len(), path.display());
    }

    match &cli.wav {
        Some(path) => render_to_wav(&ctrl, cli, path)?,
        None if cli.frames.is_none() => play_audio(&mut ctrl)?,
        None => {}
    }
    Ok(())
}

fn channel_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn play_audio(ctrl: &mut Controller) -> Result<(), MasterError> {
    let sample_rate = ctrl.play()?;
    println!("Playing at {} Hz...", sample_rate);

    while !ctrl.is_finished() {
        if let Some(pos) = ctrl.position() {
            print!("\r{:7.2} s", pos.seconds());
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    println!("\rDone.          ");
    Ok(())
}

fn render_to_wav(ctrl: &Controller, cli: &Cli, path: &Path) -> Result<(), MasterError> {
    println!("Rendering to {} at {} Hz...", path.display(), cli.sample_rate);

    let max_samples = cli.sample_rate as usize * cli.max_seconds as usize;
    let rendered = ctrl.render_samples(cli.sample_rate, max_samples)?;
    if rendered.clip_count > 0 {
        println!("Clipped {} samples", rendered.clip_count);
    }
    let wav = samples_to_wav(&rendered.samples, cli.sample_rate)?;
    fs::write(path, &wav)?;

    println!("Rendered {} bytes", wav.len());
    Ok(())
}
