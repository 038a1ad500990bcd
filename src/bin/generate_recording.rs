use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tickgraph::analysis::{AnalysisEngine, analysis_windows};
use tickgraph::simulation::{SimulatedEngine, WatchModel};
use tickgraph::source::RecordedFrame;

#[derive(Parser, Debug)]
#[command(name = "generate_recording")]
#[command(about = "Generate a JSON-lines analysis recording for a simulated watch")]
struct Args {
    /// TOML watch model file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "data/simulated.jsonl")]
    output: PathBuf,

    /// Recording duration in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f64,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000)]
    sample_rate: u32,

    /// Frames per second
    #[arg(long, default_value_t = 10.0)]
    refresh_hz: f64,

    /// Beat rate (CLI override)
    #[arg(long)]
    bph: Option<u32>,

    /// Rate error in s/d (CLI override)
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<f64>,

    /// Beat error in ms (CLI override)
    #[arg(long)]
    beat_error: Option<f64>,

    /// Amplitude in degrees (CLI override)
    #[arg(long)]
    amplitude: Option<f64>,

    /// Tick timing jitter in samples (CLI override)
    #[arg(long)]
    jitter: Option<f64>,

    /// Stop the watch after this many seconds
    #[arg(long)]
    stop_after: Option<f64>,

    /// Seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Keep the averaged waveform in every frame (large files)
    #[arg(long)]
    waveforms: bool,
}

fn load_toml_config(path: &PathBuf) -> Result<WatchModel> {
    let content = fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn build_watch(args: &Args) -> Result<WatchModel> {
    let mut watch = match &args.config {
        Some(path) => load_toml_config(path)?,
        None => WatchModel::default(),
    };
    if let Some(bph) = args.bph {
        watch.bph = bph;
    }
    if let Some(rate) = args.rate {
        watch.rate = rate;
    }
    if let Some(be) = args.beat_error {
        watch.beat_error_ms = be;
    }
    if let Some(amp) = args.amplitude {
        watch.amplitude = amp;
    }
    if let Some(jitter) = args.jitter {
        watch.jitter = jitter;
    }
    if args.stop_after.is_some() {
        watch.stop_after_secs = args.stop_after;
    }
    if args.seed.is_some() {
        watch.seed = args.seed;
    }
    Ok(watch)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init();

    let watch = build_watch(&args)?;
    let mut engine = SimulatedEngine::new(watch, args.sample_rate, args.refresh_hz)
        .context("Invalid watch model")?;

    if let Some(dir) = args.output.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).context("Failed to create output directory")?;
    }
    let file = File::create(&args.output).context("Failed to create output file")?;
    let mut writer = BufWriter::new(file);

    let frames = (args.duration * args.refresh_hz).ceil() as usize;
    let mut windows = analysis_windows(args.sample_rate);

    for i in 0..frames {
        let signal = engine.analyze(&mut windows, 0, 0);
        let mut frame = RecordedFrame {
            signal,
            timestamp: engine.timestamp(),
            windows: windows.clone(),
        };
        if !args.waveforms {
            for w in &mut frame.windows {
                w.waveform.clear();
                w.waveform_max = 0.0;
            }
        }
        frame
            .write_line(&mut writer)
            .context("Failed to write frame")?;

        if i % 100 == 0 {
            eprint!("\rGenerating: {}/{}", i, frames);
        }
    }
    writer.flush().context("Failed to flush output")?;
    eprintln!();

    eprintln!(
        "Wrote {} frames ({:.1} s) to {}",
        frames,
        args.duration,
        args.output.display()
    );
    Ok(())
}
