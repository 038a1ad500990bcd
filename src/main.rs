use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rolling_stats::Stats;

use tickgraph::output::{OutputFormat, amplitude_label, create_formatter};
use tickgraph::{BphSetting, Readout, RefreshDriver, ReplayEngine, Session, TimegrapherConfig};

#[derive(Parser, Debug)]
#[command(name = "tickgraph")]
#[command(about = "Replay recorded timegrapher analysis and print the readouts", long_about = None)]
struct Args {
    /// JSON-lines recording of analysis frames
    recording: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Beat rate, or "automatic"
    #[arg(short = 'b', long)]
    bph: Option<BphSetting>,

    /// Lift angle in degrees
    #[arg(short = 'l', long)]
    lift_angle: Option<f64>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Pace the replay at the configured refresh rate
    #[arg(long)]
    realtime: bool,

    /// Print only every Nth readout
    #[arg(long, default_value = "1")]
    every: usize,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct Summary {
    rate: Stats<f64>,
    beat_error: Stats<f64>,
    amplitude: Stats<f64>,
    stale: usize,
    empty: usize,
}

impl Summary {
    fn new() -> Self {
        Self {
            rate: Stats::new(),
            beat_error: Stats::new(),
            amplitude: Stats::new(),
            stale: 0,
            empty: 0,
        }
    }

    fn update(&mut self, readout: Option<&Readout>) {
        match readout {
            Some(r) if r.stale => self.stale += 1,
            Some(r) => {
                self.rate.update(r.rate);
                self.beat_error.update(r.beat_error_ms);
                if let Some(amp) = r.amplitude {
                    self.amplitude.update(amp);
                }
            }
            None => self.empty += 1,
        }
    }

    fn print(&self, bph: u32) {
        eprintln!();
        eprintln!("=== Summary ({} bph) ===", bph);
        if self.rate.count > 0 {
            eprintln!(
                "Rate:        {:+.1} s/d (std {:.2}, {:+.1} .. {:+.1})",
                self.rate.mean, self.rate.std_dev, self.rate.min, self.rate.max
            );
            eprintln!(
                "Beat error:  {:.2} ms (std {:.3})",
                self.beat_error.mean, self.beat_error.std_dev
            );
        }
        let amplitude = (self.amplitude.count > 0).then_some(self.amplitude.mean);
        eprintln!("Amplitude:   {}", amplitude_label(amplitude));
        eprintln!(
            "Readouts:    {} fresh, {} stale, {} without lock",
            self.rate.count, self.stale, self.empty
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => TimegrapherConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TimegrapherConfig::default(),
    };
    if let Some(bph) = args.bph {
        config.watch.bph = bph;
    }
    if let Some(la) = args.lift_angle {
        config.watch.lift_angle = la;
    }

    let mut session = Session::new(&config);

    let mut engine = ReplayEngine::open(&args.recording, session.windows().len())
        .with_context(|| format!("Failed to read recording {}", args.recording.display()))?;
    if engine.is_empty() {
        anyhow::bail!("Recording {} has no frames", args.recording.display());
    }

    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let every = args.every.max(1);
    let mut summary = Summary::new();
    let mut tick = 0usize;
    let mut step = || {
        let readout = session.on_tick(&mut engine);
        summary.update(readout.as_ref());
        if let Some(readout) = &readout
            && tick % every == 0
        {
            println!("{}", formatter.format(readout));
        }
        tick += 1;
        if engine.is_finished() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };

    if args.realtime {
        let driver = RefreshDriver::new(config.display.refresh_hz)?;
        driver.run(step);
    } else {
        while step().is_continue() {}
    }

    summary.print(session.guessed_bph());
    Ok(())
}
