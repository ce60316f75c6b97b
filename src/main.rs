use clap::{Parser, ValueEnum};
use crossbeam_channel::unbounded;
use pulse_sense::app::Monitor;
use pulse_sense::source::{LineSource, SyntheticSource};
use pulse_sense::{EngineConfig, SessionController};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Generated fingertip signal
    Synthetic,
    /// `red,green,blue[,unix_millis]` lines on standard input
    Stdin,
}

/// Estimate heart rate from a stream of camera color samples
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, value_enum, default_value_t = SourceKind::Synthetic)]
    source: SourceKind,

    /// Heart rate of the synthetic signal
    #[arg(long, default_value_t = 72.0)]
    bpm: f64,

    /// Length of the synthetic signal in seconds
    #[arg(long, default_value_t = 20.0)]
    seconds: f64,

    /// Pace synthetic frames at the configured frame rate
    #[arg(long)]
    realtime: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config back to disk before measuring
    #[arg(long)]
    write_config: bool,
}

fn load_config(args: &Args) -> EngineConfig {
    let path = args.config.clone().unwrap_or_else(EngineConfig::config_path);

    match EngineConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{} ({}), using defaults", e, path.display());
            EngineConfig::default()
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args);

    if args.write_config {
        let path = args.config.clone().unwrap_or_else(EngineConfig::config_path);
        if let Err(e) = config.save_to(&path) {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
        log::info!("Config written to {}", path.display());
    }

    let sample_rate_hz = config.sampling.sample_rate_hz;
    let controller = match SessionController::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Samples flow from the source thread to the session on this thread
    let (sender, receiver) = unbounded();

    let producer = match args.source {
        SourceKind::Synthetic => {
            let source = SyntheticSource::new(args.bpm, sample_rate_hz, args.seconds)
                .realtime(args.realtime);
            std::thread::spawn(move || source.run(sender))
        }
        SourceKind::Stdin => {
            std::thread::spawn(move || LineSource::new(std::io::stdin().lock()).run(sender))
        }
    };

    let outcome = Monitor::new(controller, receiver).run();
    if producer.join().is_err() {
        log::error!("Sample source thread panicked");
    }

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match toml::to_string_pretty(&outcome) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize results: {}", e);
            ExitCode::FAILURE
        }
    }
}
