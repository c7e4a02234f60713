use anyhow::Result;
use clap::{Parser, Subcommand};
use loqa_dialogue::{scan_samples, AudioFile, Config, ResponseGenerator, VadConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loqa-dialogue", version, about = "Spoken dialogue practice engine")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/loqa-dialogue")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the voice activity detector over a WAV file
    Scan {
        path: String,

        /// Override the speech energy threshold (dBFS)
        #[arg(long)]
        threshold_db: Option<f32>,

        /// Override the trailing silence before auto-stop (seconds)
        #[arg(long)]
        silence_secs: Option<f32>,
    },
    /// List the configured practice scenarios
    Scenarios,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            path,
            threshold_db,
            silence_secs,
        } => {
            let mut vad = match Config::load(&cli.config) {
                Ok(cfg) => cfg.vad,
                Err(e) => {
                    warn!("Using default VAD settings: {:#}", e);
                    VadConfig::default()
                }
            };
            if let Some(threshold) = threshold_db {
                vad.energy_threshold_db = threshold;
            }
            if let Some(silence) = silence_secs {
                vad.silence_duration_secs = silence;
            }
            vad.validate()?;

            let audio = AudioFile::open(&path)?;
            let report = scan_samples(&vad, &audio.to_mono(), audio.sample_rate);

            info!(
                "Scanned {} windows of {} samples (threshold {:.1} dB)",
                report.windows, vad.analysis_window_samples, vad.energy_threshold_db
            );
            if let Some(peak) = report.peak_db {
                info!("Peak level: {:.1} dB", peak);
            }
            match report.speech_started_at {
                Some(at) => info!("Speech started at {:.2}s", at.as_secs_f64()),
                None => info!("No speech detected"),
            }
            match report.auto_stop_at {
                Some(at) => info!("Recording would auto-stop at {:.2}s", at.as_secs_f64()),
                None => info!("Recording would not auto-stop before the end of the file"),
            }
        }

        Command::Scenarios => {
            let cfg = Config::load(&cli.config)?;
            info!("{}: {} scenarios", cfg.service.name, cfg.scenarios.len());

            let responder = cfg.responder();
            for scenario in responder.scenarios() {
                println!(
                    "{:<16} {:<32} {} turns  \"{}\"",
                    scenario.id,
                    scenario.title,
                    scenario.max_turns,
                    responder.initial_prompt(&scenario)
                );
            }
        }
    }

    Ok(())
}
