use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gazetally::integration::ReplayReader;
use gazetally::tracker::{AttentionEngine, EngineConfig, MatchStrategy};

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Spatial,
    Embedding,
}

/// Replay a JSON-lines face observation log and write the attention report.
#[derive(Parser)]
#[command(name = "gazetally-replay", version, about, long_about = None)]
struct Cli {
    /// Observation log, one JSON frame per line
    #[arg(short, long)]
    input: PathBuf,

    /// CSV attention report
    #[arg(short, long, default_value = "attention_report.csv")]
    output: PathBuf,

    /// CSV people-vs-time samples
    #[arg(long, default_value = "people_vs_time.csv")]
    timeline: PathBuf,

    /// JSON engine configuration; defaults are used for missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured matching strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Frame width used to scale the pixel match radius
    #[arg(long)]
    frame_width: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config: EngineConfig = match &cli.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = match strategy {
            Strategy::Spatial => MatchStrategy::Spatial,
            Strategy::Embedding => MatchStrategy::Embedding,
        };
    }
    if let Some(width) = cli.frame_width {
        config = config.scaled_to_frame(width);
    }

    let mut engine = AttentionEngine::new(config).context("building engine")?;

    let input = File::open(&cli.input)
        .with_context(|| format!("opening observation log {}", cli.input.display()))?;

    let mut prev_time: Option<f64> = None;
    for (index, frame) in ReplayReader::new(BufReader::new(input)).enumerate() {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!(record = index + 1, "skipping unreadable frame: {e}");
                continue;
            }
        };
        let dt = prev_time.map_or(0.0, |prev| frame.time - prev);
        prev_time = Some(frame.time);

        let outcome = engine.update(&frame.observations(), frame.time, dt);
        tracing::debug!(
            fps = outcome.fps_hint,
            detected = outcome.detected_count,
            tracked = outcome.tracked_count,
            "frame"
        );
    }

    let report = engine.shutdown_report();
    report
        .save_csv(&cli.output)
        .with_context(|| format!("writing report {}", cli.output.display()))?;
    report
        .save_timeline_csv(&cli.timeline)
        .with_context(|| format!("writing timeline {}", cli.timeline.display()))?;

    let summary = &report.summary;
    info!("===== Campaign Summary =====");
    info!("Total_People_Watched     : {}", summary.total_people_watched);
    info!("Total_Attention_Time_s   : {:.1}", summary.total_attention_time_s);
    info!("Average_Attention_Time_s : {:.1}", summary.average_attention_time_s);
    info!("Campaign_Duration_s      : {:.1}", summary.campaign_duration_s);
    info!("report saved: {}", cli.output.display());
    info!("timeline saved: {}", cli.timeline.display());

    Ok(())
}
