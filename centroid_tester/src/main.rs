use anyhow::{Context, Result, bail};
use centroid_finder::config::Settings;
use centroid_finder::export::CsvOptions;
use centroid_finder::frame_source::ImageSequenceSource;
use centroid_finder::jobs::{JobRegistry, JobStatus};
use centroid_finder::utils::image_helper::image_helper;
use centroid_finder::{Color, preview_frame};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "centroid_finder=info,centroid_tester=info";
const MARKER_COLOR: Color = Color::new(255, 0, 0);

#[derive(Parser)]
#[command(
    name = "centroid_tester",
    about = "Track the largest patch of a color through still images and frame sequences"
)]
struct Cli {
    /// TOML settings file.
    #[arg(long, env = "CENTROID_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Target color as #rrggbb. Overrides the config file.
    #[arg(long)]
    color: Option<String>,

    /// Color distance below which a pixel matches. Overrides the config file.
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Command {
    /// Binarize one image, print the centroid and save the mask as PNG.
    Preview {
        image: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[arg(long, default_value = "preview.png")]
        output: PathBuf,
    },
    /// Run the pipeline over a directory of frames and write the track as CSV.
    Process {
        frames_dir: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Frame rate of the sequence. Adds a seconds column to the CSV.
        #[arg(long)]
        fps: Option<f64>,

        /// Where CSV results are written. Overrides the config file.
        #[arg(long)]
        results_dir: Option<PathBuf>,

        /// How often to poll the job for progress, in milliseconds.
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Command::Preview {
            image,
            analysis,
            output,
        } => {
            let settings = apply_analysis_args(settings, &analysis)?;
            preview(settings, image, output)
        }
        Command::Process {
            frames_dir,
            analysis,
            fps,
            results_dir,
            poll_ms,
        } => {
            let mut settings = apply_analysis_args(settings, &analysis)?;
            if let Some(fps) = fps {
                settings = settings.with_frame_rate(fps)?;
            }
            if let Some(dir) = results_dir {
                settings.results_dir = dir;
            }
            process(settings, frames_dir, Duration::from_millis(poll_ms.max(1))).await
        }
    }
}

fn apply_analysis_args(mut settings: Settings, args: &AnalysisArgs) -> Result<Settings> {
    if let Some(color) = &args.color {
        settings = settings.with_target_color(color)?;
    }
    if let Some(threshold) = args.threshold {
        settings = settings.with_threshold(threshold)?;
    }
    Ok(settings)
}

fn preview(settings: Settings, image: PathBuf, output: PathBuf) -> Result<()> {
    let frame = image_helper::load_frame(&image)
        .with_context(|| format!("loading {}", image.display()))?;
    let params = settings.analysis;
    let preview = preview_frame(&frame, &params.target, params.threshold)?;

    match preview.centroid {
        Some(centroid) => println!(
            "centroid: ({}, {}) region: {} px matched: {} px",
            centroid.x,
            centroid.y,
            preview.region_size,
            preview.mask.count()
        ),
        None => println!("no pixel within {} of {}", params.threshold.value(), params.target),
    }

    image_helper::save_preview(&output, &preview, MARKER_COLOR)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(output = %output.display(), "preview saved");
    Ok(())
}

async fn process(settings: Settings, frames_dir: PathBuf, poll_every: Duration) -> Result<()> {
    let source = ImageSequenceSource::open(&frames_dir)
        .with_context(|| format!("opening {}", frames_dir.display()))?;
    let registry = JobRegistry::new(
        settings.results_dir.clone(),
        settings.max_concurrent_jobs,
        CsvOptions {
            frame_rate: settings.frame_rate,
        },
    );
    let id = registry.submit(source, settings.analysis).await;

    let mut ticker = tokio::time::interval(poll_every);
    let mut cancel_requested = false;
    let status = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                warn!(job = %id, "interrupted, cancelling after the current frame");
                registry.cancel(id).await?;
                cancel_requested = true;
            }
            _ = ticker.tick() => {
                let status = registry.poll(id).await?;
                match &status {
                    JobStatus::Pending => info!(job = %id, "waiting for a worker"),
                    JobStatus::Processing { processed, total } => match total {
                        Some(total) => info!(job = %id, "processed {processed}/{total} frames"),
                        None => info!(job = %id, "processed {processed} frames"),
                    },
                    _ => {}
                }
                if status.is_finished() {
                    break status;
                }
            }
        }
    };

    match status {
        JobStatus::Done { locator } => {
            println!("{locator}");
            Ok(())
        }
        JobStatus::Cancelled { processed } => {
            let partial = registry.partial_result(id).await?.unwrap_or_default();
            warn!(job = %id, processed, frames = partial.len(), "job cancelled, no CSV written");
            Ok(())
        }
        JobStatus::Failed {
            frame_index,
            kind,
            message,
        } => match frame_index {
            Some(index) => bail!("job failed at frame {index} ({kind}): {message}"),
            None => bail!("job failed ({kind}): {message}"),
        },
        other => bail!("job stopped reporting while {other:?}"),
    }
}
