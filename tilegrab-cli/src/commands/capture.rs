//! Capture command - render a destination as a grid of map images.

use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tilegrab::config::ConfigFile;
use tilegrab::geocode::{MapTilerClient, MapTilerConfig, ReqwestClient};
use tilegrab::logging::{init_logging, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};
use tilegrab::render::{CaptureOptions, WebsiteCapture};
use tilegrab::session::{CaptureReport, CaptureSession, SessionOptions};

use crate::error::CliError;

/// Arguments for the default capture command.
#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// Destination place name, e.g. "Paris"
    pub location: Option<String>,

    /// Explicit bounding box, SW then NE corner: "[lat, lng] [lat, lng]"
    #[arg(long)]
    pub coords: Option<String>,

    /// Regenerate only this tile (1-based sequence number)
    #[arg(long)]
    pub tile: Option<usize>,

    /// Directory image files are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Tiles rendered concurrently per batch
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Pause between batches, in seconds
    #[arg(long)]
    pub batch_delay: Option<f64>,

    /// Framing zoom for captured views
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Settle delay before each screenshot, in seconds
    #[arg(long)]
    pub delay: Option<f64>,
}

impl CaptureArgs {
    /// Applies CLI overrides on top of the loaded configuration.
    fn apply_to(&self, config: &mut ConfigFile) {
        if let Some(dir) = &self.output_dir {
            config.capture.output_dir = dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.queue.concurrency = concurrency;
        }
        if let Some(delay) = self.batch_delay {
            config.queue.batch_delay_secs = delay;
        }
        if let Some(zoom) = self.zoom {
            config.capture.zoom = zoom;
        }
        if let Some(delay) = self.delay {
            config.capture.delay = delay;
        }
    }
}

/// Run the capture command.
pub async fn run(args: CaptureArgs) -> Result<(), CliError> {
    let mut config = ConfigFile::load().map_err(|e| CliError::Config(e.to_string()))?;
    args.apply_to(&mut config);

    let _log_guard = init_logging(DEFAULT_LOG_DIR, DEFAULT_LOG_FILE)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!(version = tilegrab::VERSION, "tilegrab starting");

    if config.api.key.is_empty() {
        return Err(CliError::Config("no API key configured".to_string()));
    }

    let http_client = ReqwestClient::new().map_err(|e| CliError::Config(e.to_string()))?;
    let maptiler = MapTilerClient::new(
        http_client,
        MapTilerConfig::new(&config.api.url, &config.api.key, &config.api.map_id)
            .with_zoom(config.capture.zoom),
    );
    let renderer = WebsiteCapture::with_binary(
        &config.capture.renderer,
        CaptureOptions::default().with_delay_secs(config.capture.delay),
    );

    let mut options = SessionOptions::from_config(&config);
    options.tile = args.tile;
    let session = CaptureSession::new(maptiler, renderer, options);

    let plan = session
        .prepare(args.location.as_deref(), args.coords.as_deref())
        .await?;

    println!(
        "{}",
        style(format!("Capturing map of {}...", plan.place_name)).cyan()
    );
    println!(
        "{}",
        style(format!(
            "Map area will be rendered as a {} x {} grid.",
            plan.cols, plan.rows
        ))
        .magenta()
        .dim()
    );

    let bar = ProgressBar::new(plan.job_count() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles")
            .map_err(|e| CliError::Config(e.to_string()))?
            .progress_chars("##-"),
    );

    let report = session
        .execute(plan, |count| bar.set_position(count as u64))
        .await?;
    bar.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn print_report(report: &CaptureReport) {
    if report.all_succeeded() {
        println!("{}", style("Map images saved successfully.").green());
        return;
    }

    println!(
        "{}",
        style(format!(
            "Map images saved, but {} errors occurred.",
            report.error_count()
        ))
        .red()
    );
    for outcome in report.failures() {
        let error = outcome.error.as_deref().unwrap_or("unknown error");
        println!(
            "  {} {} -> {}",
            style(&outcome.job.coords).yellow(),
            outcome.job.output_path.display(),
            error
        );
    }
}
