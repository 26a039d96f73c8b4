//! Capture session orchestration.
//!
//! Wires the collaborators together: resolve a bounding box (explicit
//! coordinate override or geocoded place name), build the capture grid,
//! optionally narrow to a single tile, then drive the batch scheduler with
//! the render backend and aggregate the final report.
//!
//! Errors at this level follow the run-aborting taxonomy: anything that
//! prevents building a valid job list is fatal, while individual render
//! failures are isolated inside the scheduler and surface only in the
//! report.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::config::ConfigFile;
use crate::geo::{BoundingBox, GeoError};
use crate::geocode::{GeocodeError, HttpClient, MapTilerClient};
use crate::grid::{select_tile, Grid, GridError, RenderJob};
use crate::queue::{BatchQueue, JobOutcome, QueueError};
use crate::render::Renderer;

/// Errors that abort a capture run before or during scheduling.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Neither a place name nor a coordinate override was supplied.
    #[error("no destination given; provide a place name or a coordinate pair")]
    MissingDestination,

    /// The geocoding collaborator failed; no grid can be built without it.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// The coordinate-pair override was present but invalid.
    #[error("invalid coordinate override: {0}")]
    Override(#[from] GeoError),

    /// Grid construction or tile selection failed.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Scheduler configuration was invalid.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The output directory could not be created.
    #[error("failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Tunables for a capture session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Latitude step between grid rows, in degrees.
    pub lat_step: f64,

    /// Longitude step between grid columns, in degrees.
    pub lng_step: f64,

    /// When set, regenerate only the tile with this 1-based sequence index.
    pub tile: Option<usize>,

    /// Directory image files are written to.
    pub output_dir: PathBuf,

    /// Jobs dispatched concurrently per batch.
    pub concurrency: usize,

    /// Pause between batches.
    pub batch_delay: Duration,
}

impl SessionOptions {
    /// Derives session options from the loaded configuration file.
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            lat_step: config.grid.lat_step,
            lng_step: config.grid.lng_step,
            tile: None,
            output_dir: config.capture.output_dir.clone(),
            concurrency: config.queue.concurrency,
            batch_delay: Duration::from_secs_f64(config.queue.batch_delay_secs),
        }
    }
}

/// A prepared capture: resolved destination and the jobs to schedule.
#[derive(Debug, Clone)]
pub struct CapturePlan {
    /// Canonical destination name (or the raw override text).
    pub place_name: String,

    /// Grid height before tile selection.
    pub rows: usize,

    /// Grid width before tile selection.
    pub cols: usize,

    jobs: Vec<RenderJob>,
}

impl CapturePlan {
    /// Jobs that will be scheduled, in sequence order.
    pub fn jobs(&self) -> &[RenderJob] {
        &self.jobs
    }

    /// Number of jobs that will be scheduled.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

/// The aggregated result of a full run.
///
/// A run always completes: failures are listed, never thrown.
#[derive(Debug)]
pub struct CaptureReport {
    /// Destination the run captured.
    pub place_name: String,

    /// One outcome per scheduled job, in sequence order.
    pub outcomes: Vec<JobOutcome<RenderJob>>,
}

impl CaptureReport {
    /// Outcomes that completed successfully, in order.
    pub fn successes(&self) -> impl Iterator<Item = &JobOutcome<RenderJob>> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    /// Outcomes that failed, in order.
    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome<RenderJob>> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Number of failed jobs.
    pub fn error_count(&self) -> usize {
        self.failures().count()
    }

    /// True when every job succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.error_count() == 0
    }
}

/// A capture session over concrete geocoding and rendering backends.
pub struct CaptureSession<C: HttpClient, R: Renderer> {
    maptiler: MapTilerClient<C>,
    renderer: R,
    options: SessionOptions,
}

impl<C: HttpClient, R: Renderer> CaptureSession<C, R> {
    /// Creates a session.
    pub fn new(maptiler: MapTilerClient<C>, renderer: R, options: SessionOptions) -> Self {
        Self {
            maptiler,
            renderer,
            options,
        }
    }

    /// Resolves the destination and builds the job list.
    ///
    /// A matching coordinate override takes precedence over geocoding; the
    /// geocoder is not consulted at all when an override is present.
    pub async fn prepare(
        &self,
        location: Option<&str>,
        coords_override: Option<&str>,
    ) -> Result<CapturePlan, SessionError> {
        let (place_name, bounds) = match (coords_override, location) {
            (Some(raw), _) => (raw.to_string(), BoundingBox::parse_pair(raw)?),
            (None, Some(place)) => {
                let data = self.maptiler.map_data(place).await?;
                (data.place_name, data.bounds)
            }
            (None, None) => return Err(SessionError::MissingDestination),
        };

        let grid = Grid::build(&bounds, self.options.lat_step, self.options.lng_step)?;
        let rows = grid.rows();
        let cols = grid.cols();

        let mut jobs =
            grid.render_jobs(|p| self.maptiler.map_url(p), &self.options.output_dir);
        if let Some(tile_number) = self.options.tile {
            jobs = select_tile(jobs, tile_number)?;
        }

        info!(
            place = %place_name,
            rows,
            cols,
            jobs = jobs.len(),
            "capture plan ready"
        );

        Ok(CapturePlan {
            place_name,
            rows,
            cols,
            jobs,
        })
    }

    /// Schedules the plan's jobs and aggregates the report.
    ///
    /// `progress` receives the cumulative settled-job count as tiles finish.
    pub async fn execute<P>(
        &self,
        plan: CapturePlan,
        progress: P,
    ) -> Result<CaptureReport, SessionError>
    where
        P: Fn(usize),
    {
        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .map_err(|source| SessionError::OutputDir {
                path: self.options.output_dir.clone(),
                source,
            })?;

        let queue = BatchQueue::new(self.options.concurrency, self.options.batch_delay)?;
        let renderer = &self.renderer;

        let outcomes = queue
            .process_with_progress(
                plan.jobs,
                |job| async move { renderer.capture(&job.source_url, &job.output_path).await },
                progress,
            )
            .await;

        let report = CaptureReport {
            place_name: plan.place_name,
            outcomes,
        };

        info!(
            place = %report.place_name,
            total = report.outcomes.len(),
            errors = report.error_count(),
            "capture run complete"
        );

        Ok(report)
    }

    /// Prepares and executes in one step.
    pub async fn run<P>(
        &self,
        location: Option<&str>,
        coords_override: Option<&str>,
        progress: P,
    ) -> Result<CaptureReport, SessionError>
    where
        P: Fn(usize),
    {
        let plan = self.prepare(location, coords_override).await?;
        self.execute(plan, progress).await
    }
}
