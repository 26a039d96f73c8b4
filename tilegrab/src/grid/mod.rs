//! Capture grid construction.
//!
//! Divides a bounding box into a regular matrix of geographic coordinates,
//! one per tile to render, using fixed angular step sizes. The grid is
//! deliberately not clipped to the northeast corner: the last row and column
//! may overshoot the requested box by up to one step, trading exact fit for
//! guaranteed coverage.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::geo::{BoundingBox, GeoPoint};

/// Default latitude step in degrees.
///
/// Together with [`DEFAULT_LNG_STEP`], empirically chosen so adjacent
/// rendered tiles abut at the default framing zoom and viewport size.
pub const DEFAULT_LAT_STEP: f64 = 0.03;

/// Default longitude step in degrees.
pub const DEFAULT_LNG_STEP: f64 = 0.06;

/// Errors from grid construction and tile selection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Step sizes must be finite and strictly positive.
    #[error("invalid {axis} step: {value}")]
    InvalidStep { axis: &'static str, value: f64 },

    /// A cell coordinate fell outside the valid geographic range.
    ///
    /// Can only happen when an unclipped final row/column steps past a pole.
    #[error("grid cell ({row}, {col}) is outside the valid coordinate range")]
    CellOutOfRange { row: usize, col: usize },

    /// Tile selection index outside `1..=total`.
    #[error("tile {requested} does not exist; grid has {total} tiles")]
    TileOutOfRange { requested: usize, total: usize },
}

/// A single tile render request.
///
/// Created by [`Grid::render_jobs`] and handed off to the batch scheduler,
/// which dispatches it without mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    /// URL of the map view to capture.
    pub source_url: String,

    /// Destination image path.
    pub output_path: PathBuf,

    /// Geographic coordinate of the tile cell.
    pub coords: GeoPoint,

    /// 1-based position in row-major traversal order.
    pub sequence: usize,
}

/// A matrix of geographic coordinates covering a bounding box.
///
/// Rows span the latitude axis (south to north), columns the longitude axis
/// (west to east). Construction is deterministic: identical inputs always
/// produce an identical matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cells: Vec<Vec<GeoPoint>>,
}

impl Grid {
    /// Builds a grid over `bbox` with the given angular steps.
    ///
    /// Row and column counts are `ceil(span / step)`, with a minimum of one
    /// each: a zero-extent axis still yields a single row or column, so the
    /// grid is never empty.
    pub fn build(bbox: &BoundingBox, lat_step: f64, lng_step: f64) -> Result<Self, GridError> {
        if !lat_step.is_finite() || lat_step <= 0.0 {
            return Err(GridError::InvalidStep {
                axis: "latitude",
                value: lat_step,
            });
        }
        if !lng_step.is_finite() || lng_step <= 0.0 {
            return Err(GridError::InvalidStep {
                axis: "longitude",
                value: lng_step,
            });
        }

        let rows = ((bbox.lat_span() / lat_step).ceil() as usize).max(1);
        let cols = ((bbox.lng_span() / lng_step).ceil() as usize).max(1);

        let sw = bbox.sw();
        let mut cells = Vec::with_capacity(rows);
        for r in 0..rows {
            let lat = sw.lat() + r as f64 * lat_step;
            let mut row = Vec::with_capacity(cols);
            for c in 0..cols {
                let lng = sw.lng() + c as f64 * lng_step;
                let point = GeoPoint::new(lat, lng)
                    .map_err(|_| GridError::CellOutOfRange { row: r, col: c })?;
                row.push(point);
            }
            cells.push(row);
        }

        debug!(rows, cols, lat_step, lng_step, "grid built");
        Ok(Self { cells })
    }

    /// Number of rows (latitude axis).
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns (longitude axis).
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Total cell count.
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Always false: grids have at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The coordinate at `(row, col)`, if in range.
    pub fn get(&self, row: usize, col: usize) -> Option<GeoPoint> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Iterates cells in row-major order as `(row, col, coordinate)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, GeoPoint)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, p)| (r, c, *p)))
    }

    /// Creates one [`RenderJob`] per cell in row-major order.
    ///
    /// `map_url` produces the view URL for a coordinate; `output_dir` is
    /// where image files will land. Sequence indices start at 1 and drive
    /// both the file-naming scheme and tile selection.
    pub fn render_jobs<F>(&self, map_url: F, output_dir: &Path) -> Vec<RenderJob>
    where
        F: Fn(&GeoPoint) -> String,
    {
        self.iter()
            .enumerate()
            .map(|(i, (row, col, coords))| {
                let sequence = i + 1;
                RenderJob {
                    source_url: map_url(&coords),
                    output_path: output_dir.join(tile_file_name(sequence, row, col, &coords)),
                    coords,
                    sequence,
                }
            })
            .collect()
    }
}

/// File name for a tile: `{seq:02}_{row+1}x{col+1}_{lat}x{lng}.png`.
///
/// Dots in the coordinate segment become commas so the name stays safe on
/// filesystems that treat dots specially.
pub fn tile_file_name(sequence: usize, row: usize, col: usize, coords: &GeoPoint) -> String {
    let coord_segment = format!("{}x{}", coords.lat(), coords.lng()).replace('.', ",");
    format!(
        "{:02}_{}x{}_{}.png",
        sequence,
        row + 1,
        col + 1,
        coord_segment
    )
}

/// Keeps only the job with the given 1-based sequence index.
///
/// Used by the "regenerate tile N" flow: exactly one job survives, the rest
/// are discarded before scheduling.
pub fn select_tile(jobs: Vec<RenderJob>, tile_number: usize) -> Result<Vec<RenderJob>, GridError> {
    let total = jobs.len();
    let selected: Vec<RenderJob> = jobs
        .into_iter()
        .filter(|job| job.sequence == tile_number)
        .collect();
    if selected.is_empty() {
        return Err(GridError::TileOutOfRange {
            requested: tile_number,
            total,
        });
    }
    Ok(selected)
}
