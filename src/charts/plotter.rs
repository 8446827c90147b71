//! State Map Plotter Module
//! Draws accident locations for one state and year over boundary outlines using plotters.

use crate::charts::{Bounds, StateOutlines};
use crate::data::{FarsReader, LoaderError, Year};
use plotters::coord::Shift;
use plotters::prelude::{
    ChartBuilder, Circle, Color, DrawingArea, DrawingBackend, LineSeries, BLACK, WHITE,
};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

/// LONGITUD values above this are FARS "not recorded" codes.
pub const LONGITUDE_SENTINEL: f64 = 900.0;
/// LATITUDE values above this are FARS "not recorded" codes.
pub const LATITUDE_SENTINEL: f64 = 90.0;

const POINT_RADIUS: i32 = 1;
const MARGIN: u32 = 10;

#[derive(Error, Debug)]
pub enum MapError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error("invalid STATE number: {0}")]
    InvalidState(i64),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("failed to render map: {0}")]
    Render(String),
}

/// What a map call ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    /// The state had no accident rows; nothing was drawn.
    NoAccidents,
    /// `records` rows matched the state, `plotted` of them had usable coordinates.
    Drawn { records: usize, plotted: usize },
}

/// Renders per-state accident maps onto a caller-supplied drawing area.
pub struct StatePlotter;

impl StatePlotter {
    /// Load `year`, keep the rows for `state` and draw them.
    ///
    /// A missing file is returned as `MapError::Load` unchanged; a state code
    /// absent from the year's data is `MapError::InvalidState`.
    pub fn map_state<DB: DrawingBackend>(
        reader: &FarsReader,
        state: i64,
        year: Year,
        outlines: Option<&StateOutlines>,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<MapOutcome, MapError> {
        let df = reader.read_year(year)?;
        let accidents = Self::select_state(&df, state)?;
        debug!(state, %year, rows = accidents.height(), "state accidents selected");
        if outlines.is_some_and(|o| o.rings_for(state).is_empty()) {
            debug!(state, "no boundary outline for state");
        }
        Self::plot_accidents(&accidents, outlines, area)
    }

    /// Rows of `df` whose STATE equals `state`.
    pub fn select_state(df: &DataFrame, state: i64) -> Result<DataFrame, MapError> {
        let states = df.column("STATE")?.cast(&DataType::Int64)?;
        if !states.i64()?.into_iter().any(|s| s == Some(state)) {
            return Err(MapError::InvalidState(state));
        }

        let filtered = df
            .clone()
            .lazy()
            .filter(col("STATE").cast(DataType::Int64).eq(lit(state)))
            .collect()?;
        Ok(filtered)
    }

    /// Sanitize coordinates and draw whatever remains. An empty frame is
    /// reported as `MapOutcome::NoAccidents` without touching `area`.
    pub fn plot_accidents<DB: DrawingBackend>(
        accidents: &DataFrame,
        outlines: Option<&StateOutlines>,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<MapOutcome, MapError> {
        if accidents.height() == 0 {
            info!("no accidents to plot");
            return Ok(MapOutcome::NoAccidents);
        }

        let clean = Self::sanitize_coordinates(accidents)?;
        let points = Self::coordinates(&clean)?;
        let bounds = Self::plot_bounds(&points, outlines);

        Self::draw(area, &points, outlines, bounds)?;
        Ok(MapOutcome::Drawn {
            records: accidents.height(),
            plotted: points.len(),
        })
    }

    /// Null out sentinel coordinates: LONGITUD > 900 and LATITUDE > 90.
    ///
    /// Both columns come back as Float64.
    pub fn sanitize_coordinates(df: &DataFrame) -> PolarsResult<DataFrame> {
        let lon = col("LONGITUD").cast(DataType::Float64);
        let lat = col("LATITUDE").cast(DataType::Float64);

        df.clone()
            .lazy()
            .with_columns([
                when(lon.clone().gt(lit(LONGITUDE_SENTINEL)))
                    .then(lit(NULL).cast(DataType::Float64))
                    .otherwise(lon)
                    .alias("LONGITUD"),
                when(lat.clone().gt(lit(LATITUDE_SENTINEL)))
                    .then(lit(NULL).cast(DataType::Float64))
                    .otherwise(lat)
                    .alias("LATITUDE"),
            ])
            .collect()
    }

    /// (longitude, latitude) pairs of rows where both are present.
    pub fn coordinates(df: &DataFrame) -> PolarsResult<Vec<(f64, f64)>> {
        let lon = df.column("LONGITUD")?.f64()?;
        let lat = df.column("LATITUDE")?.f64()?;

        Ok(lon
            .into_iter()
            .zip(lat.into_iter())
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }

    /// Range of the points, falling back to the outline extent and then
    /// the whole globe. Zero-width axes are widened.
    fn plot_bounds(points: &[(f64, f64)], outlines: Option<&StateOutlines>) -> Bounds {
        let b = Bounds::of_points(points)
            .or_else(|| outlines.and_then(StateOutlines::bounds))
            .unwrap_or(Bounds::WORLD);

        let (min_lon, max_lon) = widen(b.min_lon, b.max_lon);
        let (min_lat, max_lat) = widen(b.min_lat, b.max_lat);
        Bounds {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    fn draw<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        points: &[(f64, f64)],
        outlines: Option<&StateOutlines>,
        bounds: Bounds,
    ) -> Result<(), MapError> {
        area.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(area)
            .margin(MARGIN)
            .build_cartesian_2d(
                bounds.min_lon..bounds.max_lon,
                bounds.min_lat..bounds.max_lat,
            )
            .map_err(render_err)?;

        if let Some(outlines) = outlines {
            let visible = outlines.rings().filter(|ring| {
                Bounds::of_points(ring.iter()).is_some_and(|r| r.intersects(&bounds))
            });
            for ring in visible {
                chart
                    .draw_series(LineSeries::new(ring.iter().copied(), &BLACK))
                    .map_err(render_err)?;
            }
        }

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, POINT_RADIUS, BLACK.filled())),
            )
            .map_err(render_err)?;

        area.present().map_err(render_err)?;
        debug!(points = points.len(), "state map drawn");
        Ok(())
    }
}

fn widen(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    }
}

fn render_err(e: impl std::fmt::Display) -> MapError {
    MapError::Render(e.to_string())
}
