//! State Boundary Outlines
//! Loads base-map polygons from a GeoJSON FeatureCollection keyed by FARS state code.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("failed to read boundary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid geometry for state {state}: {reason}")]
    Geometry { state: i64, reason: String },
}

/// Property names that may hold the numeric state code.
const STATE_KEYS: [&str; 2] = ["STATE", "STATEFP"];

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum Geometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

/// Axis-aligned longitude/latitude extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Whole-globe extent.
    pub const WORLD: Bounds = Bounds {
        min_lon: -180.0,
        max_lon: 180.0,
        min_lat: -90.0,
        max_lat: 90.0,
    };

    /// Smallest extent holding every point, or `None` when there are none.
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, &(lon, lat)| {
            Some(match acc {
                None => Bounds {
                    min_lon: lon,
                    max_lon: lon,
                    min_lat: lat,
                    max_lat: lat,
                },
                Some(b) => Bounds {
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                },
            })
        })
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }
}

/// Boundary rings per state code. Each ring is a closed (lon, lat) path.
#[derive(Debug, Clone, Default)]
pub struct StateOutlines {
    rings: BTreeMap<i64, Vec<Vec<(f64, f64)>>>,
}

impl StateOutlines {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OutlineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson(&text)
    }

    /// Parse a FeatureCollection. Features without a state code, without
    /// geometry, or with a geometry other than Polygon/MultiPolygon are
    /// skipped.
    pub fn from_geojson(text: &str) -> Result<Self, OutlineError> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        let mut outlines = Self::default();

        for feature in collection.features {
            let Some(state) = feature.properties.as_ref().and_then(state_code) else {
                debug!("skipping boundary feature without a state code");
                continue;
            };
            let Some(geometry) = feature.geometry else {
                continue;
            };

            let kind = geometry.get("type").and_then(Value::as_str);
            if !matches!(kind, Some("Polygon" | "MultiPolygon")) {
                debug!(state, ?kind, "skipping unsupported boundary geometry");
                continue;
            }

            let polygons = match Geometry::deserialize(&geometry)? {
                Geometry::Polygon(rings) => vec![rings],
                Geometry::MultiPolygon(polygons) => polygons,
            };
            for ring in polygons.into_iter().flatten() {
                let path = ring
                    .iter()
                    .map(|pos| match pos.as_slice() {
                        [lon, lat, ..] => Ok((*lon, *lat)),
                        _ => Err(OutlineError::Geometry {
                            state,
                            reason: format!("position has {} coordinates", pos.len()),
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                outlines.insert(state, path);
            }
        }

        debug!(states = outlines.rings.len(), "boundary outlines loaded");
        Ok(outlines)
    }

    pub fn insert(&mut self, state: i64, ring: Vec<(f64, f64)>) {
        self.rings.entry(state).or_default().push(ring);
    }

    pub fn rings_for(&self, state: i64) -> &[Vec<(f64, f64)>] {
        self.rings.get(&state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every ring of every state.
    pub fn rings(&self) -> impl Iterator<Item = &Vec<(f64, f64)>> {
        self.rings.values().flatten()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_points(self.rings().flatten())
    }
}

fn state_code(properties: &Map<String, Value>) -> Option<i64> {
    STATE_KEYS.iter().find_map(|key| match properties.get(*key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
