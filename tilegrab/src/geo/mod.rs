//! Geographic value types.
//!
//! Provides validated latitude/longitude points and bounding boxes used
//! throughout the capture pipeline. Values are immutable once constructed;
//! all range checking happens at the constructor boundary so the projection
//! and grid code can assume well-formed input.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Errors produced when constructing geographic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("invalid longitude: {0}")]
    InvalidLongitude(f64),

    /// Bounding box with ne.lat below sw.lat.
    #[error("inverted bounding box: sw.lat {sw} > ne.lat {ne}")]
    InvertedBox { sw: f64, ne: f64 },

    /// Coordinate-pair override text did not match the expected pattern.
    #[error("unparseable coordinate pair: {0:?}")]
    UnparseablePair(String),
}

/// A geographic coordinate in the WGS84 datum.
///
/// Constructed via [`GeoPoint::new`], which enforces
/// `lat ∈ [-90, 90]` and `lng ∈ [-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Creates a validated geographic point.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in decimal degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in decimal degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lat, self.lng)
    }
}

/// A geographic bounding box: southwest and northeast corners.
///
/// The longitude span is the absolute difference between the corners;
/// boxes crossing the antimeridian are not supported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    sw: GeoPoint,
    ne: GeoPoint,
}

/// Pattern for the textual coordinate-pair override: `[lat,lng] [lat,lng]`,
/// SW corner first.
const PAIR_PATTERN: &str =
    r"^\[(-?\d+(?:\.\d+)?), ?(-?\d+(?:\.\d+)?)\] \[(-?\d+(?:\.\d+)?), ?(-?\d+(?:\.\d+)?)\]$";

fn pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PAIR_PATTERN).expect("coordinate pair pattern is valid"))
}

impl BoundingBox {
    /// Creates a bounding box, enforcing `sw.lat <= ne.lat`.
    pub fn new(sw: GeoPoint, ne: GeoPoint) -> Result<Self, GeoError> {
        if sw.lat() > ne.lat() {
            return Err(GeoError::InvertedBox {
                sw: sw.lat(),
                ne: ne.lat(),
            });
        }
        Ok(Self { sw, ne })
    }

    /// Parses an explicit `[lat,lng] [lat,lng]` pair (SW then NE).
    ///
    /// This is the coordinate override that takes precedence over any
    /// geocoded bounding box when present.
    pub fn parse_pair(input: &str) -> Result<Self, GeoError> {
        let caps = pair_regex()
            .captures(input.trim())
            .ok_or_else(|| GeoError::UnparseablePair(input.to_string()))?;

        // The pattern only admits decimal literals, so parsing cannot fail.
        let num = |i: usize| -> f64 { caps[i].parse().expect("matched decimal literal") };

        let sw = GeoPoint::new(num(1), num(2))?;
        let ne = GeoPoint::new(num(3), num(4))?;
        Self::new(sw, ne)
    }

    /// Southwest corner.
    pub fn sw(&self) -> GeoPoint {
        self.sw
    }

    /// Northeast corner.
    pub fn ne(&self) -> GeoPoint {
        self.ne
    }

    /// Latitude extent in degrees.
    pub fn lat_span(&self) -> f64 {
        (self.ne.lat() - self.sw.lat()).abs()
    }

    /// Longitude extent in degrees.
    pub fn lng_span(&self) -> f64 {
        (self.ne.lng() - self.sw.lng()).abs()
    }
}
