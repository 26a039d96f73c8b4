//! MapTiler-compatible geocoding and map-view URLs.
//!
//! Resolves a free-text place name to a bounding box, canonical name and
//! center coordinate via the provider's geocoding API, and builds the map
//! view URL the renderer captures for each grid cell.
//!
//! Geocoding failure is fatal to a capture run: without a bounding box no
//! grid can be built, so errors here propagate instead of being isolated.

mod http;

pub use http::{HttpClient, ReqwestClient};

#[cfg(test)]
pub use http::tests::MockHttpClient;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::geo::{BoundingBox, GeoPoint};

/// Default framing zoom for captured map views.
///
/// Fractional: this is a display zoom for the rendered viewport, not a tile
/// pyramid level.
pub const DEFAULT_MAP_ZOOM: f64 = 12.9;

/// Errors from the geocoding collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeocodeError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not match the expected shape.
    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),

    /// The provider returned no match for the place name.
    #[error("no geocoding results for {0:?}")]
    NoResults(String),
}

/// Connection settings for the MapTiler API.
#[derive(Debug, Clone)]
pub struct MapTilerConfig {
    /// API base URL, e.g. `https://api.maptiler.com`.
    pub api_url: String,

    /// API key appended to every request.
    pub api_key: String,

    /// Identifier of the map style to render.
    pub map_id: String,

    /// Framing zoom encoded in map view URLs.
    pub zoom: f64,

    /// Map rotation in degrees encoded in map view URLs.
    pub rotation: f64,
}

impl MapTilerConfig {
    /// Creates a config with the default framing zoom and no rotation.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        map_id: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            map_id: map_id.into(),
            zoom: DEFAULT_MAP_ZOOM,
            rotation: 0.0,
        }
    }

    /// Sets the framing zoom.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }
}

/// Resolved map data for a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    /// Canonical place name reported by the geocoder.
    pub place_name: String,

    /// Bounding box of the place.
    pub bounds: BoundingBox,

    /// Representative center coordinate.
    pub center: GeoPoint,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    features: Vec<GeocodingFeature>,
}

#[derive(Deserialize)]
struct GeocodingFeature {
    place_name: String,
    /// `[west, south, east, north]` in degrees.
    bbox: [f64; 4],
    /// `[lng, lat]` in degrees.
    center: [f64; 2],
}

/// Client for the MapTiler geocoding and maps endpoints.
pub struct MapTilerClient<C: HttpClient> {
    client: C,
    config: MapTilerConfig,
}

impl<C: HttpClient> MapTilerClient<C> {
    /// Creates a client over the given HTTP transport.
    pub fn new(client: C, config: MapTilerConfig) -> Self {
        Self { client, config }
    }

    /// URL of the map view centred on the given coordinate.
    ///
    /// The fragment carries `#zoom/lat/lng/rotation`, the format the
    /// provider's web viewer reads for framing.
    pub fn map_url(&self, point: &GeoPoint) -> String {
        format!(
            "{}/maps/{}/?key={}#{}/{}/{}/{}",
            self.config.api_url,
            self.config.map_id,
            self.config.api_key,
            self.config.zoom,
            point.lat(),
            point.lng(),
            self.config.rotation
        )
    }

    fn geocoding_url(&self, place: &str) -> String {
        // The geocoding endpoint wants '+' separators in the place name.
        let place = place.trim().replace(' ', "+");
        format!(
            "{}/geocoding/{}.json?key={}",
            self.config.api_url, place, self.config.api_key
        )
    }

    /// Resolves a place name to its bounding box, canonical name and center.
    ///
    /// Uses the first (best) feature of the geocoding response, matching the
    /// provider's relevance ordering.
    pub async fn map_data(&self, place: &str) -> Result<MapData, GeocodeError> {
        let url = self.geocoding_url(place);
        debug!(place, "geocoding destination");

        let body = self.client.get(&url).await?;
        let response: GeocodingResponse = serde_json::from_slice(&body)
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let feature = response
            .features
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoResults(place.to_string()))?;

        let [west, south, east, north] = feature.bbox;
        let sw = GeoPoint::new(south, west)
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
        let ne = GeoPoint::new(north, east)
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
        let bounds =
            BoundingBox::new(sw, ne).map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let center = GeoPoint::new(feature.center[1], feature.center[0])
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        debug!(
            place_name = %feature.place_name,
            "geocoding resolved"
        );

        Ok(MapData {
            place_name: feature.place_name,
            bounds,
            center,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MapTilerConfig {
        MapTilerConfig::new("https://api.example.com", "test-key", "streets")
    }

    fn client_with(response: Result<Vec<u8>, GeocodeError>) -> MapTilerClient<MockHttpClient> {
        MapTilerClient::new(MockHttpClient { response }, config())
    }

    const FIXTURE: &str = r#"{
        "features": [
            {
                "place_name": "Paris, France",
                "bbox": [2.224199, 48.815573, 2.469921, 48.902145],
                "center": [2.3522, 48.8566]
            },
            {
                "place_name": "Paris, Texas, United States",
                "bbox": [-95.6279, 33.6108, -95.4354, 33.7383],
                "center": [-95.5555, 33.6609]
            }
        ]
    }"#;

    #[test]
    fn test_map_url_format() {
        let client = client_with(Ok(Vec::new()));
        let point = GeoPoint::new(48.8566, 2.3522).unwrap();

        assert_eq!(
            client.map_url(&point),
            "https://api.example.com/maps/streets/?key=test-key#12.9/48.8566/2.3522/0"
        );
    }

    #[test]
    fn test_map_url_custom_zoom() {
        let client = MapTilerClient::new(
            MockHttpClient {
                response: Ok(Vec::new()),
            },
            config().with_zoom(15.0),
        );
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(client.map_url(&point).contains("#15/0/0/0"));
    }

    #[test]
    fn test_geocoding_url_encodes_spaces() {
        let client = client_with(Ok(Vec::new()));
        assert_eq!(
            client.geocoding_url("New York City"),
            "https://api.example.com/geocoding/New+York+City.json?key=test-key"
        );
    }

    #[tokio::test]
    async fn test_map_data_uses_first_feature() {
        let client = client_with(Ok(FIXTURE.as_bytes().to_vec()));

        let data = client.map_data("Paris").await.unwrap();
        assert_eq!(data.place_name, "Paris, France");

        // bbox is [west, south, east, north]; bounds are (SW, NE).
        assert_eq!(data.bounds.sw().lat(), 48.815573);
        assert_eq!(data.bounds.sw().lng(), 2.224199);
        assert_eq!(data.bounds.ne().lat(), 48.902145);
        assert_eq!(data.bounds.ne().lng(), 2.469921);

        // center is [lng, lat].
        assert_eq!(data.center.lat(), 48.8566);
        assert_eq!(data.center.lng(), 2.3522);
    }

    #[tokio::test]
    async fn test_map_data_no_results() {
        let client = client_with(Ok(br#"{"features": []}"#.to_vec()));
        let result = client.map_data("Nowhereville").await;
        assert_eq!(
            result,
            Err(GeocodeError::NoResults("Nowhereville".to_string()))
        );
    }

    #[tokio::test]
    async fn test_map_data_invalid_json() {
        let client = client_with(Ok(b"<html>not json</html>".to_vec()));
        assert!(matches!(
            client.map_data("Paris").await,
            Err(GeocodeError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_map_data_propagates_http_error() {
        let client = client_with(Err(GeocodeError::Http("HTTP 503".to_string())));
        assert_eq!(
            client.map_data("Paris").await,
            Err(GeocodeError::Http("HTTP 503".to_string()))
        );
    }

    #[tokio::test]
    async fn test_map_data_rejects_out_of_range_bbox() {
        let body = r#"{
            "features": [{
                "place_name": "Broken",
                "bbox": [0.0, -95.0, 1.0, 95.0],
                "center": [0.5, 0.5]
            }]
        }"#;
        let client = client_with(Ok(body.as_bytes().to_vec()));
        assert!(matches!(
            client.map_data("Broken").await,
            Err(GeocodeError::InvalidResponse(_))
        ));
    }
}
