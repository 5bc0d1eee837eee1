//! Upstream query URLs.
//!
//! Paths and fixed query parameters for each GIS lookup. Only the two base
//! URLs are configurable; query values are form-encoded.

use crate::errors::GisError;
use reqwest::Url;
use serde_json::json;

/// Projected coordinate system of incoming UTM points (WGS 84 / UTM zone 37N).
pub const UTM_WKID: u32 = 32637;

/// Geographic coordinate system of reprojected points (WGS 84).
pub const WGS84_WKID: u32 = 4326;

const LOCATION_INFO_PATH: &str = "home/getLocationInfo";
const PARCEL_QUERY_PATH: &str = "AppVisualDistortion/VisualDistortion/MapServer/1/query";
const SATELLITE_PATH: &str = "Hosted/Madinah2020T/MapServer";
const PROJECT_PATH: &str = "Utilities/Geometry/GeometryServer/project";

/// Builds upstream URLs from the configured base URLs.
#[derive(Debug, Clone)]
pub struct GisEndpoints {
    map_server_url: String,
    location_service_url: String,
}

impl GisEndpoints {
    /// Create endpoints rooted at the given base URLs (trailing slash optional).
    #[must_use]
    pub fn new(map_server_url: &str, location_service_url: &str) -> Self {
        Self {
            map_server_url: map_server_url.trim_end_matches('/').to_string(),
            location_service_url: location_service_url.trim_end_matches('/').to_string(),
        }
    }

    /// Point lookup on the location web service.
    pub fn location_info(&self, longitude: &str, latitude: &str) -> Result<Url, GisError> {
        build(
            &format!("{}/{LOCATION_INFO_PATH}", self.location_service_url),
            &[("longitude", longitude), ("latitude", latitude)],
        )
    }

    /// Parcel/street layer features intersecting a point.
    pub fn parcel_query(&self, longitude: &str, latitude: &str) -> Result<Url, GisError> {
        let geometry = format!("{longitude},{latitude}");
        build(
            &format!("{}/{PARCEL_QUERY_PATH}", self.map_server_url),
            &[
                ("where", "1=1"),
                ("geometry", geometry.as_str()),
                ("geometryType", "esriGeometryPoint"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("outFields", "*"),
                ("returnGeometry", "false"),
                ("f", "json"),
            ],
        )
    }

    /// Satellite imagery map server metadata.
    pub fn satellite(&self) -> Result<Url, GisError> {
        build(
            &format!("{}/{SATELLITE_PATH}", self.map_server_url),
            &[("f", "json")],
        )
    }

    /// Reprojection of one UTM point to WGS 84. The token travels as a query
    /// parameter here in addition to the bearer header.
    pub fn project(&self, x: f64, y: f64, token: &str) -> Result<Url, GisError> {
        let geometries = json!({
            "geometryType": "esriGeometryPoint",
            "geometries": [{"x": x, "y": y}]
        })
        .to_string();
        let in_sr = UTM_WKID.to_string();
        let out_sr = WGS84_WKID.to_string();

        build(
            &format!("{}/{PROJECT_PATH}", self.map_server_url),
            &[
                ("f", "json"),
                ("inSR", in_sr.as_str()),
                ("outSR", out_sr.as_str()),
                ("geometries", geometries.as_str()),
                ("token", token),
            ],
        )
    }
}

fn build(base: &str, params: &[(&str, &str)]) -> Result<Url, GisError> {
    Url::parse_with_params(base, params)
        .map_err(|e| GisError::Internal(format!("Invalid upstream URL: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn endpoints() -> GisEndpoints {
        GisEndpoints::new(
            "https://geomed.example/arcgis/rest/services",
            "https://investment.example/LocationWebService/",
        )
    }

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_location_info() {
        let url = endpoints().location_info("39.61", "24.47").unwrap();

        assert_eq!(url.path(), "/LocationWebService/home/getLocationInfo");
        let q = query(&url);
        assert_eq!(q["longitude"], "39.61");
        assert_eq!(q["latitude"], "24.47");
    }

    #[test]
    fn test_parcel_query() {
        let url = endpoints().parcel_query("39.61", "24.47").unwrap();

        assert_eq!(
            url.path(),
            "/arcgis/rest/services/AppVisualDistortion/VisualDistortion/MapServer/1/query"
        );
        let q = query(&url);
        assert_eq!(q["where"], "1=1");
        assert_eq!(q["geometry"], "39.61,24.47");
        assert_eq!(q["geometryType"], "esriGeometryPoint");
        assert_eq!(q["spatialRel"], "esriSpatialRelIntersects");
        assert_eq!(q["outFields"], "*");
        assert_eq!(q["returnGeometry"], "false");
        assert_eq!(q["f"], "json");
    }

    #[test]
    fn test_satellite() {
        let url = endpoints().satellite().unwrap();

        assert_eq!(
            url.path(),
            "/arcgis/rest/services/Hosted/Madinah2020T/MapServer"
        );
        assert_eq!(url.query(), Some("f=json"));
    }

    #[test]
    fn test_project() {
        let url = endpoints().project(500_000.5, 2_700_000.25, "tok").unwrap();

        assert_eq!(
            url.path(),
            "/arcgis/rest/services/Utilities/Geometry/GeometryServer/project"
        );
        let q = query(&url);
        assert_eq!(q["f"], "json");
        assert_eq!(q["inSR"], "32637");
        assert_eq!(q["outSR"], "4326");
        assert_eq!(q["token"], "tok");

        let geometries: serde_json::Value = serde_json::from_str(&q["geometries"]).unwrap();
        assert_eq!(geometries["geometryType"], "esriGeometryPoint");
        assert_eq!(geometries["geometries"][0]["x"], 500_000.5);
        assert_eq!(geometries["geometries"][0]["y"], 2_700_000.25);
    }

    #[test]
    fn test_invalid_base_is_internal_error() {
        let result = GisEndpoints::new("not a url", "also not").satellite();
        assert!(matches!(result, Err(GisError::Internal(_))));
    }
}
