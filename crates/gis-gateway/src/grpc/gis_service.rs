//! gRPC service for Madinah GIS lookups.
//!
//! Implements `MadinaGisService` from gis.proto. Each RPC maps to one
//! upstream query; map-shaped answers are flattened to `map<string, string>`.
//!
//! # Validation
//!
//! - Location and parcel coordinates are forwarded as given
//! - UTM coordinates must be finite decimal numbers; they are embedded in a
//!   JSON geometry and rejected before any network call otherwise

use crate::errors::GisError;
use crate::services::coercion::to_string_map;
use crate::services::{GisClient, GisEndpoints, JsonObject};
use common::secret::ExposeSecret;
use proto_gen::gis::{
    madina_gis_service_server::MadinaGisService, Empty, LatLonResponse, LocationRequest,
    LocationResponse, ParcelStreetResponse, SatelliteResponse, UtmRequest,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tonic::{Request, Response, Status};
use tracing::{instrument, warn};

/// Reprojection result from the geometry service.
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    geometries: Vec<ProjectedPoint>,
}

#[derive(Debug, Deserialize)]
struct ProjectedPoint {
    x: f64,
    y: f64,
}

/// A point in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// gRPC service proxying lookups to the GIS platform.
#[derive(Clone)]
pub struct GisService {
    client: GisClient,
    endpoints: GisEndpoints,
}

impl GisService {
    /// Create a new GIS service.
    #[must_use]
    pub fn new(client: GisClient, endpoints: GisEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Location details for a point.
    pub async fn location_info(
        &self,
        longitude: &str,
        latitude: &str,
    ) -> Result<HashMap<String, String>, GisError> {
        let url = self.endpoints.location_info(longitude, latitude)?;
        let object = self.client.fetch(&url).await?;
        Ok(to_string_map(&object))
    }

    /// Parcel and street attributes intersecting a point.
    pub async fn parcel_street_data(
        &self,
        longitude: &str,
        latitude: &str,
    ) -> Result<HashMap<String, String>, GisError> {
        let url = self.endpoints.parcel_query(longitude, latitude)?;
        let object = self.client.fetch(&url).await?;
        Ok(to_string_map(&object))
    }

    /// Satellite imagery map server metadata.
    pub async fn satellite_view_data(&self) -> Result<HashMap<String, String>, GisError> {
        let url = self.endpoints.satellite()?;
        let object = self.client.fetch(&url).await?;
        Ok(to_string_map(&object))
    }

    /// Reproject a UTM zone 37N point to WGS 84.
    ///
    /// The geometry service answers with `x` as the first coordinate; it is
    /// returned as latitude and `y` as longitude.
    pub async fn convert_utm(&self, x: &str, y: &str) -> Result<LatLon, GisError> {
        if x.trim().is_empty() || y.trim().is_empty() {
            return Err(GisError::InvalidInput(
                "x and y coordinates are required".to_string(),
            ));
        }
        let x = parse_coordinate("x", x)?;
        let y = parse_coordinate("y", y)?;

        let token = self.client.token_manager().acquire().await?;
        let url = self.endpoints.project(x, y, token.expose_secret())?;
        let object = self.client.fetch_with_token(&url, &token).await?;

        first_projected_point(object)
    }
}

/// Parse a UTM coordinate that must be a finite decimal number.
fn parse_coordinate(name: &str, value: &str) -> Result<f64, GisError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GisError::InvalidInput(format!("{name} must be a decimal number")))
}

fn first_projected_point(object: JsonObject) -> Result<LatLon, GisError> {
    let response: ProjectResponse = serde_json::from_value(Value::Object(object))
        .map_err(|e| GisError::ResponseShape(format!("invalid geometries: {e}")))?;

    let point = response
        .geometries
        .first()
        .ok_or_else(|| GisError::ResponseShape("geometries array is empty".to_string()))?;

    Ok(LatLon {
        latitude: point.x,
        longitude: point.y,
    })
}

fn log_failure(rpc: &str, err: &GisError) {
    warn!(
        target: "gis.grpc.gis_service",
        rpc = rpc,
        code = ?err.code(),
        error = %err,
        "GIS request failed"
    );
}

#[tonic::async_trait]
impl MadinaGisService for GisService {
    #[instrument(skip_all, fields(longitude = %request.get_ref().longitude, latitude = %request.get_ref().latitude))]
    async fn get_location_info(
        &self,
        request: Request<LocationRequest>,
    ) -> Result<Response<LocationResponse>, Status> {
        let req = request.into_inner();

        match self.location_info(&req.longitude, &req.latitude).await {
            Ok(data) => Ok(Response::new(LocationResponse { data })),
            Err(e) => {
                log_failure("GetLocationInfo", &e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip_all, fields(longitude = %request.get_ref().longitude, latitude = %request.get_ref().latitude))]
    async fn get_parcel_street_data(
        &self,
        request: Request<LocationRequest>,
    ) -> Result<Response<ParcelStreetResponse>, Status> {
        let req = request.into_inner();

        match self.parcel_street_data(&req.longitude, &req.latitude).await {
            Ok(data) => Ok(Response::new(ParcelStreetResponse { data })),
            Err(e) => {
                log_failure("GetParcelStreetData", &e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip_all)]
    async fn get_satellite_view_data(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<SatelliteResponse>, Status> {
        match self.satellite_view_data().await {
            Ok(data) => Ok(Response::new(SatelliteResponse { data })),
            Err(e) => {
                log_failure("GetSatelliteViewData", &e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip_all, fields(x = %request.get_ref().x, y = %request.get_ref().y))]
    async fn convert_utm_to_lat_lon(
        &self,
        request: Request<UtmRequest>,
    ) -> Result<Response<LatLonResponse>, Status> {
        let req = request.into_inner();

        match self.convert_utm(&req.x, &req.y).await {
            Ok(point) => Ok(Response::new(LatLonResponse {
                latitude: point.latitude,
                longitude: point.longitude,
            })),
            Err(e) => {
                log_failure("ConvertUTMToLatLon", &e);
                Err(e.into())
            }
        }
    }
}
