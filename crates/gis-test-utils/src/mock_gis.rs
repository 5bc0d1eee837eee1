//! Fake GIS platform for gateway testing.
//!
//! A single `wiremock` server stands in for all three upstream hosts: the
//! portal token endpoint, the ArcGIS map services and the location web
//! service. Paths mirror production so the gateway's URL construction is
//! exercised unchanged; only the base URLs differ.
//!
//! # Example
//!
//! ```rust,ignore
//! use gis_test_utils::{MockGisUpstream, SATELLITE_PATH};
//!
//! let upstream = MockGisUpstream::start().await;
//! upstream.mount_token("token-1", 1).await;
//! upstream
//!     .mount_json(SATELLITE_PATH, "token-1", serde_json::json!({"name": "Madinah2020T"}))
//!     .await;
//! ```

use serde_json::Value;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Portal token issuance path.
pub const TOKEN_PATH: &str = "/portal/sharing/rest/generateToken";

/// Point lookup on the location web service.
pub const LOCATION_PATH: &str = "/LocationWebService/home/getLocationInfo";

/// Parcel/street layer query.
pub const PARCEL_PATH: &str =
    "/arcgis/rest/services/AppVisualDistortion/VisualDistortion/MapServer/1/query";

/// Satellite imagery map server metadata.
pub const SATELLITE_PATH: &str = "/arcgis/rest/services/Hosted/Madinah2020T/MapServer";

/// Geometry service reprojection.
pub const PROJECT_PATH: &str = "/arcgis/rest/services/Utilities/Geometry/GeometryServer/project";

/// Fake GIS upstream backed by a local HTTP server.
pub struct MockGisUpstream {
    server: MockServer,
}

impl MockGisUpstream {
    /// Start a fake upstream on an ephemeral port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Underlying mock server, for custom expectations.
    #[must_use]
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Token issuance endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.server.uri())
    }

    /// Base URL of the ArcGIS REST services.
    #[must_use]
    pub fn map_server_url(&self) -> String {
        format!("{}/arcgis/rest/services", self.server.uri())
    }

    /// Base URL of the location web service.
    #[must_use]
    pub fn location_service_url(&self) -> String {
        format!("{}/LocationWebService", self.server.uri())
    }

    /// Issue `token` and expect exactly `expected_calls` issuance requests.
    pub async fn mount_token(&self, token: &str, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "token": token,
                    "ssl": true
                })),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Answer issuance requests with an arbitrary response.
    pub async fn mount_token_response(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Answer GETs on `route` carrying `Bearer <token>` with `body`.
    pub async fn mount_json(&self, route: &str, token: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("Authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer GETs on `route` with an arbitrary response.
    pub async fn mount_response(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Number of issuance requests received so far.
    pub async fn token_request_count(&self) -> usize {
        self.requests_to(TOKEN_PATH).await.len()
    }

    /// Requests received on `route` so far.
    pub async fn requests_to(&self, route: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == route)
            .collect()
    }
}
