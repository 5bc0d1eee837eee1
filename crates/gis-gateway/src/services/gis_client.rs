//! Authenticated HTTP client for the GIS query endpoints.
//!
//! Every call carries `Authorization: Bearer <token>`. The body is parsed as
//! a JSON object whatever the status code; the platform reports many
//! failures as 200 responses with an `error` member, and those reach the
//! caller as ordinary data.
//!
//! # Security
//!
//! - Token values are never logged
//! - Only the URL path is logged; the query of a reprojection call embeds the token

use crate::errors::GisError;
use common::secret::{ExposeSecret, SecretString};
use common::token_manager::TokenManager;
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Upper bound on establishing a connection to an upstream host.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level JSON object returned by a GIS endpoint.
pub type JsonObject = Map<String, Value>;

/// HTTP client for the GIS map and location services.
#[derive(Clone)]
pub struct GisClient {
    http: Client,
    tokens: TokenManager,
}

impl GisClient {
    /// Create a client that authenticates with tokens from `tokens`.
    ///
    /// # Errors
    ///
    /// Returns `GisError::Internal` if the HTTP client cannot be built.
    pub fn new(tokens: TokenManager, timeout: Duration) -> Result<Self, GisError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| {
                error!(target: "gis.services.gis_client", error = %e, "Failed to build HTTP client");
                GisError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, tokens })
    }

    /// Token manager backing this client.
    #[must_use]
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Acquire a token and GET `url`.
    ///
    /// # Errors
    ///
    /// - `GisError::TokenIssuance` if no token could be obtained
    /// - see [`GisClient::fetch_with_token`]
    pub async fn fetch(&self, url: &Url) -> Result<JsonObject, GisError> {
        let token = self.tokens.acquire().await?;
        self.fetch_with_token(url, &token).await
    }

    /// GET `url` with an already acquired token.
    ///
    /// # Errors
    ///
    /// - `GisError::UpstreamTransport` if the request or body read fails
    /// - `GisError::ResponseParse` if the body is not a JSON object
    #[instrument(skip_all, fields(path = %url.path()))]
    pub async fn fetch_with_token(
        &self,
        url: &Url,
        token: &SecretString,
    ) -> Result<JsonObject, GisError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                // Strip the URL from the error: its query may hold the token.
                let e = e.without_url();
                warn!(target: "gis.services.gis_client", error = %e, "GIS request failed");
                GisError::UpstreamTransport(format!("GIS request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target: "gis.services.gis_client",
                status = %status,
                "GIS endpoint returned non-success status"
            );
        }

        let body = response.bytes().await.map_err(|e| {
            let e = e.without_url();
            warn!(
                target: "gis.services.gis_client",
                error = %e,
                "Failed to read GIS response body"
            );
            GisError::UpstreamTransport(format!("Failed to read GIS response body: {e}"))
        })?;

        let object = parse_object(&body)?;

        debug!(
            target: "gis.services.gis_client",
            status = %status,
            fields = object.len(),
            "GIS request completed"
        );

        Ok(object)
    }
}

/// Parse a response body that must be a JSON object.
fn parse_object(body: &[u8]) -> Result<JsonObject, GisError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => {
            warn!(
                target: "gis.services.gis_client",
                kind = json_kind(&other),
                "GIS response is not a JSON object"
            );
            Err(GisError::ResponseParse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
        Err(e) => {
            warn!(
                target: "gis.services.gis_client",
                error = %e,
                "GIS response is not valid JSON"
            );
            Err(GisError::ResponseParse(e.to_string()))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use common::token_manager::{Credentials, TokenManagerConfig, DEFAULT_CACHE_KEY};
    use gis_test_utils::{MockGisUpstream, MockTokenStore, SATELLITE_PATH};
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::ResponseTemplate;

    fn client_for(upstream: &MockGisUpstream, store: MockTokenStore) -> GisClient {
        let config = TokenManagerConfig::new(
            upstream.token_url(),
            Credentials::new(
                "gis-user".to_string(),
                SecretString::from("gis-pass"),
                "10.0.0.5".to_string(),
            ),
        );
        let tokens = TokenManager::new(config, Arc::new(store)).unwrap();
        GisClient::new(tokens, Duration::from_secs(5)).unwrap()
    }

    fn satellite_url(upstream: &MockGisUpstream) -> Url {
        Url::parse(&format!("{}{SATELLITE_PATH}?f=json", upstream.server().uri())).unwrap()
    }

    #[test]
    fn test_parse_object_accepts_object() {
        let object = parse_object(br#"{"a": 1, "b": "two"}"#).unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["a"], json!(1));
    }

    #[test]
    fn test_parse_object_rejects_non_object() {
        let bodies: [&[u8]; 4] = [b"[1,2]", b"\"text\"", b"42", b"null"];
        for body in bodies {
            assert!(matches!(
                parse_object(body),
                Err(GisError::ResponseParse(_))
            ));
        }
    }

    #[test]
    fn test_parse_object_rejects_invalid_json() {
        let result = parse_object(b"<html>Service Unavailable</html>");
        assert!(matches!(result, Err(GisError::ResponseParse(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_bearer_token() {
        let upstream = MockGisUpstream::start().await;
        upstream.mount_token("fresh-token", 1).await;
        upstream
            .mount_json(SATELLITE_PATH, "fresh-token", json!({"name": "Madinah2020T"}))
            .await;
        let client = client_for(&upstream, MockTokenStore::new());

        let object = client.fetch(&satellite_url(&upstream)).await.unwrap();

        assert_eq!(object["name"], json!("Madinah2020T"));
    }

    #[tokio::test]
    async fn test_fetch_uses_cached_token() {
        let upstream = MockGisUpstream::start().await;
        upstream.mount_token("unused", 0).await;
        upstream
            .mount_json(SATELLITE_PATH, "cached-token", json!({"ok": true}))
            .await;
        let store = MockTokenStore::new().with_token(DEFAULT_CACHE_KEY, "cached-token");
        let client = client_for(&upstream, store);

        let object = client.fetch(&satellite_url(&upstream)).await.unwrap();

        assert_eq!(object["ok"], json!(true));
        assert_eq!(upstream.token_request_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_success_status_body_is_still_parsed() {
        let upstream = MockGisUpstream::start().await;
        upstream
            .mount_response(
                SATELLITE_PATH,
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": {"code": 500, "message": "boom"}})),
            )
            .await;
        let client = client_for(&upstream, MockTokenStore::new());

        let object = client
            .fetch_with_token(&satellite_url(&upstream), &SecretString::from("t"))
            .await
            .unwrap();

        assert_eq!(object["error"]["message"], json!("boom"));
    }

    #[tokio::test]
    async fn test_array_body_is_parse_error() {
        let upstream = MockGisUpstream::start().await;
        upstream
            .mount_response(
                SATELLITE_PATH,
                ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])),
            )
            .await;
        let client = client_for(&upstream, MockTokenStore::new());

        let result = client
            .fetch_with_token(&satellite_url(&upstream), &SecretString::from("t"))
            .await;

        assert!(matches!(result, Err(GisError::ResponseParse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let upstream = MockGisUpstream::start().await;
        let client = client_for(&upstream, MockTokenStore::new());
        let url = Url::parse("http://127.0.0.1:1/arcgis/rest/services?token=secret").unwrap();

        let result = client
            .fetch_with_token(&url, &SecretString::from("secret"))
            .await;

        assert!(
            matches!(&result, Err(GisError::UpstreamTransport(msg)) if !msg.contains("secret")),
            "expected a transport error without the token, got {result:?}"
        );
    }

    #[tokio::test]
    async fn test_token_failure_skips_query() {
        let upstream = MockGisUpstream::start().await;
        upstream
            .mount_token_response(ResponseTemplate::new(200).set_body_json(json!({"ssl": true})))
            .await;
        let client = client_for(&upstream, MockTokenStore::new());

        let result = client.fetch(&satellite_url(&upstream)).await;

        assert!(matches!(result, Err(GisError::TokenIssuance(_))));
        assert!(upstream.requests_to(SATELLITE_PATH).await.is_empty());
    }
}
