//! GIS portal token manager.
//!
//! Supplies a bearer token for every outbound call to the GIS platform while
//! keeping token issuance to a minimum.
//!
//! # Features
//!
//! - Shared token cache behind the [`TokenStore`] trait (Redis in production)
//! - Single-flight renewal: one `tokio::sync::Mutex` spans the cache read and
//!   the issuance call, so concurrent callers on an empty cache produce
//!   exactly one request to the token endpoint
//! - Renewal runs on its own task; a caller whose request is cancelled while
//!   waiting does not abort a renewal that other callers are waiting on
//! - Cache failures are soft: reads fall through to renewal, writes are
//!   logged and the fresh token is still returned
//!
//! # Example
//!
//! ```rust,ignore
//! use common::secret::{ExposeSecret, SecretString};
//! use common::token_manager::{Credentials, TokenManager, TokenManagerConfig};
//!
//! let config = TokenManagerConfig::new(
//!     "https://geomed.amana-md.gov.sa/portal/sharing/rest/generateToken".to_string(),
//!     Credentials::new("gis-user".to_string(), SecretString::from("pw"), "10.0.0.1".to_string()),
//! );
//! let manager = TokenManager::new(config, redis_store)?;
//!
//! let token = manager.acquire().await?;
//! let header = format!("Bearer {}", token.expose_secret());
//! ```
//!
//! # Security
//!
//! - The account password and issued tokens are `SecretString` (never logged)
//! - Issuance and cache events are logged without values
//! - HTTP timeouts prevent hanging connections

use crate::secret::{ExposeSecret, SecretString};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Lifetime requested from the token endpoint (60 minutes).
pub const DEFAULT_TOKEN_EXPIRATION: Duration = Duration::from_secs(60 * 60);

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Key under which the current token is shared.
pub const DEFAULT_CACHE_KEY: &str = "madina_gis_token";

/// Referer sent with issuance requests.
pub const DEFAULT_REFERER: &str = "https://www.arcgis.com";

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while acquiring a token.
#[derive(Error, Debug, Clone)]
pub enum TokenError {
    /// The token endpoint could not be reached.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// The token endpoint answered without a usable token.
    #[error("Token issuance failed: {0}")]
    IssuanceFailed(String),

    /// The token endpoint answered with a body that is not valid JSON.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The renewal task panicked or was aborted.
    #[error("Token renewal task failed: {0}")]
    TaskFailed(String),
}

/// Errors reported by a [`TokenStore`].
///
/// `NotFound` is a miss, same as `Ok(None)`. Everything else means the
/// store could not be consulted and is treated as a soft failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenStoreError {
    /// The key is absent or expired.
    #[error("Token not found in store")]
    NotFound,

    /// The store could not be reached or timed out.
    #[error("Token store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Shared Token Store
// =============================================================================

/// Key/value store with per-key expiry, shared across gateway instances.
///
/// The store is a cache, not the source of truth; implementations must be
/// safe for concurrent use without external locking.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the token stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStoreError>;

    /// Store `token` under `key`, expiring after `ttl`.
    async fn set(
        &self,
        key: &str,
        token: &SecretString,
        ttl: Duration,
    ) -> Result<(), TokenStoreError>;
}

// =============================================================================
// Configuration
// =============================================================================

/// GIS account credentials, fixed for the process lifetime.
#[derive(Clone)]
pub struct Credentials {
    /// Portal username.
    pub username: String,

    /// Portal password.
    pub password: SecretString,

    /// Address the token is bound to (sent as both `client` and `ip`).
    pub client_ip: String,
}

impl Credentials {
    /// Create a new set of credentials.
    #[must_use]
    pub fn new(username: String, password: SecretString, client_ip: String) -> Self {
        Self {
            username,
            password,
            client_ip,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_ip", &self.client_ip)
            .finish()
    }
}

/// Configuration for the token manager.
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// Token issuance endpoint (`.../sharing/rest/generateToken`).
    pub token_endpoint: String,

    /// Account used for issuance.
    pub credentials: Credentials,

    /// Referer sent with issuance requests.
    pub referer: String,

    /// Lifetime requested for each token; also the upper bound of the cache TTL.
    pub expiration: Duration,

    /// HTTP request timeout.
    pub http_timeout: Duration,

    /// Key under which the token is shared.
    pub cache_key: String,
}

impl TokenManagerConfig {
    /// Create a new configuration with default expiration, timeout and cache key.
    #[must_use]
    pub fn new(token_endpoint: String, credentials: Credentials) -> Self {
        Self {
            token_endpoint,
            credentials,
            referer: DEFAULT_REFERER.to_string(),
            expiration: DEFAULT_TOKEN_EXPIRATION,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_key: DEFAULT_CACHE_KEY.to_string(),
        }
    }

    /// Set the referer.
    #[must_use]
    pub fn with_referer(mut self, referer: String) -> Self {
        self.referer = referer;
        self
    }

    /// Set the requested token lifetime.
    #[must_use]
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set the cache key.
    #[must_use]
    pub fn with_cache_key(mut self, key: String) -> Self {
        self.cache_key = key;
        self
    }

    /// Requested lifetime in whole minutes, as the token endpoint expects.
    fn expiration_minutes(&self) -> u64 {
        (self.expiration.as_secs() / 60).max(1)
    }
}

// =============================================================================
// Issuance Response Types
// =============================================================================

/// Token issuance response from the GIS portal.
///
/// Success carries `token` (and usually `expires`, epoch milliseconds).
/// Failure is reported in-band as `{"error": {"code": .., "message": ..}}`,
/// frequently with HTTP 200.
#[derive(Deserialize)]
struct TokenIssuanceResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires: Option<i64>,
    #[serde(default)]
    error: Option<PortalError>,
}

#[derive(Debug, Deserialize)]
struct PortalError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

impl std::fmt::Debug for TokenIssuanceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuanceResponse")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("expires", &self.expires)
            .field("error", &self.error)
            .finish()
    }
}

/// A freshly issued token and the instant it stops being usable.
struct IssuedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Lifetime of a fresh token: the requested window, clamped to the expiry
/// the portal reports when that expiry is still ahead of the local clock.
///
/// An expiry at or behind the local clock means the clocks disagree, not
/// that the token is unusable, so the requested window applies.
fn effective_lifetime(
    window: Duration,
    upstream_expires_ms: Option<i64>,
    now_ms: i64,
) -> Duration {
    let Some(expires_ms) = upstream_expires_ms else {
        return window;
    };

    let remaining_ms = u64::try_from(expires_ms.saturating_sub(now_ms)).unwrap_or(0);
    if remaining_ms == 0 {
        warn!(
            target: "common.token_manager",
            expires_ms,
            now_ms,
            "Portal reports token expiry in the past, using requested lifetime"
        );
        return window;
    }

    window.min(Duration::from_millis(remaining_ms))
}

// =============================================================================
// Token Manager
// =============================================================================

/// Supplies valid GIS bearer tokens to concurrent callers.
///
/// Cheap to clone; all clones share the renewal lock, the HTTP client and the
/// store handle.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: TokenManagerConfig,
    http_client: reqwest::Client,
    store: Arc<dyn TokenStore>,
    /// Held across the cache read and any renewal.
    renewal_lock: Mutex<()>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a token manager over the given shared store.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: TokenManagerConfig, store: Arc<dyn TokenStore>) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TokenError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                http_client,
                store,
                renewal_lock: Mutex::new(()),
            }),
        })
    }

    /// Return a currently valid token, renewing it if the shared cache is empty.
    ///
    /// At most one renewal is in flight per process. Callers arriving during a
    /// renewal wait for it and then read the token it cached.
    ///
    /// # Errors
    ///
    /// - `TokenError::HttpError` - the token endpoint is unreachable
    /// - `TokenError::IssuanceFailed` / `TokenError::InvalidResponse` - no usable token
    /// - `TokenError::TaskFailed` - the renewal task died
    #[instrument(skip_all)]
    pub async fn acquire(&self) -> Result<SecretString, TokenError> {
        let inner = Arc::clone(&self.inner);

        // Detached so that dropping this future does not cancel a renewal.
        tokio::spawn(async move { inner.acquire_or_renew().await })
            .await
            .map_err(|e| TokenError::TaskFailed(e.to_string()))?
    }
}

impl Inner {
    async fn acquire_or_renew(&self) -> Result<SecretString, TokenError> {
        let _guard = self.renewal_lock.lock().await;
        let key = self.config.cache_key.as_str();

        match self.store.get(key).await {
            Ok(Some(token)) if !token.expose_secret().is_empty() => {
                debug!(target: "common.token_manager", "Using cached GIS token");
                return Ok(token);
            }
            Ok(_) | Err(TokenStoreError::NotFound) => {
                debug!(target: "common.token_manager", "No cached GIS token");
            }
            Err(e) => {
                warn!(
                    target: "common.token_manager",
                    error = %e,
                    "Token store read failed, renewing"
                );
            }
        }

        let issued = self.issue_token().await?;

        let ttl = issued.expires_at.saturating_duration_since(Instant::now());
        if ttl.is_zero() {
            warn!(
                target: "common.token_manager",
                "Token lifetime elapsed before caching, not sharing it"
            );
        } else if let Err(e) = self.store.set(key, &issued.token, ttl).await {
            warn!(
                target: "common.token_manager",
                error = %e,
                "Failed to cache GIS token"
            );
        }

        info!(
            target: "common.token_manager",
            ttl_secs = ttl.as_secs(),
            "GIS token renewed"
        );

        Ok(issued.token)
    }

    /// Request a new token from the portal.
    #[instrument(skip_all)]
    async fn issue_token(&self) -> Result<IssuedToken, TokenError> {
        let config = &self.config;
        let credentials = &config.credentials;
        let expiration = config.expiration_minutes().to_string();

        debug!(
            target: "common.token_manager",
            username = %credentials.username,
            url = %config.token_endpoint,
            "Requesting token from GIS portal"
        );

        let form_body = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
            ("client", credentials.client_ip.as_str()),
            ("ip", credentials.client_ip.as_str()),
            ("expiration", expiration.as_str()),
            ("f", "json"),
            ("referer", config.referer.as_str()),
        ];

        let response = self
            .http_client
            .post(&config.token_endpoint)
            .form(&form_body)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "common.token_manager", error = %e, "HTTP request failed");
                TokenError::HttpError(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            debug!(target: "common.token_manager", error = %e, "Failed to read token response");
            TokenError::HttpError(e.to_string())
        })?;

        let parsed: TokenIssuanceResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(
                target: "common.token_manager",
                status = %status,
                error = %e,
                "Failed to parse token response"
            );
            TokenError::InvalidResponse(e.to_string())
        })?;

        trace!(target: "common.token_manager", response = ?parsed, "Token response");

        let token = match parsed.token {
            Some(token) if !token.is_empty() => SecretString::from(token),
            _ => {
                let reason = match parsed.error {
                    Some(PortalError {
                        code,
                        message: Some(message),
                    }) => match code {
                        Some(code) => format!("portal error {code}: {message}"),
                        None => format!("portal error: {message}"),
                    },
                    _ => format!("no token in response (status {status})"),
                };
                warn!(
                    target: "common.token_manager",
                    status = %status,
                    reason = %reason,
                    "GIS portal did not issue a token"
                );
                return Err(TokenError::IssuanceFailed(reason));
            }
        };

        let lifetime = effective_lifetime(
            config.expiration,
            parsed.expires,
            chrono::Utc::now().timestamp_millis(),
        );

        Ok(IssuedToken {
            token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
