//! GIS gateway configuration.
//!
//! Configuration is loaded from environment variables (a `.env` file, if
//! present, is applied by `main` first). All sensitive fields are redacted
//! in Debug output.

use crate::redis::DEFAULT_OP_TIMEOUT;
use common::secret::{ExposeSecret, SecretString};
use common::token_manager::{Credentials, TokenManagerConfig, DEFAULT_HTTP_TIMEOUT, DEFAULT_REFERER};
use reqwest::Url;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default gRPC port.
pub const DEFAULT_GRPC_PORT: u16 = 50051;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default Redis address.
pub const DEFAULT_REDIS_ADDR: &str = "127.0.0.1:6379";

/// Default portal token issuance endpoint.
pub const DEFAULT_TOKEN_URL: &str =
    "https://geomed.amana-md.gov.sa/portal/sharing/rest/generateToken";

/// Default ArcGIS REST services root.
pub const DEFAULT_MAP_SERVER_URL: &str = "https://geomed.amana-md.gov.sa/arcgis/rest/services";

/// Default location web service root.
pub const DEFAULT_LOCATION_SERVICE_URL: &str =
    "https://investment.amana-md.gov.sa/LocationWebService";

/// GIS gateway configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Portal account username.
    pub gis_username: String,

    /// Portal account password.
    pub gis_password: SecretString,

    /// Address issued tokens are bound to.
    pub gis_client_ip: String,

    /// Redis connection URL built from `REDIS_ADDR`/`REDIS_PASS`.
    /// Protected by `SecretString` because it embeds the password.
    pub redis_url: SecretString,

    /// Bound on a single Redis command (default: 2s).
    pub redis_op_timeout: Duration,

    /// gRPC server bind address (default: "0.0.0.0:50051").
    pub grpc_bind_address: String,

    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Portal token issuance endpoint.
    pub token_url: String,

    /// ArcGIS REST services root (no trailing slash).
    pub map_server_url: String,

    /// Location web service root (no trailing slash).
    pub location_service_url: String,

    /// Referer sent with token requests.
    pub token_referer: String,

    /// Timeout for every outbound HTTP call.
    pub http_timeout: Duration,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gis_username", &self.gis_username)
            .field("gis_password", &"[REDACTED]")
            .field("gis_client_ip", &self.gis_client_ip)
            .field("redis_url", &"[REDACTED]")
            .field("redis_op_timeout", &self.redis_op_timeout)
            .field("grpc_bind_address", &self.grpc_bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field("token_url", &self.token_url)
            .field("map_server_url", &self.map_server_url)
            .field("location_service_url", &self.location_service_url)
            .field("token_referer", &self.token_referer)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let gis_username = required(vars, "GIS_USERNAME")?;
        let gis_password = SecretString::from(required(vars, "GIS_PASSWORD")?);
        let gis_client_ip = required(vars, "GIS_CLIENT_IP")?;

        let redis_addr = vars
            .get("REDIS_ADDR")
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_ADDR.to_string());
        let redis_pass = vars.get("REDIS_PASS").cloned().unwrap_or_default();
        let redis_url = build_redis_url(&redis_addr, &redis_pass)?;

        let redis_op_timeout = match vars.get("REDIS_OP_TIMEOUT_MS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(ConfigError::InvalidValue(format!(
                        "REDIS_OP_TIMEOUT_MS must be a positive integer, got {raw:?}"
                    )))
                }
            },
            None => DEFAULT_OP_TIMEOUT,
        };

        let grpc_port = match vars.get("PORT").filter(|s| !s.is_empty()) {
            Some(port) => parse_port(port)?,
            None => DEFAULT_GRPC_PORT,
        };
        let grpc_bind_address = format!("0.0.0.0:{grpc_port}");

        let health_bind_address = vars
            .get("GIS_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let token_url = base_url(vars, "GIS_TOKEN_URL", DEFAULT_TOKEN_URL)?;
        let map_server_url = base_url(vars, "GIS_MAP_SERVER_URL", DEFAULT_MAP_SERVER_URL)?;
        let location_service_url = base_url(
            vars,
            "GIS_LOCATION_SERVICE_URL",
            DEFAULT_LOCATION_SERVICE_URL,
        )?;

        let token_referer = vars
            .get("GIS_TOKEN_REFERER")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REFERER.to_string());

        let http_timeout = match vars.get("GIS_HTTP_TIMEOUT_SECONDS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e| {
                    ConfigError::InvalidValue(format!(
                        "GIS_HTTP_TIMEOUT_SECONDS must be a positive integer: {e}"
                    ))
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "GIS_HTTP_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Config {
            gis_username,
            gis_password,
            gis_client_ip,
            redis_url,
            redis_op_timeout,
            grpc_bind_address,
            health_bind_address,
            token_url,
            map_server_url,
            location_service_url,
            token_referer,
            http_timeout,
        })
    }

    /// Token manager settings derived from this configuration.
    #[must_use]
    pub fn token_manager_config(&self) -> TokenManagerConfig {
        TokenManagerConfig::new(
            self.token_url.clone(),
            Credentials::new(
                self.gis_username.clone(),
                self.gis_password.clone(),
                self.gis_client_ip.clone(),
            ),
        )
        .with_referer(self.token_referer.clone())
        .with_http_timeout(self.http_timeout)
    }

    /// Redis URL with the password (if any) exposed, for opening the client.
    #[must_use]
    pub fn expose_redis_url(&self) -> &str {
        self.redis_url.expose_secret()
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|s| !s.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Accepts `50051` as well as the `:50051` listen-address form.
fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    let digits = raw.strip_prefix(':').unwrap_or(raw);
    match digits.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue(format!(
            "PORT must be a port number, got {raw:?}"
        ))),
    }
}

fn base_url(
    vars: &HashMap<String, String>,
    name: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let raw = vars
        .get(name)
        .filter(|s| !s.is_empty())
        .map_or(default, String::as_str);

    Url::parse(raw)
        .map_err(|e| ConfigError::InvalidValue(format!("{name} is not a valid URL: {e}")))?;

    Ok(raw.trim_end_matches('/').to_string())
}

fn build_redis_url(addr: &str, password: &str) -> Result<SecretString, ConfigError> {
    let mut url = Url::parse(&format!("redis://{addr}/0"))
        .map_err(|e| ConfigError::InvalidValue(format!("REDIS_ADDR is invalid: {e}")))?;

    if !password.is_empty() {
        url.set_password(Some(password))
            .map_err(|()| ConfigError::InvalidValue("REDIS_ADDR has no host".to_string()))?;
    }

    Ok(SecretString::from(url.to_string()))
}
