//! Redis-backed shared token store.
//!
//! # Key Patterns
//!
//! - `madina_gis_token` - Current portal token (string, `PSETEX` with the
//!   token's remaining lifetime)
//!
//! # Connection Pattern
//!
//! The connection is opened lazily on the first command and kept in a shared
//! `OnceCell`. A failed attempt leaves the cell empty so the next command
//! tries again. Once established, the `ConnectionManager` reconnects on its
//! own after a drop. It is cheap to clone; every operation clones it instead
//! of sharing it behind a lock.
//!
//! # Failure Semantics
//!
//! Every command, including the connect that may precede it, is bounded by
//! an operation timeout. Timeouts, refused connections and Redis errors
//! surface as `TokenStoreError::Unavailable`, which the token manager treats
//! as a cache miss (reads) or a skipped write (writes). The gateway keeps
//! serving with Redis down; every call then renews at the portal.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = RedisTokenStore::new("redis://:secret@localhost:6379/0")?;
//! if let Err(e) = store.connect().await {
//!     warn!(error = %e, "Redis unavailable at startup");
//! }
//! let manager = TokenManager::new(config, Arc::new(store))?;
//! ```

use crate::errors::GisError;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::token_manager::{TokenStore, TokenStoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument, warn};

/// Upper bound on a single Redis command.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared token cache backed by Redis.
///
/// Cheaply cloneable; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisTokenStore {
    client: Client,
    connection: Arc<OnceCell<ConnectionManager>>,
    op_timeout: Duration,
}

impl RedisTokenStore {
    /// Create a store for the given Redis URL without connecting.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., `redis://:password@host:6379/0`)
    ///
    /// # Errors
    ///
    /// Returns `GisError::Redis` if the URL is invalid. An unreachable server
    /// is not an error here.
    pub fn new(redis_url: &str) -> Result<Self, GisError> {
        // Never log redis_url: it embeds the password.
        let client = Client::open(redis_url).map_err(|e| {
            error!(
                target: "gis.redis.client",
                error = %e,
                "Failed to open Redis client"
            );
            GisError::Redis(format!("Failed to open Redis client: {e}"))
        })?;

        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Override the per-command timeout.
    #[must_use]
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Establish the connection now instead of on the first command.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError::Unavailable` if Redis cannot be reached
    /// within the operation timeout. The store stays usable and retries on
    /// the next command.
    pub async fn connect(&self) -> Result<(), TokenStoreError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, TokenStoreError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection = tokio::time::timeout(
                    self.op_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| {
                    warn!(
                        target: "gis.redis.client",
                        timeout = ?self.op_timeout,
                        "Timed out connecting to Redis"
                    );
                    TokenStoreError::Unavailable("connect timed out".to_string())
                })?
                .map_err(|e| {
                    warn!(target: "gis.redis.client", error = %e, "Failed to connect to Redis");
                    TokenStoreError::Unavailable(format!("connect failed: {e}"))
                })?;

                debug!(target: "gis.redis.client", "Connected to Redis");
                Ok::<_, TokenStoreError>(connection)
            })
            .await?;

        Ok(connection.clone())
    }
}

/// TTL in whole milliseconds, never zero (`PSETEX` rejects 0).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStoreError> {
        let mut conn = self.connection().await?;

        let result = tokio::time::timeout(self.op_timeout, conn.get::<_, Option<String>>(key))
            .await
            .map_err(|_| {
                warn!(target: "gis.redis.client", "Redis GET timed out");
                TokenStoreError::Unavailable("GET timed out".to_string())
            })?
            .map_err(|e| {
                warn!(target: "gis.redis.client", error = %e, "Redis GET failed");
                TokenStoreError::Unavailable(format!("GET failed: {e}"))
            })?;

        match result {
            Some(value) => Ok(Some(SecretString::from(value))),
            None => Err(TokenStoreError::NotFound),
        }
    }

    #[instrument(skip_all, fields(key = %key, ttl_ms = ttl_millis(ttl)))]
    async fn set(
        &self,
        key: &str,
        token: &SecretString,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let mut conn = self.connection().await?;

        tokio::time::timeout(
            self.op_timeout,
            conn.pset_ex::<_, _, ()>(key, token.expose_secret(), ttl_millis(ttl)),
        )
        .await
        .map_err(|_| {
            warn!(target: "gis.redis.client", "Redis PSETEX timed out");
            TokenStoreError::Unavailable("PSETEX timed out".to_string())
        })?
        .map_err(|e| {
            warn!(target: "gis.redis.client", error = %e, "Redis PSETEX failed");
            TokenStoreError::Unavailable(format!("PSETEX failed: {e}"))
        })?;

        debug!(target: "gis.redis.client", "Stored token");
        Ok(())
    }
}
