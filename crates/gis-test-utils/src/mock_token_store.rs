//! In-memory shared token cache for gateway testing.
//!
//! Behaves like the Redis-backed store: entries expire after the TTL given
//! at write time. Reads and writes can be made to fail independently to
//! exercise the soft-failure paths of the token manager.
//!
//! # Example
//!
//! ```rust,ignore
//! use gis_test_utils::MockTokenStore;
//!
//! let store = MockTokenStore::new().with_token("madina_gis_token", "cached-token");
//! store.fail_writes(true);
//! ```

use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use common::token_manager::{TokenStore, TokenStoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Mock shared token store.
#[derive(Debug, Clone, Default)]
pub struct MockTokenStore {
    inner: Arc<MockTokenStoreInner>,
}

#[derive(Debug, Default)]
struct MockTokenStoreInner {
    entries: Mutex<HashMap<String, Entry>>,
    writes: Mutex<Vec<RecordedWrite>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// A `set` call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    /// Key written.
    pub key: String,
    /// Token value written.
    pub value: String,
    /// TTL requested.
    pub ttl: Duration,
}

impl MockTokenStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a token with no expiry.
    #[must_use]
    pub fn with_token(self, key: &str, value: &str) -> Self {
        self.inner.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        self
    }

    /// Seed a token that expires after `ttl`.
    #[must_use]
    pub fn with_expiring_token(self, key: &str, value: &str, ttl: Duration) -> Self {
        self.inner.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        self
    }

    /// Make every read fail as if the store were unreachable.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail as if the store were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current unexpired value under `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        let entries = self.inner.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    /// All successful writes, oldest first.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.inner.writes.lock().unwrap().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.inner.writes.lock().unwrap().len()
    }

    /// Number of read attempts (including failed ones).
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn get(&self, key: &str) -> Result<Option<SecretString>, TokenStoreError> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(TokenStoreError::Unavailable(
                "mock store read failure".to_string(),
            ));
        }

        let mut entries = self.inner.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Err(TokenStoreError::NotFound)
            }
            Some(entry) => Ok(Some(SecretString::from(entry.value.clone()))),
            None => Err(TokenStoreError::NotFound),
        }
    }

    async fn set(
        &self,
        key: &str,
        token: &SecretString,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(TokenStoreError::Unavailable(
                "mock store write failure".to_string(),
            ));
        }

        let value = token.expose_secret().to_string();
        self.inner.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        self.inner.writes.lock().unwrap().push(RecordedWrite {
            key: key.to_string(),
            value,
            ttl,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let store = MockTokenStore::new();
        let result = store.get("madina_gis_token").await;
        assert_eq!(result.unwrap_err(), TokenStoreError::NotFound);
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MockTokenStore::new();
        store
            .set(
                "madina_gis_token",
                &SecretString::from("abc"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let token = store.get("madina_gis_token").await.unwrap().unwrap();
        assert_eq!(token.expose_secret(), "abc");
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.writes()[0].ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MockTokenStore::new().with_expiring_token(
            "madina_gis_token",
            "short",
            Duration::from_millis(20),
        );
        assert_eq!(store.value("madina_gis_token").as_deref(), Some("short"));

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.value("madina_gis_token").is_none());
        assert_eq!(
            store.get("madina_gis_token").await.unwrap_err(),
            TokenStoreError::NotFound
        );
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MockTokenStore::new().with_token("k", "v");

        store.fail_reads(true);
        assert!(matches!(
            store.get("k").await,
            Err(TokenStoreError::Unavailable(_))
        ));

        store.fail_writes(true);
        let result = store
            .set("k", &SecretString::from("w"), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(TokenStoreError::Unavailable(_))));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.value("k").as_deref(), Some("v"));
    }
}
