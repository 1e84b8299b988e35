//! Paged search session store
//!
//! Maps an opaque session token to the live connection and continuation
//! cookie of one paged search. Entries expire on an absolute TTL measured from
//! the last write, or after an idle period without access, whichever comes
//! first. An expired entry is removed atomically and its connection is closed
//! by whoever removed it, so every connection is torn down exactly once.
//!
//! Teardown is owned by the caller that removes the entry: the entry leaves
//! the map first and its connection is disconnected right after.

use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::DirectoryConnection;

/// Session token length in bytes (128 bits).
const TOKEN_BYTES: usize = 16;

/// Opaque, unguessable handle correlating successive page requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh token from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for SessionToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Expiry policy for stored sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Absolute lifetime, restarted by every page written back.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Sliding expiry, restarted by every access.
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

fn default_ttl_secs() -> u64 {
    600
}

fn default_idle_secs() -> u64 {
    300
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            idle_secs: default_idle_secs(),
        }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

/// State of one paged search.
#[derive(Debug)]
pub struct SessionData<C> {
    pub connection: C,
    pub cookie: Vec<u8>,
    pub created_at: Instant,
    refreshed_at: Instant,
    last_access: Instant,
}

impl<C> SessionData<C> {
    fn new(connection: C, cookie: Vec<u8>, now: Instant) -> Self {
        Self {
            connection,
            cookie,
            created_at: now,
            refreshed_at: now,
            last_access: now,
        }
    }

    fn is_expired(&self, now: Instant, settings: &SessionSettings) -> bool {
        now.duration_since(self.refreshed_at) >= settings.ttl()
            || now.duration_since(self.last_access) >= settings.idle()
    }
}

/// Thread-safe TTL store of paged search sessions.
pub struct SessionStore<C: DirectoryConnection> {
    entries: DashMap<SessionToken, SessionData<C>>,
    settings: SessionSettings,
}

impl<C: DirectoryConnection> SessionStore<C> {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            entries: DashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Look up a live session, restarting its idle timer.
    ///
    /// Returns a handle to the session's connection and its cookie. An entry
    /// found expired is evicted and its connection closed.
    pub async fn get(&self, token: &str) -> Option<(C, Vec<u8>)> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(token)?;
            if !entry.is_expired(now, &self.settings) {
                entry.last_access = now;
                return Some((entry.connection.clone(), entry.cookie.clone()));
            }
        }

        self.evict_expired(token, now).await;
        None
    }

    /// Write back a session's connection and cookie, restarting both timers.
    pub fn store(&self, token: SessionToken, connection: C, cookie: Vec<u8>) {
        let now = Instant::now();
        self.entries
            .entry(token)
            .and_modify(|data| {
                data.connection = connection.clone();
                data.cookie = cookie.clone();
                data.refreshed_at = now;
                data.last_access = now;
            })
            .or_insert_with(|| SessionData::new(connection, cookie, now));
    }

    /// Evict a session and close its connection. Returns whether it existed.
    pub async fn remove(&self, token: &str) -> bool {
        match self.entries.remove(token) {
            Some((token, data)) => {
                debug!(session = %token, "Session removed");
                Self::teardown(&token, data).await;
                true
            }
            None => false,
        }
    }

    /// Evict every expired session. Returns how many were evicted.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<SessionToken> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(now, &self.settings))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for token in expired {
            if self.evict_expired(token.as_str(), now).await {
                evicted += 1;
            }
        }
        evicted
    }

    /// Close every live session. Used at process shutdown.
    pub async fn shutdown(&self) {
        let tokens: Vec<SessionToken> = self.entries.iter().map(|e| e.key().clone()).collect();
        let count = tokens.len();
        for token in tokens {
            self.remove(token.as_str()).await;
        }
        info!(sessions = count, "Session store shut down");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn evict_expired(&self, token: &str, now: Instant) -> bool {
        // Only the caller that wins the removal tears the connection down
        let removed = self
            .entries
            .remove_if(token, |_, data| data.is_expired(now, &self.settings));

        match removed {
            Some((token, data)) => {
                info!(session = %token, "Session expired, evicting");
                Self::teardown(&token, data).await;
                true
            }
            None => false,
        }
    }

    async fn teardown(token: &SessionToken, data: SessionData<C>) {
        if let Err(e) = data.connection.disconnect().await {
            warn!(session = %token, error = %e, "Failed to close session connection");
        }
    }
}

impl<C: DirectoryConnection> fmt::Debug for SessionStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.entries.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SearchPage, SearchRequest};
    use crate::error::BridgeResult;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingConnection {
        disconnects: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DirectoryConnection for CountingConnection {
        async fn bind(&self, _logon_name: &str, _secret: &str) -> BridgeResult<()> {
            Ok(())
        }

        fn is_bound(&self) -> bool {
            true
        }

        async fn search(&self, _request: &SearchRequest) -> BridgeResult<SearchPage> {
            Ok(SearchPage::default())
        }

        async fn disconnect(&self) -> BridgeResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store() -> SessionStore<CountingConnection> {
        SessionStore::new(SessionSettings::default())
    }

    #[test]
    fn test_token_is_unique_and_url_safe() {
        let tokens: HashSet<SessionToken> = (0..1000).map(|_| SessionToken::generate()).collect();
        assert_eq!(tokens.len(), 1000);

        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), 22);
        assert!(token
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_and_get() {
        let store = store();
        let token = SessionToken::generate();
        store
            .store(token.clone(), CountingConnection::default(), vec![7]);

        let (_, cookie) = store.get(token.as_str()).await.unwrap();
        assert_eq!(cookie, vec![7]);
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_expiry_disconnects_once() {
        let store = store();
        let connection = CountingConnection::default();
        let disconnects = Arc::clone(&connection.disconnects);
        let token = SessionToken::generate();
        store.store(token.clone(), connection, vec![1]);

        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(store.get(token.as_str()).await.is_none());
        assert!(store.get(token.as_str()).await.is_none());
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_slides_idle_expiry() {
        let store = store();
        let token = SessionToken::generate();
        store
            .store(token.clone(), CountingConnection::default(), vec![1]);

        // 400s in total: past the idle period, inside the absolute TTL
        for _ in 0..2 {
            tokio::time::advance(Duration::from_secs(200)).await;
            assert!(store.get(token.as_str()).await.is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_absolute_ttl_wins_over_access() {
        let store = store();
        let token = SessionToken::generate();
        store
            .store(token.clone(), CountingConnection::default(), vec![1]);

        for _ in 0..2 {
            tokio::time::advance(Duration::from_secs(250)).await;
            assert!(store.get(token.as_str()).await.is_some());
        }
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(store.get(token.as_str()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_refreshes_ttl_and_keeps_created_at() {
        let store = store();
        let token = SessionToken::generate();
        let connection = CountingConnection::default();
        store.store(token.clone(), connection.clone(), vec![1]);
        let created = store.entries.get(token.as_str()).unwrap().created_at;

        tokio::time::advance(Duration::from_secs(290)).await;
        store.store(token.clone(), connection.clone(), vec![2]);
        tokio::time::advance(Duration::from_secs(290)).await;
        store.store(token.clone(), connection, vec![3]);
        tokio::time::advance(Duration::from_secs(290)).await;

        let (_, cookie) = store.get(token.as_str()).await.unwrap();
        assert_eq!(cookie, vec![3]);
        assert_eq!(store.entries.get(token.as_str()).unwrap().created_at, created);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = store();
        let connection = CountingConnection::default();
        let disconnects = Arc::clone(&connection.disconnects);

        let old = SessionToken::generate();
        store.store(old.clone(), connection.clone(), vec![]);
        tokio::time::advance(Duration::from_secs(400)).await;
        let fresh = SessionToken::generate();
        store.store(fresh.clone(), connection, vec![]);

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(fresh.as_str()).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_and_shutdown_disconnect() {
        let store = store();
        let connection = CountingConnection::default();
        let disconnects = Arc::clone(&connection.disconnects);

        let a = SessionToken::generate();
        let b = SessionToken::generate();
        let c = SessionToken::generate();
        for token in [&a, &b, &c] {
            store.store(token.clone(), connection.clone(), vec![]);
        }

        assert!(store.remove(a.as_str()).await);
        assert!(!store.remove(a.as_str()).await);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        store.shutdown().await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 3);
        assert!(store.is_empty());
    }
}
