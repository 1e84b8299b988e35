//! Identity bridge facade
//!
//! [`IdentityBridge`] is the capability set the rest of an application sees.
//! [`DirectoryBridge`] implements it over any [`DirectoryBackend`]; the real
//! and mock backends are chosen at composition time.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::backend::{DirectoryBackend, SearchRequest};
use crate::config::BridgeSettings;
use crate::connection::ConnectionManager;
use crate::error::{BridgeError, BridgeResult};
use crate::filter::Filter;
use crate::groups::GroupCache;
use crate::mapper::map_entry;
use crate::mapping::{DirectoryModel, FieldMappingProvider};
use crate::paging::{Page, PageRequest, PaginatedSearchSession};
use crate::session::SessionStore;

/// Authentication and lookup against a directory.
///
/// Single-entity searches return the first match, or `None` when nothing
/// matches; "not found" is never an error.
#[async_trait]
pub trait IdentityBridge: Send + Sync {
    /// Verify a principal's credentials.
    async fn authenticate(&self, principal: &str, secret: &str) -> BridgeResult<()>;

    /// Find a principal by login name.
    async fn search_principal<T: DirectoryModel>(&self, login: &str) -> BridgeResult<Option<T>>;

    /// Find a group by name.
    async fn search_group<T: DirectoryModel>(&self, name: &str) -> BridgeResult<Option<T>>;

    /// Find a principal by GUID string.
    ///
    /// A malformed id fails with `ValidationError` before any I/O. An empty id
    /// finds nothing.
    async fn search_by_id<T: DirectoryModel>(&self, id: &str) -> BridgeResult<Option<T>>;

    /// Fetch one page of principals whose search attributes contain `query`,
    /// optionally restricted to members of the group mapped to `role`.
    async fn search_principals_paginated<T: DirectoryModel>(
        &self,
        query: &str,
        role: Option<&str>,
        page_size: u32,
        session_token: Option<&str>,
    ) -> BridgeResult<Page<T>>;

    /// Drop a paged search session and close its connection.
    ///
    /// Returns whether the session existed.
    async fn end_session(&self, session_token: &str) -> bool;

    /// Close every live session.
    async fn shutdown(&self);
}

/// [`IdentityBridge`] over a directory backend.
pub struct DirectoryBridge<B: DirectoryBackend> {
    backend: Arc<B>,
    connections: ConnectionManager<B>,
    sessions: Arc<SessionStore<B::Connection>>,
    groups: GroupCache,
    settings: BridgeSettings,
}

impl<B: DirectoryBackend> DirectoryBridge<B> {
    /// Create a bridge with its own session store.
    pub fn new(backend: B, settings: BridgeSettings) -> BridgeResult<Self> {
        let sessions = Arc::new(SessionStore::new(settings.session.clone()));
        Self::with_session_store(backend, settings, sessions)
    }

    /// Create a bridge around an injected session store.
    pub fn with_session_store(
        backend: B,
        settings: BridgeSettings,
        sessions: Arc<SessionStore<B::Connection>>,
    ) -> BridgeResult<Self> {
        settings.validate()?;

        let backend = Arc::new(backend);
        Ok(Self {
            connections: ConnectionManager::new(Arc::clone(&backend)),
            groups: GroupCache::new(settings.group_cache_ttl()),
            backend,
            sessions,
            settings,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sessions(&self) -> &Arc<SessionStore<B::Connection>> {
        &self.sessions
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// First entry matching `filter`, searched on a short-lived service
    /// connection.
    async fn find_first<T: DirectoryModel>(&self, filter: Filter) -> BridgeResult<Option<T>> {
        let mapping = self.backend.mappings().mapping::<T>()?;
        let request = SearchRequest::new(
            &self.backend.schema().search_base,
            filter,
            mapping.required_attributes(),
        );

        let connection = self.connections.bind_service().await?;
        let result = self.connections.search(&connection, &request).await;
        self.connections.disconnect(connection).await;

        let page = result?;
        debug!(matches = page.entries.len(), "Single-entity search completed");
        Ok(page.entries.first().map(|entry| map_entry(&mapping, entry)))
    }
}

#[async_trait]
impl<B: DirectoryBackend> IdentityBridge for DirectoryBridge<B> {
    #[instrument(skip(self, secret))]
    async fn authenticate(&self, principal: &str, secret: &str) -> BridgeResult<()> {
        let connection = self.connections.bind(principal, secret).await?;
        self.connections.disconnect(connection).await;
        info!(principal = %principal, "Principal authenticated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_principal<T: DirectoryModel>(&self, login: &str) -> BridgeResult<Option<T>> {
        let filter = self.backend.schema().principal_filter(login);
        self.find_first(filter).await
    }

    #[instrument(skip(self))]
    async fn search_group<T: DirectoryModel>(&self, name: &str) -> BridgeResult<Option<T>> {
        let filter = self.backend.schema().group_filter(name);
        self.find_first(filter).await
    }

    #[instrument(skip(self))]
    async fn search_by_id<T: DirectoryModel>(&self, id: &str) -> BridgeResult<Option<T>> {
        let id = id.trim();
        if id.is_empty() {
            return Ok(None);
        }

        let id = Uuid::parse_str(id).map_err(|e| {
            BridgeError::validation(format!("'{id}' is not a valid identifier: {e}"))
        })?;

        let filter = self.backend.schema().id_filter(&id);
        self.find_first(filter).await
    }

    async fn search_principals_paginated<T: DirectoryModel>(
        &self,
        query: &str,
        role: Option<&str>,
        page_size: u32,
        session_token: Option<&str>,
    ) -> BridgeResult<Page<T>> {
        PaginatedSearchSession::new(&self.connections, &self.sessions, &self.groups, &self.settings)
            .next_page(PageRequest {
                query,
                role,
                page_size,
                session_token,
            })
            .await
    }

    async fn end_session(&self, session_token: &str) -> bool {
        self.sessions.remove(session_token).await
    }

    async fn shutdown(&self) {
        self.sessions.shutdown().await;
        self.groups.invalidate_all();
    }
}

impl<B: DirectoryBackend> std::fmt::Debug for DirectoryBridge<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryBridge")
            .field("sessions", &self.sessions)
            .field("groups", &self.groups)
            .field("settings", &self.settings)
            .finish()
    }
}
