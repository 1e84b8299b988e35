//! Resumable paged principal search
//!
//! One call returns one page. The first call (no session token) binds a fresh
//! service connection and allocates a token; later calls resume the session's
//! connection and continuation cookie from the [`SessionStore`]. Entries are
//! returned in the order the directory sent them. If the directory changes
//! between pages, entries may be skipped or repeated; results are never
//! re-sorted to hide that.
//!
//! A resumed session whose connection is lost, or that stays unbound after
//! the implicit rebind, is evicted on the spot; the next call with its token
//! gets `SessionExpired` and has to start over.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::{DirectoryBackend, SearchPage, SearchRequest};
use crate::config::BridgeSettings;
use crate::connection::ConnectionManager;
use crate::error::{BridgeError, BridgeResult};
use crate::filter::Filter;
use crate::groups::GroupCache;
use crate::mapper::map_entries;
use crate::mapping::{DirectoryModel, FieldMappingProvider};
use crate::session::{SessionStore, SessionToken};

/// Caller input for one page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Free-text term matched as a substring of the search attributes.
    pub query: &'a str,
    /// Internal role to restrict results to.
    pub role: Option<&'a str>,
    pub page_size: u32,
    /// Token from the previous page; `None` starts a new search.
    pub session_token: Option<&'a str>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Pass back to fetch the next page.
    pub session_token: SessionToken,
    /// Whether the directory reported further pages.
    pub has_more: bool,
}

/// Orchestrates one page of a resumable search.
pub struct PaginatedSearchSession<'a, B: DirectoryBackend> {
    connections: &'a ConnectionManager<B>,
    sessions: &'a SessionStore<B::Connection>,
    groups: &'a GroupCache,
    settings: &'a BridgeSettings,
}

impl<'a, B: DirectoryBackend> PaginatedSearchSession<'a, B> {
    pub fn new(
        connections: &'a ConnectionManager<B>,
        sessions: &'a SessionStore<B::Connection>,
        groups: &'a GroupCache,
        settings: &'a BridgeSettings,
    ) -> Self {
        Self {
            connections,
            sessions,
            groups,
            settings,
        }
    }

    /// Fetch the next page.
    ///
    /// Input validation, role translation and the mapping lookup all happen
    /// before any directory I/O.
    #[instrument(skip(self, request), fields(session = ?request.session_token, page_size = request.page_size))]
    pub async fn next_page<T: DirectoryModel>(
        &self,
        request: PageRequest<'_>,
    ) -> BridgeResult<Page<T>> {
        if request.page_size == 0 || request.page_size > self.settings.max_page_size {
            return Err(BridgeError::validation(format!(
                "page_size must be between 1 and {}",
                self.settings.max_page_size
            )));
        }

        let group = request
            .role
            .map(|role| self.settings.resolve_role(role))
            .transpose()?;

        let backend = self.connections.backend();
        let mapping = backend.mappings().mapping::<T>()?;

        let (token, connection, cookie, fresh) = match request.session_token {
            Some(token) => {
                let (connection, cookie) = self
                    .sessions
                    .get(token)
                    .await
                    .ok_or_else(|| BridgeError::session_expired(token))?;
                let connection = match self.connections.ensure_bound(Some(connection)).await {
                    Ok(connection) => connection,
                    Err(e) => return Err(self.abandon_if_broken(token, e).await),
                };
                debug!(session = %token, "Resuming paged search");
                (SessionToken::from(token), connection, cookie, false)
            }
            None => {
                self.sessions.purge_expired().await;
                let connection = self.connections.ensure_bound(None).await?;
                let token = SessionToken::generate();
                debug!(session = %token, "Starting paged search");
                (token, connection, Vec::new(), true)
            }
        };

        let result = self
            .search_page(&connection, group, request, cookie, mapping.required_attributes())
            .await;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                // A fresh connection has no session entry yet to own it
                if fresh {
                    self.connections.disconnect(connection).await;
                    return Err(e);
                }
                return Err(self.abandon_if_broken(token.as_str(), e).await);
            }
        };

        let has_more = page.has_more();
        let returned = page.entries.len();
        let items = map_entries(&mapping, page.entries);
        self.sessions.store(token.clone(), connection, page.cookie);

        info!(
            session = %token,
            returned,
            has_more,
            "Paged search page returned"
        );

        Ok(Page {
            items,
            session_token: token,
            has_more,
        })
    }

    /// Evict a resumed session whose connection can no longer serve pages.
    async fn abandon_if_broken(&self, token: &str, error: BridgeError) -> BridgeError {
        if matches!(
            error,
            BridgeError::ConnectionError { .. } | BridgeError::NotBound
        ) {
            warn!(session = %token, error = %error, "Session connection unusable, evicting");
            self.sessions.remove(token).await;
        }
        error
    }

    async fn search_page(
        &self,
        connection: &B::Connection,
        group: Option<&str>,
        request: PageRequest<'_>,
        cookie: Vec<u8>,
        attributes: Vec<String>,
    ) -> BridgeResult<SearchPage> {
        let schema = self.connections.backend().schema();

        let mut filter = schema.contains_filter(request.query);
        if let Some(group) = group {
            let handle = self
                .groups
                .resolve(self.connections, connection, group)
                .await?;
            filter = Filter::and(vec![filter, schema.member_filter(&handle)]);
        }

        let search = SearchRequest::new(&schema.search_base, filter, attributes)
            .with_page(request.page_size, cookie);
        self.connections.search(connection, &search).await
    }
}
