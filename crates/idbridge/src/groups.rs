//! Group handle resolution
//!
//! Role filters need the handle (distinguished name) of a group. Handles are
//! looked up on first use and cached for `group_cache_ttl_secs`.

use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::backend::{DirectoryBackend, SearchRequest};
use crate::connection::ConnectionManager;
use crate::error::{BridgeError, BridgeResult};

const MAX_CACHED_GROUPS: u64 = 1_000;

/// Cache of group name to group handle.
#[derive(Clone)]
pub struct GroupCache {
    handles: Cache<String, String>,
}

impl GroupCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            handles: Cache::builder()
                .max_capacity(MAX_CACHED_GROUPS)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Handle of the named group, searching on `connection` on a miss.
    pub async fn resolve<B: DirectoryBackend>(
        &self,
        manager: &ConnectionManager<B>,
        connection: &B::Connection,
        group: &str,
    ) -> BridgeResult<String> {
        let key = group.to_lowercase();
        if let Some(handle) = self.handles.get(&key).await {
            debug!(group = %group, "Group handle cache hit");
            return Ok(handle);
        }

        let schema = manager.backend().schema();
        let request = SearchRequest::new(
            &schema.search_base,
            schema.group_filter(group),
            vec![schema.group_name_attribute.clone()],
        );
        let page = manager.search(connection, &request).await?;

        let handle = page
            .entries
            .into_iter()
            .next()
            .map(|entry| entry.dn().to_string())
            .ok_or_else(|| BridgeError::GroupNotFound {
                group: group.to_string(),
            })?;

        debug!(group = %group, handle = %handle, "Group handle resolved");
        self.handles.insert(key, handle.clone()).await;
        Ok(handle)
    }

    /// Drop every cached handle.
    pub fn invalidate_all(&self) {
        self.handles.invalidate_all();
    }
}

impl std::fmt::Debug for GroupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupCache")
            .field("entries", &self.handles.entry_count())
            .finish()
    }
}
