//! Mock connection
//!
//! Evaluates filters against the in-memory tree and pages with a cookie that
//! encodes the offset of the next entry, so paged sessions resume exactly like
//! they do against a real server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use idbridge::backend::{DirectoryConnection, SearchPage, SearchRequest};
use idbridge::entry::DirectoryEntry;
use idbridge::error::{BridgeError, BridgeResult};
use tracing::debug;

use crate::directory::MockDirectory;

/// LDAP "protocol error", returned for cookies this directory did not issue.
const RC_PROTOCOL_ERROR: u32 = 2;

#[derive(Debug, Clone)]
pub struct MockConnection {
    directory: Arc<MockDirectory>,
    bound: Arc<AtomicBool>,
    open: Arc<AtomicBool>,
}

impl MockConnection {
    pub(crate) fn open(directory: Arc<MockDirectory>) -> Self {
        Self {
            directory,
            bound: Arc::new(AtomicBool::new(false)),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    fn ensure_open(&self) -> BridgeResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BridgeError::connection_failed("connection is closed"))
        }
    }
}

fn decode_cookie(cookie: &[u8]) -> BridgeResult<usize> {
    if cookie.is_empty() {
        return Ok(0);
    }
    let bytes: [u8; 8] = cookie
        .try_into()
        .map_err(|_| BridgeError::directory(RC_PROTOCOL_ERROR, "malformed paging cookie"))?;
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| BridgeError::directory(RC_PROTOCOL_ERROR, "malformed paging cookie"))
}

fn encode_cookie(offset: usize) -> Vec<u8> {
    (offset as u64).to_be_bytes().to_vec()
}

#[async_trait]
impl DirectoryConnection for MockConnection {
    async fn bind(&self, logon_name: &str, secret: &str) -> BridgeResult<()> {
        self.ensure_open()?;
        self.directory.stats().binds.fetch_add(1, Ordering::SeqCst);

        if self.directory.verify(logon_name, secret) {
            self.bound.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            self.bound.store(false, Ordering::SeqCst);
            Err(BridgeError::InvalidCredentials)
        }
    }

    fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    async fn search(&self, request: &SearchRequest) -> BridgeResult<SearchPage> {
        self.ensure_open()?;
        self.directory.stats().searches.fetch_add(1, Ordering::SeqCst);

        if !self.is_bound() {
            return Err(BridgeError::NotBound);
        }

        let matching: Vec<&DirectoryEntry> = self
            .directory
            .entries()
            .iter()
            .filter(|entry| request.filter.matches(entry))
            .collect();

        let Some(paging) = &request.paging else {
            return Ok(SearchPage {
                entries: matching.into_iter().cloned().collect(),
                cookie: Vec::new(),
            });
        };

        let offset = decode_cookie(&paging.cookie)?.min(matching.len());
        let end = offset
            .saturating_add(paging.size as usize)
            .min(matching.len());
        let cookie = if end < matching.len() {
            encode_cookie(end)
        } else {
            Vec::new()
        };

        debug!(
            filter = %request.filter,
            offset,
            returned = end - offset,
            total = matching.len(),
            "Mock paged search"
        );

        Ok(SearchPage {
            entries: matching[offset..end].iter().map(|e| (*e).clone()).collect(),
            cookie,
        })
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.bound.store(false, Ordering::SeqCst);
        if self.open.swap(false, Ordering::SeqCst) {
            self.directory
                .stats()
                .disconnects
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockUser;
    use idbridge::filter::Filter;

    fn connection() -> MockConnection {
        let users: Vec<MockUser> = (0..5)
            .map(|i| MockUser::new(format!("User {i}"), format!("user{i}"), "Student", "pw"))
            .collect();
        MockConnection::open(Arc::new(MockDirectory::new(&users, "svc", "svc-pw")))
    }

    fn students() -> SearchRequest {
        SearchRequest::new(
            "DC=mock,DC=local",
            Filter::contains("Username", "user"),
            vec![],
        )
    }

    #[tokio::test]
    async fn test_search_requires_bind() {
        let conn = connection();
        let err = conn.search(&students()).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotBound));

        conn.bind("svc", "svc-pw").await.unwrap();
        assert_eq!(conn.search(&students()).await.unwrap().entries.len(), 5);
    }

    #[tokio::test]
    async fn test_paging_offsets() {
        let conn = connection();
        conn.bind("user1", "pw").await.unwrap();

        let first = conn.search(&students().with_page(3, vec![])).await.unwrap();
        assert_eq!(first.entries.len(), 3);
        assert!(first.has_more());

        let second = conn
            .search(&students().with_page(3, first.cookie))
            .await
            .unwrap();
        assert_eq!(second.entries.len(), 2);
        assert!(!second.has_more());
        assert_eq!(second.entries[0].dn(), "CN=user3,OU=Users,DC=mock,DC=local");
    }

    #[tokio::test]
    async fn test_malformed_cookie() {
        let conn = connection();
        conn.bind("svc", "svc-pw").await.unwrap();

        let err = conn
            .search(&students().with_page(3, vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Directory { code: 2, .. }));
    }

    #[tokio::test]
    async fn test_closed_connection() {
        let conn = connection();
        conn.bind("svc", "svc-pw").await.unwrap();
        conn.disconnect().await.unwrap();
        conn.disconnect().await.unwrap();

        assert_eq!(conn.directory.stats().disconnects(), 1);
        let err = conn.search(&students()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
