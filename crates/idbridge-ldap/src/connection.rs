//! LDAP connection
//!
//! Wraps an `ldap3` handle whose driver runs on its own task, and translates
//! LDAP result codes into [`BridgeError`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use idbridge::backend::{DirectoryConnection, SearchPage, SearchRequest};
use idbridge::entry::{AttributeValue, DirectoryEntry};
use idbridge::error::{BridgeError, BridgeResult};
use ldap3::controls::{Control, ControlType, PagedResults, RawControl};
use ldap3::{
    Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, ResultEntry, Scope, SearchEntry,
    SearchResult,
};
use tracing::{debug, instrument, warn};

use crate::config::LdapSettings;

/// Invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// Server down.
const RC_SERVER_DOWN: u32 = 81;
/// Client-side timeout.
const RC_TIMEOUT: u32 = 85;
/// Connect error.
const RC_CONNECT_ERROR: u32 = 91;
/// Operations error; Active Directory uses it for unauthenticated searches.
const RC_OPERATIONS_ERROR: u32 = 1;

/// An open LDAP connection.
///
/// Clones share the underlying socket.
#[derive(Clone)]
pub struct LdapConnection {
    ldap: Ldap,
    bound: Arc<AtomicBool>,
    operation_timeout: Duration,
}

impl std::fmt::Debug for LdapConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConnection")
            .field("bound", &self.is_bound())
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl LdapConnection {
    /// Open an unbound connection to the configured server.
    pub async fn connect(settings: &LdapSettings) -> BridgeResult<Self> {
        let url = settings.url();
        debug!(url = %url, "Connecting to LDAP server");

        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(settings.connection.connect_timeout())
            .set_starttls(settings.use_starttls);

        let (conn, ldap) = LdapConnAsync::with_settings(conn_settings, &url)
            .await
            .map_err(|e| {
                BridgeError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(Self {
            ldap,
            bound: Arc::new(AtomicBool::new(false)),
            operation_timeout: settings.connection.operation_timeout(),
        })
    }

    fn translate_error(&self, error: LdapError) -> BridgeError {
        match error {
            LdapError::Timeout { .. } => BridgeError::Timeout {
                timeout_secs: self.operation_timeout.as_secs(),
            },
            LdapError::Io { .. } | LdapError::OpSend { .. } | LdapError::ResultRecv { .. } => {
                self.bound.store(false, Ordering::SeqCst);
                BridgeError::connection_failed_with_source("LDAP connection lost", error)
            }
            LdapError::LdapResult { result } => self.translate_result(&result),
            other => BridgeError::directory_with_source(0, "LDAP operation failed", other),
        }
    }

    fn translate_result(&self, result: &LdapResult) -> BridgeError {
        let error = translate_code(result.rc, &result.text, self.operation_timeout);
        if matches!(
            error,
            BridgeError::NotBound | BridgeError::ConnectionError { .. }
        ) {
            self.bound.store(false, Ordering::SeqCst);
        }
        error
    }

    fn check_result(&self, result: &LdapResult) -> BridgeResult<()> {
        if result.rc == 0 {
            Ok(())
        } else {
            Err(self.translate_result(result))
        }
    }
}

/// Map a non-zero LDAP result code to the bridge taxonomy.
pub(crate) fn translate_code(rc: u32, text: &str, operation_timeout: Duration) -> BridgeError {
    match rc {
        RC_INVALID_CREDENTIALS => BridgeError::InvalidCredentials,
        RC_SERVER_DOWN | RC_CONNECT_ERROR => {
            BridgeError::connection_failed(format!("LDAP server unreachable (code {rc}): {text}"))
        }
        RC_TIMEOUT => BridgeError::Timeout {
            timeout_secs: operation_timeout.as_secs(),
        },
        RC_OPERATIONS_ERROR if text.to_ascii_lowercase().contains("successful bind") => {
            BridgeError::NotBound
        }
        _ => BridgeError::directory(rc, text.to_string()),
    }
}

/// Continuation cookie of a paged search; empty on the last page.
pub(crate) fn paged_cookie(controls: &[Control]) -> Vec<u8> {
    controls
        .iter()
        .find_map(|Control(ctype, raw)| match ctype {
            Some(ControlType::PagedResults) => Some(raw.parse::<PagedResults>().cookie),
            _ => None,
        })
        .unwrap_or_default()
}

/// Convert a search result entry, skipping referrals and intermediate messages.
pub(crate) fn entry_from_search(result: ResultEntry) -> Option<DirectoryEntry> {
    if result.is_ref() || result.is_intermediate() {
        return None;
    }

    let entry = SearchEntry::construct(result);
    let mut converted = DirectoryEntry::new(entry.dn);
    for (name, values) in entry.attrs {
        converted.set(name, AttributeValue::Text(values));
    }
    for (name, values) in entry.bin_attrs {
        converted.set(name, AttributeValue::Binary(values));
    }
    Some(converted)
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    #[instrument(skip(self, secret))]
    async fn bind(&self, logon_name: &str, secret: &str) -> BridgeResult<()> {
        let mut ldap = self.ldap.clone();
        let result = ldap
            .with_timeout(self.operation_timeout)
            .simple_bind(logon_name, secret)
            .await
            .map_err(|e| self.translate_error(e))?;

        self.check_result(&result)?;
        self.bound.store(true, Ordering::SeqCst);
        debug!("LDAP bind succeeded");
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    #[instrument(skip(self, request), fields(base = %request.base, filter = %request.filter))]
    async fn search(&self, request: &SearchRequest) -> BridgeResult<SearchPage> {
        let filter = request.filter.to_string();
        let mut ldap = self.ldap.clone();

        if let Some(paging) = &request.paging {
            let mut control = RawControl::from(PagedResults {
                size: i32::try_from(paging.size).unwrap_or(i32::MAX),
                cookie: paging.cookie.clone(),
            });
            control.crit = true;
            ldap.with_controls(vec![control]);
        }

        let SearchResult(results, result) = ldap
            .with_timeout(self.operation_timeout)
            .search(&request.base, Scope::Subtree, &filter, &request.attributes)
            .await
            .map_err(|e| self.translate_error(e))?;

        self.check_result(&result)?;

        let entries: Vec<DirectoryEntry> =
            results.into_iter().filter_map(entry_from_search).collect();
        let cookie = if request.paging.is_some() {
            paged_cookie(&result.ctrls)
        } else {
            Vec::new()
        };

        debug!(
            count = entries.len(),
            more = !cookie.is_empty(),
            "LDAP search completed"
        );
        Ok(SearchPage { entries, cookie })
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.bound.store(false, Ordering::SeqCst);
        let mut ldap = self.ldap.clone();
        ldap.unbind().await.map_err(|e| {
            BridgeError::connection_failed_with_source("LDAP unbind failed", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[test]
    fn test_translate_invalid_credentials() {
        let error = translate_code(49, "80090308: LdapErr: DSID-0C09042A", TIMEOUT);
        assert!(matches!(error, BridgeError::InvalidCredentials));
    }

    #[test]
    fn test_translate_unreachable_server() {
        for rc in [81, 91] {
            let error = translate_code(rc, "", TIMEOUT);
            assert!(matches!(error, BridgeError::ConnectionError { .. }), "{rc}");
            assert!(error.is_transient());
        }
    }

    #[test]
    fn test_translate_timeout() {
        let error = translate_code(85, "", TIMEOUT);
        assert!(matches!(error, BridgeError::Timeout { timeout_secs: 60 }));
    }

    #[test]
    fn test_translate_not_bound() {
        let text = "000004DC: LdapErr: DSID-0C090A5C, comment: In order to perform this \
                    operation a successful bind must be completed on the connection., data 0";
        assert!(matches!(
            translate_code(1, text, TIMEOUT),
            BridgeError::NotBound
        ));

        let error = translate_code(1, "some other operations error", TIMEOUT);
        assert!(matches!(error, BridgeError::Directory { code: 1, .. }));
    }

    #[test]
    fn test_translate_other_codes() {
        let error = translate_code(32, "no such object", TIMEOUT);
        assert!(matches!(error, BridgeError::Directory { code: 32, .. }));
        assert_eq!(error.error_code(), "DIRECTORY_ERROR");
    }

    #[test]
    fn test_paged_cookie() {
        assert!(paged_cookie(&[]).is_empty());

        let raw = RawControl::from(PagedResults {
            size: 0,
            cookie: vec![1, 2, 3],
        });
        let control = Control(Some(ControlType::PagedResults), raw);
        assert_eq!(paged_cookie(&[control]), vec![1, 2, 3]);
    }
}
