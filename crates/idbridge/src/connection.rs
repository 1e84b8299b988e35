//! Connection lifecycle
//!
//! Connect, bind, search and disconnect on behalf of the facade. Connection
//! ownership is explicit: every call either opens a connection here or is
//! handed one borrowed from the session store.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::backend::{DirectoryBackend, DirectoryConnection, SearchPage, SearchRequest};
use crate::error::{BridgeError, BridgeResult};

/// Owns connect/bind/disconnect for one backend.
pub struct ConnectionManager<B: DirectoryBackend> {
    backend: Arc<B>,
}

impl<B: DirectoryBackend> Clone for ConnectionManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: DirectoryBackend> ConnectionManager<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open a connection and bind it as `principal`.
    ///
    /// The principal name is qualified with the directory's domain suffix.
    /// On a failed bind the fresh connection is closed before the error is
    /// returned.
    #[instrument(skip(self, secret))]
    pub async fn bind(&self, principal: &str, secret: &str) -> BridgeResult<B::Connection> {
        // An empty password is an anonymous bind to most directories
        if secret.is_empty() {
            return Err(BridgeError::InvalidCredentials);
        }

        let logon_name = self.backend.logon_name(principal);
        let connection = self.backend.connect().await?;

        debug!(logon_name = %logon_name, "Binding connection");

        if let Err(e) = connection.bind(&logon_name, secret).await {
            self.disconnect(connection).await;
            return Err(e);
        }

        info!(logon_name = %logon_name, "Bind succeeded");
        Ok(connection)
    }

    /// Open a connection bound as the service account.
    pub async fn bind_service(&self) -> BridgeResult<B::Connection> {
        let credentials = self.backend.service_credentials();
        self.bind(credentials.principal, credentials.secret).await
    }

    /// Re-authenticate an existing connection as the service account.
    async fn rebind_service(&self, connection: &B::Connection) -> BridgeResult<()> {
        let credentials = self.backend.service_credentials();
        let logon_name = self.backend.logon_name(credentials.principal);
        connection.bind(&logon_name, credentials.secret).await
    }

    /// Return a bound connection.
    ///
    /// A bound `existing` connection is reused as is. An unbound one is
    /// re-bound in place as the service account, which keeps any paged search
    /// state the server holds for it. With no connection a fresh service bind
    /// is performed.
    pub async fn ensure_bound(
        &self,
        existing: Option<B::Connection>,
    ) -> BridgeResult<B::Connection> {
        match existing {
            Some(connection) if connection.is_bound() => Ok(connection),
            Some(connection) => {
                debug!("Reused connection is not bound, binding service account");
                self.rebind_service(&connection).await?;
                Ok(connection)
            }
            None => self.bind_service().await,
        }
    }

    /// Search on `connection`.
    ///
    /// A `NotBound` failure triggers one implicit service-account rebind and
    /// a retry; a second `NotBound` is returned to the caller.
    pub async fn search(
        &self,
        connection: &B::Connection,
        request: &SearchRequest,
    ) -> BridgeResult<SearchPage> {
        debug!(
            filter = %request.filter,
            base = %request.base,
            paged = request.paging.is_some(),
            "Searching directory"
        );

        match connection.search(request).await {
            Err(BridgeError::NotBound) => {
                warn!("Directory reported an unbound connection, rebinding service account");
                self.rebind_service(connection).await?;
                connection.search(request).await
            }
            result => result,
        }
    }

    /// Close a connection. Failures are logged, not returned.
    pub async fn disconnect(&self, connection: B::Connection) {
        if let Err(e) = connection.disconnect().await {
            warn!(error = %e, "Failed to close directory connection");
        }
    }
}
