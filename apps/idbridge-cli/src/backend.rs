//! Backend composition
//!
//! The configured backend is chosen at startup; both variants expose the
//! same [`IdentityBridge`] surface.

use async_trait::async_trait;
use idbridge::prelude::*;
use idbridge_ldap::{LdapBackend, LdapBridge};
use idbridge_mock::{MockBackend, MockBridge};
use tracing::info;

use crate::config::{BackendConfig, CliConfig};
use crate::error::CliResult;

/// Bridge over whichever backend the configuration selects.
#[derive(Debug)]
pub enum AnyBridge {
    Ldap(LdapBridge),
    Mock(MockBridge),
}

impl AnyBridge {
    /// Build the configured bridge.
    ///
    /// Mock roles missing from the role map are mapped to the group of the
    /// same name.
    pub async fn build(config: CliConfig) -> CliResult<Self> {
        let mut settings = config.bridge;

        let bridge = match config.backend {
            BackendConfig::Ldap(ldap) => {
                info!(host = %ldap.host, "Using LDAP backend");
                AnyBridge::Ldap(DirectoryBridge::new(LdapBackend::new(ldap)?, settings)?)
            }
            BackendConfig::Mock(mock) => {
                info!(data_file = %mock.data_file.display(), "Using mock backend");
                let backend = MockBackend::load(mock).await?;
                for role in backend.roles() {
                    settings
                        .roles
                        .entry(role.clone())
                        .or_insert_with(|| role.clone());
                }
                AnyBridge::Mock(DirectoryBridge::new(backend, settings)?)
            }
        };

        Ok(bridge)
    }
}

#[async_trait]
impl IdentityBridge for AnyBridge {
    async fn authenticate(&self, principal: &str, secret: &str) -> BridgeResult<()> {
        match self {
            AnyBridge::Ldap(b) => b.authenticate(principal, secret).await,
            AnyBridge::Mock(b) => b.authenticate(principal, secret).await,
        }
    }

    async fn search_principal<T: DirectoryModel>(&self, login: &str) -> BridgeResult<Option<T>> {
        match self {
            AnyBridge::Ldap(b) => b.search_principal::<T>(login).await,
            AnyBridge::Mock(b) => b.search_principal::<T>(login).await,
        }
    }

    async fn search_group<T: DirectoryModel>(&self, name: &str) -> BridgeResult<Option<T>> {
        match self {
            AnyBridge::Ldap(b) => b.search_group::<T>(name).await,
            AnyBridge::Mock(b) => b.search_group::<T>(name).await,
        }
    }

    async fn search_by_id<T: DirectoryModel>(&self, id: &str) -> BridgeResult<Option<T>> {
        match self {
            AnyBridge::Ldap(b) => b.search_by_id::<T>(id).await,
            AnyBridge::Mock(b) => b.search_by_id::<T>(id).await,
        }
    }

    async fn search_principals_paginated<T: DirectoryModel>(
        &self,
        query: &str,
        role: Option<&str>,
        page_size: u32,
        session_token: Option<&str>,
    ) -> BridgeResult<Page<T>> {
        match self {
            AnyBridge::Ldap(b) => {
                b.search_principals_paginated::<T>(query, role, page_size, session_token)
                    .await
            }
            AnyBridge::Mock(b) => {
                b.search_principals_paginated::<T>(query, role, page_size, session_token)
                    .await
            }
        }
    }

    async fn end_session(&self, session_token: &str) -> bool {
        match self {
            AnyBridge::Ldap(b) => b.end_session(session_token).await,
            AnyBridge::Mock(b) => b.end_session(session_token).await,
        }
    }

    async fn shutdown(&self) {
        match self {
            AnyBridge::Ldap(b) => b.shutdown().await,
            AnyBridge::Mock(b) => b.shutdown().await,
        }
    }
}
