//! LDAP directory backend

use async_trait::async_trait;
use idbridge::backend::{DirectoryBackend, DirectorySchema, ServiceCredentials};
use idbridge::error::BridgeResult;
use idbridge::mapping::MappingRegistry;

use crate::config::LdapSettings;
use crate::connection::LdapConnection;
use crate::mapping::LdapFieldMappings;

/// [`DirectoryBackend`] for LDAP and Active Directory servers.
#[derive(Debug)]
pub struct LdapBackend {
    settings: LdapSettings,
    domain: String,
    schema: DirectorySchema,
    mappings: LdapFieldMappings,
}

impl LdapBackend {
    /// Create a backend with the standard mapping tables.
    ///
    /// Settings are validated here; no connection is opened.
    pub fn new(settings: LdapSettings) -> BridgeResult<Self> {
        let mappings = LdapFieldMappings::new(&settings.attributes);
        Self::with_mappings(settings, mappings)
    }

    /// Create a backend with caller-supplied mapping tables.
    pub fn with_mappings(settings: LdapSettings, mappings: LdapFieldMappings) -> BridgeResult<Self> {
        settings.validate()?;

        let domain = settings.domain()?;
        let schema = settings.schema(&domain);
        Ok(Self {
            settings,
            domain,
            schema,
            mappings,
        })
    }

    /// Create a backend whose registry extends the standard one.
    pub fn with_registry(settings: LdapSettings, registry: MappingRegistry) -> BridgeResult<Self> {
        Self::with_mappings(settings, LdapFieldMappings::from_registry(registry))
    }

    pub fn settings(&self) -> &LdapSettings {
        &self.settings
    }

    /// Logon domain appended to unqualified principal names.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

#[async_trait]
impl DirectoryBackend for LdapBackend {
    type Connection = LdapConnection;
    type Mappings = LdapFieldMappings;

    async fn connect(&self) -> BridgeResult<LdapConnection> {
        LdapConnection::connect(&self.settings).await
    }

    fn logon_name(&self, principal: &str) -> String {
        self.settings.logon_name(principal, &self.domain)
    }

    fn service_credentials(&self) -> ServiceCredentials<'_> {
        ServiceCredentials {
            principal: &self.settings.service_account,
            secret: self.settings.service_password.as_deref().unwrap_or_default(),
        }
    }

    fn schema(&self) -> &DirectorySchema {
        &self.schema
    }

    fn mappings(&self) -> &LdapFieldMappings {
        &self.mappings
    }
}
