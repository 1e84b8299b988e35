//! LDAP backend configuration
//!
//! Connection, service account and attribute layout for an LDAP or Active
//! Directory server.

use std::time::Duration;

use idbridge::backend::{DirectorySchema, IdEncoding};
use idbridge::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};

/// Configuration for the LDAP backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapSettings {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// Port for plain LDAP and STARTTLS.
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Port for LDAPS.
    #[serde(default = "default_ssl_port")]
    pub ssl_port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Fully qualified name of the directory server (e.g. "dc01.school.local").
    ///
    /// The logon domain is derived from it by dropping the first label.
    pub fqdn: String,

    /// Explicit logon domain, overriding the one derived from `fqdn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_suffix: Option<String>,

    /// Base DN of every search (e.g. "DC=school,DC=local").
    pub base_dn: String,

    /// Service account used for searches, without domain.
    pub service_account: String,

    /// Service account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_password: Option<String>,

    /// Timeouts.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Attribute names; defaults target Active Directory.
    #[serde(default)]
    pub attributes: AttributeNames,
}

impl std::fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl_port", &self.ssl_port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("fqdn", &self.fqdn)
            .field("domain_suffix", &self.domain_suffix)
            .field("base_dn", &self.base_dn)
            .field("service_account", &self.service_account)
            .field(
                "service_password",
                &self.service_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .field("attributes", &self.attributes)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_ssl_port() -> u16 {
    636
}

/// Connection timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-operation timeout in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_operation_timeout() -> u64 {
    60
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

impl ConnectionSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Directory attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    pub login: String,
    /// `None` for directories without user principal names.
    pub upn: Option<String>,
    pub display_name: String,
    pub member_of: String,
    pub id: String,
    pub id_encoding: IdEncoding,
    pub distinguished_name: String,
    pub group_name: String,
    pub group_class_attribute: String,
    pub group_class_value: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            login: "sAMAccountName".to_string(),
            upn: Some("userPrincipalName".to_string()),
            display_name: "name".to_string(),
            member_of: "memberOf".to_string(),
            id: "objectGUID".to_string(),
            id_encoding: IdEncoding::BinaryLe,
            distinguished_name: "distinguishedName".to_string(),
            group_name: "cn".to_string(),
            group_class_attribute: "objectCategory".to_string(),
            group_class_value: "group".to_string(),
        }
    }
}

impl LdapSettings {
    /// Create settings with required fields.
    pub fn new(
        host: impl Into<String>,
        fqdn: impl Into<String>,
        base_dn: impl Into<String>,
        service_account: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            ssl_port: default_ssl_port(),
            use_ssl: false,
            use_starttls: false,
            fqdn: fqdn.into(),
            domain_suffix: None,
            base_dn: base_dn.into(),
            service_account: service_account.into(),
            service_password: None,
            connection: ConnectionSettings::default(),
            attributes: AttributeNames::default(),
        }
    }

    /// Set the service account password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.service_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Override the logon domain.
    pub fn with_domain_suffix(mut self, domain: impl Into<String>) -> Self {
        self.domain_suffix = Some(domain.into());
        self
    }

    /// Port actually dialled.
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        if self.use_ssl {
            self.ssl_port
        } else {
            self.port
        }
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.effective_port())
    }

    /// Logon domain: `domain_suffix`, or `fqdn` without its first label.
    pub fn domain(&self) -> BridgeResult<String> {
        if let Some(domain) = self.domain_suffix.as_deref().map(str::trim) {
            if domain.is_empty() {
                return Err(BridgeError::invalid_configuration(
                    "domain_suffix must not be empty",
                ));
            }
            return Ok(domain.to_string());
        }

        match self.fqdn.split_once('.') {
            Some((host, domain))
                if !host.is_empty() && !domain.is_empty() && !domain.starts_with('.') =>
            {
                Ok(domain.to_string())
            }
            _ => Err(BridgeError::invalid_configuration(format!(
                "fqdn '{}' must contain at least two segments",
                self.fqdn
            ))),
        }
    }

    /// Fully qualified logon name (`principal@domain`).
    ///
    /// Names that already carry a domain are used as given.
    pub fn logon_name(&self, principal: &str, domain: &str) -> String {
        if principal.contains('@') {
            principal.to_string()
        } else {
            format!("{principal}@{domain}")
        }
    }

    /// Directory layout described by these settings.
    pub fn schema(&self, domain: &str) -> DirectorySchema {
        let attributes = &self.attributes;
        let mut search_attributes: Vec<String> = attributes.upn.iter().cloned().collect();
        search_attributes.push(attributes.login.clone());
        search_attributes.push(attributes.display_name.clone());

        DirectorySchema {
            search_base: self.base_dn.clone(),
            login_attribute: attributes.login.clone(),
            upn_attribute: attributes.upn.clone(),
            domain: Some(domain.to_string()),
            search_attributes,
            member_attribute: attributes.member_of.clone(),
            id_attribute: attributes.id.clone(),
            id_encoding: attributes.id_encoding,
            group_class_attribute: attributes.group_class_attribute.clone(),
            group_class_value: attributes.group_class_value.clone(),
            group_name_attribute: attributes.group_name.clone(),
        }
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.host.is_empty() {
            return Err(BridgeError::invalid_configuration("host is required"));
        }

        if self.base_dn.is_empty() {
            return Err(BridgeError::invalid_configuration("base_dn is required"));
        }

        if self.service_account.is_empty() {
            return Err(BridgeError::invalid_configuration(
                "service_account is required",
            ));
        }

        if self.use_ssl && self.use_starttls {
            return Err(BridgeError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }

        if self.connection.connect_timeout_secs == 0 || self.connection.operation_timeout_secs == 0
        {
            return Err(BridgeError::invalid_configuration(
                "timeouts must be non-zero",
            ));
        }

        self.domain()?;
        Ok(())
    }
}
