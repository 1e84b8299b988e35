//! CLI configuration file
//!
//! A JSON document selecting the backend and carrying the bridge settings:
//!
//! ```json
//! {
//!   "backend": {
//!     "type": "ldap",
//!     "host": "10.0.0.5",
//!     "fqdn": "dc01.school.local",
//!     "base_dn": "DC=school,DC=local",
//!     "service_account": "svc-bridge"
//!   },
//!   "bridge": { "roles": { "Teacher": "Teachers" } }
//! }
//! ```
//!
//! `IDBRIDGE_SERVICE_PASSWORD` overrides the service password of either
//! backend, so the file need not contain secrets.

use std::path::Path;

use idbridge::config::BridgeSettings;
use idbridge_ldap::LdapSettings;
use idbridge_mock::MockSettings;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Environment variable holding the service account password.
pub const SERVICE_PASSWORD_VAR: &str = "IDBRIDGE_SERVICE_PASSWORD";

/// Backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Ldap(LdapSettings),
    Mock(MockSettings),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub backend: BackendConfig,

    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "warn,idbridge=info".to_string()
}

impl CliConfig {
    /// Load `.env`, read the config file and apply environment overrides.
    pub fn load(path: &Path) -> CliResult<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let json = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json(&json)?;
        config.apply_service_password(std::env::var(SERVICE_PASSWORD_VAR).ok());
        Ok(config)
    }

    pub fn from_json(json: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the configured service password with a non-empty override.
    pub fn apply_service_password(&mut self, password: Option<String>) {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return;
        };

        match &mut self.backend {
            BackendConfig::Ldap(settings) => settings.service_password = Some(password),
            BackendConfig::Mock(settings) => settings.service_password = Some(password),
        }
    }
}
