//! Bridge configuration
//!
//! Backend-independent settings: the internal-role to directory-group map,
//! session expiry, group cache lifetime and page size limits.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};
use crate::session::SessionSettings;

/// Settings shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Internal role name to directory group name.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,

    #[serde(default)]
    pub session: SessionSettings,

    /// Lifetime of resolved group handles.
    #[serde(default = "default_group_cache_ttl")]
    pub group_cache_ttl_secs: u64,

    /// Largest page a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_group_cache_ttl() -> u64 {
    300
}

fn default_max_page_size() -> u32 {
    1000
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            roles: BTreeMap::new(),
            session: SessionSettings::default(),
            group_cache_ttl_secs: default_group_cache_ttl(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl BridgeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an internal role to a directory group.
    pub fn with_role(mut self, role: impl Into<String>, group: impl Into<String>) -> Self {
        self.roles.insert(role.into(), group.into());
        self
    }

    pub fn with_session(mut self, session: SessionSettings) -> Self {
        self.session = session;
        self
    }

    pub fn with_max_page_size(mut self, max: u32) -> Self {
        self.max_page_size = max;
        self
    }

    pub fn group_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.group_cache_ttl_secs)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.max_page_size == 0 {
            return Err(BridgeError::invalid_configuration(
                "max_page_size must be at least 1",
            ));
        }

        if self.session.ttl_secs == 0 || self.session.idle_secs == 0 {
            return Err(BridgeError::invalid_configuration(
                "session ttl_secs and idle_secs must be non-zero",
            ));
        }

        if self.roles.keys().any(|role| role.trim().is_empty()) {
            return Err(BridgeError::invalid_configuration(
                "role names must not be empty",
            ));
        }

        Ok(())
    }

    /// Directory group for an internal role.
    ///
    /// An exact match (ignoring case) wins; otherwise the first configured
    /// role name contained in `role` is used. A role mapped to an empty group
    /// name counts as unmapped.
    pub fn resolve_role(&self, role: &str) -> BridgeResult<&str> {
        let wanted = role.to_lowercase();

        let group = self
            .roles
            .iter()
            .find(|(key, _)| key.to_lowercase() == wanted)
            .or_else(|| {
                self.roles
                    .iter()
                    .find(|(key, _)| wanted.contains(&key.to_lowercase()))
            })
            .map(|(_, group)| group.trim())
            .filter(|group| !group.is_empty());

        group.ok_or_else(|| BridgeError::RoleNotFound {
            role: role.to_string(),
        })
    }
}
