//! Mock directory backend

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use idbridge::backend::{DirectoryBackend, DirectorySchema, ServiceCredentials};
use idbridge::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connection::MockConnection;
use crate::data::{load_users, MockUser};
use crate::directory::{MockDirectory, MockStats};
use crate::mapping::MockFieldMappings;

/// Configuration for the mock backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct MockSettings {
    /// JSON user data file.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Account the bridge binds as for searches.
    #[serde(default = "default_service_account")]
    pub service_account: String,

    /// Password of the service account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_password: Option<String>,
}

impl std::fmt::Debug for MockSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSettings")
            .field("data_file", &self.data_file)
            .field("service_account", &self.service_account)
            .field(
                "service_password",
                &self.service_password.as_ref().map(|_| "***REDACTED***"),
            )
            .finish()
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("mocked_user_data.json")
}

fn default_service_account() -> String {
    "svc-mock".to_string()
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            service_account: default_service_account(),
            service_password: None,
        }
    }
}

impl MockSettings {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            ..Self::default()
        }
    }

    pub fn with_service_account(
        mut self,
        account: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.service_account = account.into();
        self.service_password = Some(password.into());
        self
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.service_account.trim().is_empty() {
            return Err(BridgeError::invalid_configuration(
                "service_account is required",
            ));
        }

        if self.service_password.as_deref().map_or(true, str::is_empty) {
            return Err(BridgeError::invalid_configuration(
                "service_password is required",
            ));
        }

        Ok(())
    }
}

/// [`DirectoryBackend`] over an in-memory user list.
#[derive(Debug)]
pub struct MockBackend {
    directory: Arc<MockDirectory>,
    settings: MockSettings,
    schema: DirectorySchema,
    mappings: MockFieldMappings,
}

impl MockBackend {
    /// Load the configured data file.
    pub async fn load(settings: MockSettings) -> BridgeResult<Self> {
        settings.validate()?;
        let users = load_users(&settings.data_file).await?;
        info!(
            data_file = %settings.data_file.display(),
            users = users.len(),
            "Loaded mock directory"
        );
        Self::from_users(settings, &users)
    }

    /// Build from users already in memory.
    pub fn from_users(settings: MockSettings, users: &[MockUser]) -> BridgeResult<Self> {
        settings.validate()?;

        let directory = MockDirectory::new(
            users,
            &settings.service_account,
            settings.service_password.as_deref().unwrap_or_default(),
        );
        Ok(Self {
            directory: Arc::new(directory),
            settings,
            schema: MockDirectory::schema(),
            mappings: MockFieldMappings::default(),
        })
    }

    /// Replace the mapping tables.
    #[must_use]
    pub fn with_mappings(mut self, mappings: MockFieldMappings) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn directory(&self) -> &MockDirectory {
        &self.directory
    }

    pub fn stats(&self) -> &MockStats {
        self.directory.stats()
    }

    /// Role names present in the data; each maps to the group of the same
    /// name.
    pub fn roles(&self) -> &[String] {
        self.directory.roles()
    }
}

#[async_trait]
impl DirectoryBackend for MockBackend {
    type Connection = MockConnection;
    type Mappings = MockFieldMappings;

    async fn connect(&self) -> BridgeResult<MockConnection> {
        self.directory
            .stats()
            .connects
            .fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection::open(Arc::clone(&self.directory)))
    }

    /// Mock accounts have no domain.
    fn logon_name(&self, principal: &str) -> String {
        principal.to_string()
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

    fn mappings(&self) -> &MockFieldMappings {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        assert!(MockSettings::default().validate().is_err());
        assert!(MockSettings::default()
            .with_service_account("svc", "")
            .validate()
            .is_err());
        assert!(MockSettings::default()
            .with_service_account("svc", "pw")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_settings_debug_redacts_password() {
        let settings = MockSettings::default().with_service_account("svc", "hunter2");
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let settings =
            MockSettings::new("/nonexistent/mocked_user_data.json").with_service_account("svc", "pw");
        let err = MockBackend::load(settings).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}
