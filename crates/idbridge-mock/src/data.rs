//! Mock user data file
//!
//! A JSON array of users:
//!
//! ```json
//! [
//!   {
//!     "Id": "0f8fad5b-d9cb-469f-a165-70867728950e",
//!     "FullName": "Mary Smith",
//!     "Username": "mary.smith",
//!     "Role": "Teacher",
//!     "Password": "changeme"
//!   }
//! ]
//! ```

use std::collections::HashSet;
use std::path::Path;

use idbridge::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user of the mock directory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MockUser {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    /// Role name; users sharing a role share a group.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for MockUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockUser")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("password", &"***REDACTED***")
            .finish()
    }
}

impl MockUser {
    pub fn new(
        full_name: impl Into<String>,
        username: impl Into<String>,
        role: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            username: username.into(),
            role: role.into(),
            password: password.into(),
        }
    }
}

/// Parse a user list, rejecting blank and duplicate usernames.
pub fn parse_users(json: &str) -> BridgeResult<Vec<MockUser>> {
    let users: Vec<MockUser> = serde_json::from_str(json).map_err(|e| {
        BridgeError::invalid_configuration(format!("invalid mock user data: {e}"))
    })?;

    let mut seen = HashSet::new();
    for user in &users {
        if user.username.trim().is_empty() {
            return Err(BridgeError::invalid_configuration(format!(
                "mock user {} has no username",
                user.id
            )));
        }
        if !seen.insert(user.username.as_str()) {
            return Err(BridgeError::invalid_configuration(format!(
                "duplicate mock username '{}'",
                user.username
            )));
        }
    }

    Ok(users)
}

/// Read and parse a user data file.
pub async fn load_users(path: &Path) -> BridgeResult<Vec<MockUser>> {
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        BridgeError::invalid_configuration(format!(
            "cannot read mock user data {}: {e}",
            path.display()
        ))
    })?;
    parse_users(&json)
}
