//! Result models
//!
//! Read-only views of directory objects. Backends register mapping tables for
//! each of these; callers may register their own types alongside.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directory principal including its stable identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque directory identifier.
    pub id: Uuid,
    pub display_name: String,
    pub login_name: String,
    /// Handles of the groups the principal belongs to.
    pub member_of: Vec<String>,
}

/// A principal without its identifier, for listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub display_name: String,
    pub login_name: String,
    pub member_of: Vec<String>,
}

/// A directory group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Handle used to scope member filters.
    pub distinguished_name: String,
}
