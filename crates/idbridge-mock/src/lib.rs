//! # Mock Backend
//!
//! In-memory directory backend for development and tests.
//!
//! Users are read from a JSON file (see [`data`]) and exposed as directory
//! entries, with one group per role. Authentication, lookups and paged
//! searches run through the same bridge machinery as the LDAP backend.
//!
//! ```ignore
//! use idbridge::prelude::*;
//! use idbridge_mock::{MockBackend, MockSettings};
//!
//! let settings = MockSettings::new("mocked_user_data.json").with_service_account("svc-mock", "secret");
//! let bridge = DirectoryBridge::new(MockBackend::load(settings).await?, BridgeSettings::new())?;
//! ```

pub mod backend;
pub mod connection;
pub mod data;
pub mod directory;
pub mod mapping;

pub use backend::{MockBackend, MockSettings};
pub use connection::MockConnection;
pub use data::MockUser;
pub use directory::{MockDirectory, MockStats};
pub use mapping::MockFieldMappings;

/// Identity bridge over the mock directory.
pub type MockBridge = idbridge::DirectoryBridge<MockBackend>;
