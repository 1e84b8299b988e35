//! # LDAP Backend
//!
//! LDAP and Active Directory backend for the identity bridge.
//!
//! Principals bind with `principal@domain`, where the domain is derived from
//! the server's fully qualified name. Searches run under a service account,
//! and paged searches use the Simple Paged Results control (RFC 2696).
//!
//! ## Example
//!
//! ```ignore
//! use idbridge::prelude::*;
//! use idbridge_ldap::{LdapBackend, LdapBridge, LdapSettings};
//!
//! let settings = LdapSettings::new("10.0.0.5", "dc01.school.local", "DC=school,DC=local", "svc-bridge")
//!     .with_password("secret");
//! let bridge: LdapBridge = DirectoryBridge::new(LdapBackend::new(settings)?, BridgeSettings::new())?;
//!
//! bridge.authenticate("jdoe", "password").await?;
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod mapping;

pub use backend::LdapBackend;
pub use config::{AttributeNames, ConnectionSettings, LdapSettings};
pub use connection::LdapConnection;
pub use mapping::LdapFieldMappings;

/// Identity bridge over an LDAP directory.
pub type LdapBridge = idbridge::DirectoryBridge<LdapBackend>;
