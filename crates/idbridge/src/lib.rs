//! # Identity Bridge
//!
//! Directory-backed authentication, lookup and resumable paged search.
//!
//! The bridge authenticates principals against an external directory service,
//! resolves principals and groups, and pages through principal searches across
//! independent, stateless requests by keeping the connection and continuation
//! cookie of each search in a TTL-bounded session store.
//!
//! ## Architecture
//!
//! - [`IdentityBridge`] - The capability set callers use
//! - [`DirectoryBridge`] - Implements it over any [`DirectoryBackend`]
//! - [`DirectoryBackend`], [`DirectoryConnection`] - What a backend provides
//! - [`FieldMappingProvider`] - Per-type attribute-to-field tables
//! - [`SessionStore`] - Token to {connection, cookie}, with TTL and sliding expiry
//!
//! ## Example
//!
//! ```ignore
//! use idbridge::prelude::*;
//!
//! let bridge = DirectoryBridge::new(backend, BridgeSettings::new().with_role("Teacher", "Teachers"))?;
//!
//! bridge.authenticate("jdoe", "secret").await?;
//!
//! let mut page = bridge
//!     .search_principals_paginated::<Principal>("do", Some("Teacher"), 50, None)
//!     .await?;
//! while page.has_more {
//!     page = bridge
//!         .search_principals_paginated::<Principal>(
//!             "do",
//!             Some("Teacher"),
//!             50,
//!             Some(page.session_token.as_str()),
//!         )
//!         .await?;
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`error`] - Closed error taxonomy with transient/permanent classification
//! - [`filter`] - Filter tree and injection-safe escaping
//! - [`entry`] - Raw attribute bags returned by searches
//! - [`mapping`], [`mapper`] - Declarative mapping of entries into typed results
//! - [`backend`] - Backend traits and directory attribute layout
//! - [`connection`] - Connect/bind/search/disconnect lifecycle
//! - [`session`] - Paged search session store
//! - [`groups`] - Cached group handle resolution
//! - [`paging`] - One page of a resumable search
//! - [`bridge`] - The facade
//! - [`config`] - Backend-independent settings

pub mod backend;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod filter;
pub mod groups;
pub mod mapper;
pub mod mapping;
pub mod models;
pub mod paging;
pub mod session;

pub use backend::{DirectoryBackend, DirectoryConnection};
pub use bridge::{DirectoryBridge, IdentityBridge};
pub use mapping::FieldMappingProvider;
pub use session::SessionStore;

/// Prelude module for convenient imports.
///
/// ```
/// use idbridge::prelude::*;
/// ```
pub mod prelude {
    // Error handling
    pub use crate::error::{BridgeError, BridgeResult};

    // Facade
    pub use crate::bridge::{DirectoryBridge, IdentityBridge};
    pub use crate::config::BridgeSettings;
    pub use crate::paging::Page;

    // Backends
    pub use crate::backend::{
        DirectoryBackend, DirectoryConnection, DirectorySchema, IdEncoding, PageControl,
        SearchPage, SearchRequest, ServiceCredentials,
    };
    pub use crate::entry::{AttributeValue, DirectoryEntry};
    pub use crate::filter::Filter;

    // Mapping
    pub use crate::mapping::{
        DirectoryModel, FieldMapping, FieldMappingProvider, FromAttribute, MappingRegistry,
    };
    pub use crate::models::{Group, Principal, PrincipalSummary};

    // Sessions
    pub use crate::session::{SessionSettings, SessionStore, SessionToken};
}

// Re-export async_trait for backend implementors
pub use async_trait::async_trait;
