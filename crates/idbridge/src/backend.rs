//! Backend capability traits
//!
//! A backend supplies connections, its logon-name convention, service-account
//! credentials, the attribute layout of its directory, and its mapping tables.
//! Everything above this module is backend-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::DirectoryEntry;
use crate::error::BridgeResult;
use crate::filter::Filter;
use crate::mapping::FieldMappingProvider;

/// Paged-results control for one search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageControl {
    /// Maximum entries to return.
    pub size: u32,
    /// Continuation cookie from the previous page; empty for the first page.
    pub cookie: Vec<u8>,
}

/// A subtree search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: Filter,
    pub attributes: Vec<String>,
    pub paging: Option<PageControl>,
}

impl SearchRequest {
    pub fn new(base: impl Into<String>, filter: Filter, attributes: Vec<String>) -> Self {
        Self {
            base: base.into(),
            filter,
            attributes,
            paging: None,
        }
    }

    /// Request one page, resuming from `cookie`.
    #[must_use]
    pub fn with_page(mut self, size: u32, cookie: Vec<u8>) -> Self {
        self.paging = Some(PageControl { size, cookie });
        self
    }
}

/// Entries of one search response and the continuation cookie it carried.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub entries: Vec<DirectoryEntry>,
    /// Empty when the directory has no further pages.
    pub cookie: Vec<u8>,
}

impl SearchPage {
    pub fn has_more(&self) -> bool {
        !self.cookie.is_empty()
    }
}

/// A live protocol connection.
///
/// Implementations are cheap handles onto one underlying connection; clones
/// share it. A connection is not safe for concurrent use by two callers.
#[async_trait]
pub trait DirectoryConnection: Clone + Send + Sync + 'static {
    /// Authenticate the connection as `logon_name`.
    async fn bind(&self, logon_name: &str, secret: &str) -> BridgeResult<()>;

    /// Whether the last bind on this connection succeeded.
    fn is_bound(&self) -> bool;

    /// Run a subtree search, honouring `request.paging` when set.
    async fn search(&self, request: &SearchRequest) -> BridgeResult<SearchPage>;

    /// Close the connection.
    async fn disconnect(&self) -> BridgeResult<()>;
}

/// Credentials of the fixed account used for searches.
#[derive(Clone, Copy)]
pub struct ServiceCredentials<'a> {
    pub principal: &'a str,
    pub secret: &'a str,
}

impl std::fmt::Debug for ServiceCredentials<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("principal", &self.principal)
            .field("secret", &"***REDACTED***")
            .finish()
    }
}

/// A directory implementation.
#[async_trait]
pub trait DirectoryBackend: Send + Sync + 'static {
    type Connection: DirectoryConnection;
    type Mappings: FieldMappingProvider;

    /// Open a new, unauthenticated connection.
    async fn connect(&self) -> BridgeResult<Self::Connection>;

    /// Fully qualified logon name for a caller-supplied principal name.
    fn logon_name(&self, principal: &str) -> String;

    fn service_credentials(&self) -> ServiceCredentials<'_>;

    fn schema(&self) -> &DirectorySchema;

    fn mappings(&self) -> &Self::Mappings;
}

/// How the identifier attribute stores a GUID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdEncoding {
    /// 16 raw bytes in mixed-endian order (Active Directory `objectGUID`).
    #[default]
    BinaryLe,
    /// Canonical hyphenated text.
    Text,
}

/// Attribute layout of a directory, and the filters built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySchema {
    /// Base of every subtree search.
    pub search_base: String,

    /// Attribute holding the short login name.
    #[serde(default = "default_login_attribute")]
    pub login_attribute: String,

    /// Attribute holding `login@domain`, if the directory has one.
    #[serde(default = "default_upn_attribute")]
    pub upn_attribute: Option<String>,

    /// Domain suffix used with `upn_attribute`.
    #[serde(default)]
    pub domain: Option<String>,

    /// Attributes the free-text principal search matches against.
    #[serde(default = "default_search_attributes")]
    pub search_attributes: Vec<String>,

    /// Attribute listing a principal's group handles.
    #[serde(default = "default_member_attribute")]
    pub member_attribute: String,

    /// Attribute holding the principal's GUID.
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    #[serde(default)]
    pub id_encoding: IdEncoding,

    /// Attribute and value that mark an entry as a group.
    #[serde(default = "default_group_class_attribute")]
    pub group_class_attribute: String,

    #[serde(default = "default_group_class_value")]
    pub group_class_value: String,

    /// Attribute holding a group's name.
    #[serde(default = "default_group_name_attribute")]
    pub group_name_attribute: String,
}

fn default_login_attribute() -> String {
    "sAMAccountName".to_string()
}

fn default_upn_attribute() -> Option<String> {
    Some("userPrincipalName".to_string())
}

fn default_search_attributes() -> Vec<String> {
    vec![
        "userPrincipalName".to_string(),
        "sAMAccountName".to_string(),
        "name".to_string(),
    ]
}

fn default_member_attribute() -> String {
    "memberOf".to_string()
}

fn default_id_attribute() -> String {
    "objectGUID".to_string()
}

fn default_group_class_attribute() -> String {
    "objectCategory".to_string()
}

fn default_group_class_value() -> String {
    "group".to_string()
}

fn default_group_name_attribute() -> String {
    "cn".to_string()
}

impl DirectorySchema {
    /// Active Directory layout under `search_base`.
    pub fn active_directory(search_base: impl Into<String>) -> Self {
        Self {
            search_base: search_base.into(),
            login_attribute: default_login_attribute(),
            upn_attribute: default_upn_attribute(),
            domain: None,
            search_attributes: default_search_attributes(),
            member_attribute: default_member_attribute(),
            id_attribute: default_id_attribute(),
            id_encoding: IdEncoding::BinaryLe,
            group_class_attribute: default_group_class_attribute(),
            group_class_value: default_group_class_value(),
            group_name_attribute: default_group_name_attribute(),
        }
    }

    /// Set the domain suffix used for UPN matching.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Filter for a principal by login: `login@domain` against the UPN
    /// attribute, or the bare login against the account-name attribute.
    pub fn principal_filter(&self, login: &str) -> Filter {
        let by_login = Filter::eq(&self.login_attribute, login);
        match (&self.upn_attribute, &self.domain) {
            (Some(upn), Some(domain)) if !login.contains('@') => Filter::or(vec![
                Filter::eq(upn, format!("{login}@{domain}")),
                by_login,
            ]),
            (Some(upn), _) if login.contains('@') => Filter::eq(upn, login),
            _ => by_login,
        }
    }

    /// Substring match of `term` against every search attribute.
    pub fn contains_filter(&self, term: &str) -> Filter {
        Filter::or(
            self.search_attributes
                .iter()
                .map(|attribute| Filter::contains(attribute, term))
                .collect(),
        )
    }

    /// Members of the group with the given handle.
    pub fn member_filter(&self, group_handle: &str) -> Filter {
        Filter::eq(&self.member_attribute, group_handle)
    }

    /// A group by name.
    pub fn group_filter(&self, name: &str) -> Filter {
        Filter::and(vec![
            Filter::eq(&self.group_class_attribute, &self.group_class_value),
            Filter::eq(&self.group_name_attribute, name),
        ])
    }

    /// A principal by GUID, encoded the way this directory stores it.
    pub fn id_filter(&self, id: &Uuid) -> Filter {
        match self.id_encoding {
            IdEncoding::BinaryLe => Filter::eq_bytes(&self.id_attribute, id.to_bytes_le()),
            IdEncoding::Text => Filter::eq(&self.id_attribute, id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::escape_guid;

    fn schema() -> DirectorySchema {
        DirectorySchema::active_directory("DC=school,DC=local").with_domain("school.local")
    }

    #[test]
    fn test_principal_filter_matches_upn_or_account() {
        assert_eq!(
            schema().principal_filter("jdoe").to_string(),
            "(|(userPrincipalName=jdoe@school.local)(sAMAccountName=jdoe))"
        );
    }

    #[test]
    fn test_principal_filter_with_qualified_login() {
        assert_eq!(
            schema().principal_filter("jdoe@school.local").to_string(),
            "(userPrincipalName=jdoe@school.local)"
        );
    }

    #[test]
    fn test_principal_filter_escapes_login() {
        assert_eq!(
            schema().principal_filter("*").to_string(),
            "(|(userPrincipalName=\\2a@school.local)(sAMAccountName=\\2a))"
        );
    }

    #[test]
    fn test_contains_filter() {
        assert_eq!(
            schema().contains_filter("an(").to_string(),
            "(|(userPrincipalName=*an\\28*)(sAMAccountName=*an\\28*)(name=*an\\28*))"
        );
    }

    #[test]
    fn test_group_filter() {
        assert_eq!(
            schema().group_filter("Teachers").to_string(),
            "(&(objectCategory=group)(cn=Teachers))"
        );
    }

    #[test]
    fn test_id_filter_encodings() {
        let id = Uuid::new_v4();
        assert_eq!(
            schema().id_filter(&id).to_string(),
            format!("(objectGUID={})", escape_guid(&id))
        );

        let mut text = schema();
        text.id_attribute = "entryUUID".to_string();
        text.id_encoding = IdEncoding::Text;
        assert_eq!(text.id_filter(&id).to_string(), format!("(entryUUID={id})"));
    }

    #[test]
    fn test_schema_deserialize_defaults() {
        let schema: DirectorySchema =
            serde_json::from_str(r#"{"search_base":"DC=x,DC=y"}"#).unwrap();
        assert_eq!(schema, DirectorySchema::active_directory("DC=x,DC=y"));
    }

    #[test]
    fn test_search_page_has_more() {
        assert!(!SearchPage::default().has_more());
        let page = SearchPage {
            entries: Vec::new(),
            cookie: vec![1],
        };
        assert!(page.has_more());
    }
}
