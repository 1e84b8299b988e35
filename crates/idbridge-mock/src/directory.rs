//! In-memory directory tree built from mock users

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use idbridge::backend::{DirectorySchema, IdEncoding};
use idbridge::entry::DirectoryEntry;

use crate::data::MockUser;

pub(crate) const SEARCH_BASE: &str = "DC=mock,DC=local";

pub(crate) const ID_ATTRIBUTE: &str = "Id";
pub(crate) const FULL_NAME_ATTRIBUTE: &str = "FullName";
pub(crate) const USERNAME_ATTRIBUTE: &str = "Username";
pub(crate) const ROLE_ATTRIBUTE: &str = "Role";
pub(crate) const MEMBER_OF_ATTRIBUTE: &str = "MemberOf";
pub(crate) const GROUP_CLASS_ATTRIBUTE: &str = "objectCategory";
pub(crate) const GROUP_CLASS_VALUE: &str = "group";
pub(crate) const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// Operation counters.
#[derive(Debug, Default)]
pub struct MockStats {
    pub connects: AtomicUsize,
    pub binds: AtomicUsize,
    pub searches: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl MockStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Connects, binds and searches together.
    pub fn io_calls(&self) -> usize {
        self.connects() + self.binds() + self.searches()
    }
}

/// Users and role groups as directory entries, plus the credentials that
/// bind against them.
#[derive(Debug)]
pub struct MockDirectory {
    entries: Vec<DirectoryEntry>,
    credentials: HashMap<String, String>,
    roles: Vec<String>,
    stats: MockStats,
}

fn group_dn(role: &str) -> String {
    format!("CN={role},OU=Roles,{SEARCH_BASE}")
}

impl MockDirectory {
    /// Build the tree. Users come first in file order, then one group per
    /// distinct role.
    pub fn new(users: &[MockUser], service_account: &str, service_password: &str) -> Self {
        let mut roles: BTreeMap<String, String> = BTreeMap::new();
        for user in users.iter().filter(|u| !u.role.is_empty()) {
            roles
                .entry(user.role.to_ascii_lowercase())
                .or_insert_with(|| user.role.clone());
        }

        let mut entries = Vec::with_capacity(users.len() + roles.len());
        let mut credentials = HashMap::with_capacity(users.len() + 1);

        for user in users {
            let mut entry = DirectoryEntry::new(format!(
                "CN={},OU=Users,{SEARCH_BASE}",
                user.username
            ))
            .with(ID_ATTRIBUTE, user.id.to_string())
            .with(FULL_NAME_ATTRIBUTE, user.full_name.as_str())
            .with(USERNAME_ATTRIBUTE, user.username.as_str());

            if let Some(role) = roles.get(&user.role.to_ascii_lowercase()) {
                entry.set(ROLE_ATTRIBUTE, role.as_str());
                entry.set(MEMBER_OF_ATTRIBUTE, vec![group_dn(role)]);
            }

            entries.push(entry);
            if !user.password.is_empty() {
                credentials.insert(user.username.clone(), user.password.clone());
            }
        }

        for role in roles.values() {
            entries.push(
                DirectoryEntry::new(group_dn(role))
                    .with(GROUP_CLASS_ATTRIBUTE, GROUP_CLASS_VALUE)
                    .with(GROUP_NAME_ATTRIBUTE, role.as_str()),
            );
        }

        credentials.insert(service_account.to_string(), service_password.to_string());

        Self {
            entries,
            credentials,
            roles: roles.into_values().collect(),
            stats: MockStats::default(),
        }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Distinct role names, each backed by a group of the same name.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn stats(&self) -> &MockStats {
        &self.stats
    }

    pub(crate) fn verify(&self, logon_name: &str, secret: &str) -> bool {
        self.credentials
            .get(logon_name)
            .is_some_and(|expected| expected == secret)
    }

    /// Attribute layout of the synthesized entries.
    pub fn schema() -> DirectorySchema {
        DirectorySchema {
            search_base: SEARCH_BASE.to_string(),
            login_attribute: USERNAME_ATTRIBUTE.to_string(),
            upn_attribute: None,
            domain: None,
            search_attributes: vec![USERNAME_ATTRIBUTE.to_string()],
            member_attribute: MEMBER_OF_ATTRIBUTE.to_string(),
            id_attribute: ID_ATTRIBUTE.to_string(),
            id_encoding: IdEncoding::Text,
            group_class_attribute: GROUP_CLASS_ATTRIBUTE.to_string(),
            group_class_value: GROUP_CLASS_VALUE.to_string(),
            group_name_attribute: GROUP_NAME_ATTRIBUTE.to_string(),
        }
    }
}
