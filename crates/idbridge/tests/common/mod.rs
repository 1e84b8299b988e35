//! Scripted in-memory backend for exercising the bridge machinery.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use idbridge::mapping::guid_from_le_bytes;
use idbridge::prelude::*;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    });
}

pub const SERVICE_ACCOUNT: &str = "svc-bridge";
pub const SERVICE_SECRET: &str = "svc-secret";
pub const DOMAIN: &str = "school.local";

/// Shared state and call counters of the fake directory.
#[derive(Default)]
pub struct FakeDirectory {
    pub entries: Vec<DirectoryEntry>,
    pub credentials: HashMap<String, String>,
    pub connects: AtomicUsize,
    pub binds: AtomicUsize,
    pub searches: AtomicUsize,
    pub paged_searches: AtomicUsize,
    pub disconnects: AtomicUsize,
    /// Searches that will fail with `NotBound` before succeeding again.
    pub not_bound_failures: AtomicUsize,
    /// Fail every connect attempt.
    pub refuse_connections: AtomicBool,
}

impl FakeDirectory {
    pub fn io_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
            + self.binds.load(Ordering::SeqCst)
            + self.searches.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeConnection {
    directory: Arc<FakeDirectory>,
    bound: Arc<AtomicBool>,
}

#[idbridge::async_trait]
impl DirectoryConnection for FakeConnection {
    async fn bind(&self, logon_name: &str, secret: &str) -> BridgeResult<()> {
        self.directory.binds.fetch_add(1, Ordering::SeqCst);
        match self.directory.credentials.get(logon_name) {
            Some(expected) if expected == secret => {
                self.bound.store(true, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(BridgeError::InvalidCredentials),
        }
    }

    fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    async fn search(&self, request: &SearchRequest) -> BridgeResult<SearchPage> {
        self.directory.searches.fetch_add(1, Ordering::SeqCst);

        let pending = &self.directory.not_bound_failures;
        if pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.bound.store(false, Ordering::SeqCst);
            return Err(BridgeError::NotBound);
        }
        if !self.is_bound() {
            return Err(BridgeError::NotBound);
        }

        let matching: Vec<DirectoryEntry> = self
            .directory
            .entries
            .iter()
            .filter(|entry| request.filter.matches(entry))
            .cloned()
            .collect();

        let Some(paging) = &request.paging else {
            return Ok(SearchPage {
                entries: matching,
                cookie: Vec::new(),
            });
        };

        self.directory.paged_searches.fetch_add(1, Ordering::SeqCst);
        let offset = match paging.cookie.as_slice() {
            [] => 0,
            bytes => u64::from_be_bytes(bytes.try_into().unwrap()) as usize,
        };
        let end = (offset + paging.size as usize).min(matching.len());
        let cookie = if end < matching.len() {
            (end as u64).to_be_bytes().to_vec()
        } else {
            Vec::new()
        };

        Ok(SearchPage {
            entries: matching[offset..end].to_vec(),
            cookie,
        })
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.directory.disconnects.fetch_add(1, Ordering::SeqCst);
        self.bound.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeMappings(MappingRegistry);

impl FieldMappingProvider for FakeMappings {
    fn registry(&self) -> &MappingRegistry {
        &self.0
    }
}

pub struct FakeBackend {
    pub directory: Arc<FakeDirectory>,
    schema: DirectorySchema,
    mappings: FakeMappings,
}

impl FakeBackend {
    pub fn new(directory: FakeDirectory) -> Self {
        let mappings = MappingRegistry::builder()
            .register(
                FieldMapping::<Principal>::new()
                    .field_with("id", &["objectGUID"], guid_from_le_bytes, |p, v| p.id = v)
                    .field("display_name", &["name"], |p, v| p.display_name = v)
                    .field("login_name", &["sAMAccountName"], |p, v| p.login_name = v)
                    .field("member_of", &["memberOf"], |p, v| p.member_of = v),
            )
            .register(
                FieldMapping::<Group>::new()
                    .field("name", &["cn"], |g, v| g.name = v)
                    .field("distinguished_name", &["dn"], |g, v| {
                        g.distinguished_name = v
                    }),
            )
            .build();

        Self {
            directory: Arc::new(directory),
            schema: DirectorySchema::active_directory("DC=school,DC=local").with_domain(DOMAIN),
            mappings: FakeMappings(mappings),
        }
    }
}

#[idbridge::async_trait]
impl DirectoryBackend for FakeBackend {
    type Connection = FakeConnection;
    type Mappings = FakeMappings;

    async fn connect(&self) -> BridgeResult<FakeConnection> {
        self.directory.connects.fetch_add(1, Ordering::SeqCst);
        if self.directory.refuse_connections.load(Ordering::SeqCst) {
            return Err(BridgeError::connection_failed("connection refused"));
        }
        Ok(FakeConnection {
            directory: Arc::clone(&self.directory),
            bound: Arc::new(AtomicBool::new(false)),
        })
    }

    fn logon_name(&self, principal: &str) -> String {
        format!("{principal}@{DOMAIN}")
    }

    fn service_credentials(&self) -> ServiceCredentials<'_> {
        ServiceCredentials {
            principal: SERVICE_ACCOUNT,
            secret: SERVICE_SECRET,
        }
    }

    fn schema(&self) -> &DirectorySchema {
        &self.schema
    }

    fn mappings(&self) -> &FakeMappings {
        &self.mappings
    }
}

pub fn person(login: &str, name: &str, groups: &[&str]) -> (Uuid, DirectoryEntry) {
    let id = Uuid::new_v4();
    let entry = DirectoryEntry::new(format!("CN={name},OU=People,DC=school,DC=local"))
        .with("objectGUID", id.to_bytes_le().to_vec())
        .with("sAMAccountName", login)
        .with("userPrincipalName", format!("{login}@{DOMAIN}"))
        .with("name", name)
        .with(
            "memberOf",
            groups.iter().map(|g| g.to_string()).collect::<Vec<_>>(),
        );
    (id, entry)
}

pub fn group(name: &str) -> DirectoryEntry {
    DirectoryEntry::new(format!("CN={name},OU=Groups,DC=school,DC=local"))
        .with("objectCategory", "group")
        .with("cn", name)
}

pub const TEACHERS_DN: &str = "CN=Teachers,OU=Groups,DC=school,DC=local";

/// Five people, three of them teachers, plus the Teachers group.
pub fn school_directory() -> FakeDirectory {
    let mut directory = FakeDirectory::default();
    for (login, name, teacher) in [
        ("adoe", "Anna Doe", true),
        ("bdoe", "Ben Doe", false),
        ("cdoe", "Cara Doe", true),
        ("ddoe", "Dan Doe", false),
        ("edoe", "Eva Doe", true),
    ] {
        let groups: &[&str] = if teacher { &[TEACHERS_DN] } else { &[] };
        directory.entries.push(person(login, name, groups).1);
    }
    directory.entries.push(group("Teachers"));
    directory.credentials.insert(
        format!("{SERVICE_ACCOUNT}@{DOMAIN}"),
        SERVICE_SECRET.to_string(),
    );
    directory
        .credentials
        .insert(format!("adoe@{DOMAIN}"), "anna-pass".to_string());
    directory
}

pub fn bridge(directory: FakeDirectory) -> DirectoryBridge<FakeBackend> {
    init_test_logging();
    let settings = BridgeSettings::new()
        .with_role("Teacher", "Teachers")
        .with_role("Principal", "Headmasters");
    DirectoryBridge::new(FakeBackend::new(directory), settings).unwrap()
}
