//! Entry mapper
//!
//! Materializes raw entries into typed results using a [`FieldMapping`].
//! Mapping never fails: a missing attribute or a value the converter rejects
//! leaves the field at its default.

use tracing::warn;

use crate::entry::DirectoryEntry;
use crate::mapping::{DirectoryModel, FieldMapping};

/// Map one entry into `T`.
///
/// For each field the first listed source attribute present on the entry is
/// used.
pub fn map_entry<T: DirectoryModel>(mapping: &FieldMapping<T>, entry: &DirectoryEntry) -> T {
    let mut target = T::default();

    for rule in mapping.rules() {
        let Some((attribute, value)) = rule
            .attributes()
            .iter()
            .find_map(|name| entry.get(name).map(|value| (name, value)))
        else {
            continue;
        };

        if !rule.apply(&mut target, value) {
            warn!(
                dn = %entry.dn(),
                field = rule.field(),
                attribute = %attribute,
                target = std::any::type_name::<T>(),
                "Attribute value could not be converted, leaving default"
            );
        }
    }

    target
}

/// Map entries in arrival order.
pub fn map_entries<T: DirectoryModel>(
    mapping: &FieldMapping<T>,
    entries: impl IntoIterator<Item = DirectoryEntry>,
) -> Vec<T> {
    entries
        .into_iter()
        .map(|entry| map_entry(mapping, &entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::guid_from_le_bytes;
    use uuid::Uuid;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: Uuid,
        name: String,
        dn: String,
        groups: Vec<String>,
    }

    fn mapping() -> FieldMapping<Person> {
        FieldMapping::new()
            .field_with("id", &["objectGUID"], guid_from_le_bytes, |p: &mut Person, v| p.id = v)
            .field("name", &["displayName", "name"], |p, v| p.name = v)
            .field("dn", &["distinguishedName", "dn"], |p, v| p.dn = v)
            .field("groups", &["memberOf"], |p, v| p.groups = v)
    }

    #[test]
    fn test_map_full_entry() {
        let id = Uuid::new_v4();
        let entry = DirectoryEntry::new("CN=Jane,OU=Staff")
            .with("objectGUID", id.to_bytes_le().to_vec())
            .with("name", "Jane")
            .with(
                "memberOf",
                vec!["CN=Teachers".to_string(), "CN=Staff".to_string()],
            );

        let person = map_entry(&mapping(), &entry);
        assert_eq!(
            person,
            Person {
                id,
                name: "Jane".to_string(),
                dn: "CN=Jane,OU=Staff".to_string(),
                groups: vec!["CN=Teachers".to_string(), "CN=Staff".to_string()],
            }
        );
    }

    #[test]
    fn test_first_listed_attribute_wins() {
        let entry = DirectoryEntry::new("CN=x")
            .with("name", "short")
            .with("displayName", "Display");
        assert_eq!(map_entry(&mapping(), &entry).name, "Display");
    }

    #[test]
    fn test_missing_and_unconvertible_attributes_leave_defaults() {
        let entry = DirectoryEntry::new("CN=x").with("objectGUID", vec![1u8, 2, 3]);
        let person = map_entry(&mapping(), &entry);
        assert_eq!(person.id, Uuid::nil());
        assert!(person.name.is_empty());
        assert!(person.groups.is_empty());
        assert_eq!(person.dn, "CN=x");
    }

    #[test]
    fn test_map_entries_keeps_arrival_order() {
        let entries = vec![
            DirectoryEntry::new("CN=c").with("name", "c"),
            DirectoryEntry::new("CN=a").with("name", "a"),
            DirectoryEntry::new("CN=b").with("name", "b"),
        ];
        let names: Vec<String> = map_entries(&mapping(), entries)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
