//! Mapping tables for mock entries

use idbridge::entry::DN_ATTRIBUTE;
use idbridge::mapping::{FieldMapping, FieldMappingProvider, MappingRegistry, MappingRegistryBuilder};
use idbridge::models::{Group, Principal, PrincipalSummary};

use crate::directory::{
    FULL_NAME_ATTRIBUTE, GROUP_NAME_ATTRIBUTE, ID_ATTRIBUTE, MEMBER_OF_ATTRIBUTE,
    USERNAME_ATTRIBUTE,
};

/// Mapping tables of the mock backend.
#[derive(Debug)]
pub struct MockFieldMappings {
    registry: MappingRegistry,
}

impl Default for MockFieldMappings {
    fn default() -> Self {
        Self::from_registry(Self::standard().build())
    }
}

impl MockFieldMappings {
    /// Builder pre-loaded with tables for [`Principal`], [`PrincipalSummary`]
    /// and [`Group`].
    pub fn standard() -> MappingRegistryBuilder {
        MappingRegistry::builder()
            .register(
                FieldMapping::<Principal>::new()
                    .field("id", &[ID_ATTRIBUTE], |p, v| p.id = v)
                    .field("display_name", &[FULL_NAME_ATTRIBUTE], |p, v| {
                        p.display_name = v
                    })
                    .field("login_name", &[USERNAME_ATTRIBUTE], |p, v| p.login_name = v)
                    .field("member_of", &[MEMBER_OF_ATTRIBUTE], |p, v| p.member_of = v),
            )
            .register(
                FieldMapping::<PrincipalSummary>::new()
                    .field("display_name", &[FULL_NAME_ATTRIBUTE], |p, v| {
                        p.display_name = v
                    })
                    .field("login_name", &[USERNAME_ATTRIBUTE], |p, v| p.login_name = v)
                    .field("member_of", &[MEMBER_OF_ATTRIBUTE], |p, v| p.member_of = v),
            )
            .register(
                FieldMapping::<Group>::new()
                    .field("name", &[GROUP_NAME_ATTRIBUTE], |g, v| g.name = v)
                    .field("distinguished_name", &[DN_ATTRIBUTE], |g, v| {
                        g.distinguished_name = v
                    }),
            )
    }

    pub fn from_registry(registry: MappingRegistry) -> Self {
        Self { registry }
    }
}

impl FieldMappingProvider for MockFieldMappings {
    fn registry(&self) -> &MappingRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockUser;
    use crate::directory::MockDirectory;
    use idbridge::mapper::map_entry;

    #[test]
    fn test_principal_mapping() {
        let user = MockUser::new("Mary Smith", "mary.smith", "Teacher", "pw");
        let directory = MockDirectory::new(std::slice::from_ref(&user), "svc", "pw");
        let mappings = MockFieldMappings::default();

        let principal: Principal = map_entry(
            &mappings.mapping::<Principal>().unwrap(),
            &directory.entries()[0],
        );
        assert_eq!(principal.id, user.id);
        assert_eq!(principal.display_name, "Mary Smith");
        assert_eq!(principal.login_name, "mary.smith");
        assert_eq!(
            principal.member_of,
            vec!["CN=Teacher,OU=Roles,DC=mock,DC=local"]
        );

        let group: Group = map_entry(
            &mappings.mapping::<Group>().unwrap(),
            &directory.entries()[1],
        );
        assert_eq!(group.name, "Teacher");
        assert_eq!(group.distinguished_name, "CN=Teacher,OU=Roles,DC=mock,DC=local");
    }
}
