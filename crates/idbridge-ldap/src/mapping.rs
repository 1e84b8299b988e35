//! Mapping tables for LDAP entries
//!
//! Built once from the configured attribute names.

use idbridge::backend::IdEncoding;
use idbridge::entry::DN_ATTRIBUTE;
use idbridge::mapping::{
    guid_from_le_bytes, Converter, FieldMapping, FieldMappingProvider, FromAttribute,
    MappingRegistry, MappingRegistryBuilder,
};
use idbridge::models::{Group, Principal, PrincipalSummary};
use uuid::Uuid;

use crate::config::AttributeNames;

/// Mapping tables of the LDAP backend.
#[derive(Debug)]
pub struct LdapFieldMappings {
    registry: MappingRegistry,
}

impl LdapFieldMappings {
    /// Standard tables for [`Principal`], [`PrincipalSummary`] and [`Group`].
    pub fn new(attributes: &AttributeNames) -> Self {
        Self::from_registry(Self::standard(attributes).build())
    }

    /// Builder pre-loaded with the standard tables, for registering
    /// additional result types.
    pub fn standard(attributes: &AttributeNames) -> MappingRegistryBuilder {
        let login = attributes.login.as_str();
        let display_name = attributes.display_name.as_str();
        let member_of = attributes.member_of.as_str();
        let id = attributes.id.as_str();

        let id_converter: Converter<Uuid> = match attributes.id_encoding {
            IdEncoding::BinaryLe => guid_from_le_bytes,
            IdEncoding::Text => Uuid::from_attribute,
        };

        MappingRegistry::builder()
            .register(
                FieldMapping::<Principal>::new()
                    .field_with("id", &[id], id_converter, |p, v| p.id = v)
                    .field("display_name", &[display_name], |p, v| p.display_name = v)
                    .field("login_name", &[login], |p, v| p.login_name = v)
                    .field("member_of", &[member_of], |p, v| p.member_of = v),
            )
            .register(
                FieldMapping::<PrincipalSummary>::new()
                    .field("display_name", &[display_name], |p, v| p.display_name = v)
                    .field("login_name", &[login], |p, v| p.login_name = v)
                    .field("member_of", &[member_of], |p, v| p.member_of = v),
            )
            .register(
                FieldMapping::<Group>::new()
                    .field("name", &[attributes.group_name.as_str()], |g, v| {
                        g.name = v
                    })
                    .field(
                        "distinguished_name",
                        &[DN_ATTRIBUTE, attributes.distinguished_name.as_str()],
                        |g, v| g.distinguished_name = v,
                    ),
            )
    }

    pub fn from_registry(registry: MappingRegistry) -> Self {
        Self { registry }
    }
}

impl FieldMappingProvider for LdapFieldMappings {
    fn registry(&self) -> &MappingRegistry {
        &self.registry
    }
}
