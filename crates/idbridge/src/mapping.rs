//! Declarative attribute-to-field mapping
//!
//! Each result type gets a static [`FieldMapping`] table built once at
//! startup: field name, source attributes, and a converter plus setter. Tables
//! live in a [`MappingRegistry`] that is frozen once built, and backends expose
//! their registry through [`FieldMappingProvider`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::entry::{AttributeValue, DN_ATTRIBUTE};
use crate::error::{BridgeError, BridgeResult};

/// A type that directory entries can be mapped into.
///
/// Fields the entry does not supply keep their `Default` value.
pub trait DirectoryModel: Default + Send + Sync + 'static {}

impl<T> DirectoryModel for T where T: Default + Send + Sync + 'static {}

/// Converts a raw attribute value into a field value.
///
/// Returning `None` leaves the field at its default.
pub type Converter<V> = fn(&AttributeValue) -> Option<V>;

/// Default conversion for common field types.
pub trait FromAttribute: Sized {
    fn from_attribute(value: &AttributeValue) -> Option<Self>;
}

impl FromAttribute for String {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Text(values) => values.first().cloned(),
            AttributeValue::Binary(values) => values
                .first()
                .and_then(|v| String::from_utf8(v.clone()).ok()),
        }
    }
}

impl FromAttribute for Vec<String> {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Text(values) => Some(values.clone()),
            AttributeValue::Binary(_) => None,
        }
    }
}

impl FromAttribute for Vec<u8> {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        value.first_bytes().map(<[u8]>::to_vec)
    }
}

/// Parses the textual GUID form. Binary GUIDs need an explicit converter
/// that knows the directory's byte order, such as [`guid_from_le_bytes`].
impl FromAttribute for Uuid {
    fn from_attribute(value: &AttributeValue) -> Option<Self> {
        value.first_text().and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Converter for GUIDs stored in the mixed-endian layout Active Directory uses.
///
/// A 16-byte GUID may arrive as text when its bytes happen to be valid UTF-8,
/// so both forms are accepted.
pub fn guid_from_le_bytes(value: &AttributeValue) -> Option<Uuid> {
    let bytes: [u8; 16] = value.first_bytes()?.try_into().ok()?;
    Some(Uuid::from_bytes_le(bytes))
}

type Apply<T> = Box<dyn Fn(&mut T, &AttributeValue) -> bool + Send + Sync>;

/// One mapped field of a result type.
pub struct FieldRule<T> {
    field: &'static str,
    attributes: Vec<String>,
    apply: Apply<T>,
}

impl<T> FieldRule<T> {
    /// Name of the result field.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Source attributes, in priority order.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Convert `value` and assign it. Returns `false` if conversion failed.
    pub fn apply(&self, target: &mut T, value: &AttributeValue) -> bool {
        (self.apply)(target, value)
    }
}

impl<T> std::fmt::Debug for FieldRule<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("field", &self.field)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Mapping table for one result type.
///
/// ```
/// use idbridge::mapping::FieldMapping;
///
/// #[derive(Default)]
/// struct Account {
///     login: String,
///     groups: Vec<String>,
/// }
///
/// let mapping = FieldMapping::<Account>::new()
///     .field("login", &["sAMAccountName"], |a, v| a.login = v)
///     .field("groups", &["memberOf"], |a, v| a.groups = v);
/// assert_eq!(mapping.required_attributes(), vec!["sAMAccountName", "memberOf"]);
/// ```
#[derive(Debug)]
pub struct FieldMapping<T> {
    rules: Vec<FieldRule<T>>,
}

impl<T: DirectoryModel> Default for FieldMapping<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DirectoryModel> FieldMapping<T> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Map a field using the default [`FromAttribute`] conversion.
    #[must_use]
    pub fn field<V>(self, field: &'static str, attributes: &[&str], assign: fn(&mut T, V)) -> Self
    where
        V: FromAttribute + 'static,
    {
        self.field_with(field, attributes, V::from_attribute, assign)
    }

    /// Map a field through an explicit converter.
    #[must_use]
    pub fn field_with<V: 'static>(
        mut self,
        field: &'static str,
        attributes: &[&str],
        convert: Converter<V>,
        assign: fn(&mut T, V),
    ) -> Self {
        let apply: Apply<T> = Box::new(move |target: &mut T, value: &AttributeValue| {
            match convert(value) {
                Some(converted) => {
                    assign(target, converted);
                    true
                }
                None => false,
            }
        });
        self.rules.push(FieldRule {
            field,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            apply,
        });
        self
    }

    /// Mapped fields in registration order.
    pub fn rules(&self) -> &[FieldRule<T>] {
        &self.rules
    }

    /// Attributes a search must request to populate this type.
    ///
    /// Deduplicated case-insensitively; the `dn` pseudo-attribute is always
    /// returned by the directory and is left out.
    pub fn required_attributes(&self) -> Vec<String> {
        let mut required: Vec<String> = Vec::new();
        for attribute in self.rules.iter().flat_map(|rule| rule.attributes.iter()) {
            if attribute.eq_ignore_ascii_case(DN_ATTRIBUTE)
                || required.iter().any(|r| r.eq_ignore_ascii_case(attribute))
            {
                continue;
            }
            required.push(attribute.clone());
        }
        required
    }
}

/// Frozen set of mapping tables, keyed by result type.
#[derive(Default)]
pub struct MappingRegistry {
    mappings: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl MappingRegistry {
    pub fn builder() -> MappingRegistryBuilder {
        MappingRegistryBuilder::default()
    }

    /// Mapping table for `T`, if one was registered.
    pub fn get<T: DirectoryModel>(&self) -> Option<Arc<FieldMapping<T>>> {
        let mapping = self.mappings.get(&TypeId::of::<T>())?.clone();
        mapping.downcast::<FieldMapping<T>>().ok()
    }

    /// Whether `T` has a registered mapping.
    pub fn contains<T: DirectoryModel>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingRegistry")
            .field("types", &self.names)
            .finish()
    }
}

/// Builder for [`MappingRegistry`].
#[derive(Default)]
pub struct MappingRegistryBuilder {
    registry: MappingRegistry,
}

impl MappingRegistryBuilder {
    /// Register the mapping for `T`. The first registration for a type wins.
    #[must_use]
    pub fn register<T: DirectoryModel>(mut self, mapping: FieldMapping<T>) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.registry.mappings.contains_key(&type_id) {
            self.registry.mappings.insert(type_id, Arc::new(mapping));
            self.registry.names.push(std::any::type_name::<T>());
        }
        self
    }

    pub fn build(self) -> MappingRegistry {
        self.registry
    }
}

/// Source of mapping tables for a backend.
///
/// The real and mock backends each provide one; the entry mapper works the
/// same against either.
pub trait FieldMappingProvider: Send + Sync + 'static {
    /// The backend's frozen registry.
    fn registry(&self) -> &MappingRegistry;

    /// Mapping table for `T`.
    fn mapping<T: DirectoryModel>(&self) -> BridgeResult<Arc<FieldMapping<T>>> {
        self.registry()
            .get::<T>()
            .ok_or_else(|| BridgeError::MappingError {
                type_name: std::any::type_name::<T>().to_string(),
            })
    }

    /// Attributes a search must request to populate `T`.
    fn required_attributes<T: DirectoryModel>(&self) -> BridgeResult<Vec<String>> {
        Ok(self.mapping::<T>()?.required_attributes())
    }
}
