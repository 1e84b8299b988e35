//! Raw directory entries
//!
//! An attribute bag exactly as a backend returned it. Entries live only for
//! the duration of one search call; they are mapped into typed results and
//! dropped.

use std::collections::HashMap;

/// Name of the pseudo-attribute that carries an entry's distinguished name.
pub const DN_ATTRIBUTE: &str = "dn";

/// Values of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// UTF-8 values.
    Text(Vec<String>),
    /// Raw byte values (e.g. `objectGUID`).
    Binary(Vec<Vec<u8>>),
}

impl AttributeValue {
    /// First value as text, if this attribute holds text.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(values) => values.first().map(String::as_str),
            AttributeValue::Binary(_) => None,
        }
    }

    /// All text values (empty for binary attributes).
    pub fn texts(&self) -> &[String] {
        match self {
            AttributeValue::Text(values) => values,
            AttributeValue::Binary(_) => &[],
        }
    }

    /// First value as raw bytes, whichever form the backend delivered it in.
    pub fn first_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Text(values) => values.first().map(String::as_bytes),
            AttributeValue::Binary(values) => values.first().map(Vec::as_slice),
        }
    }

    /// Iterate over every value as bytes.
    pub fn iter_bytes(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        match self {
            AttributeValue::Text(values) => Box::new(values.iter().map(String::as_bytes)),
            AttributeValue::Binary(values) => Box::new(values.iter().map(Vec::as_slice)),
        }
    }

    /// Whether the attribute carries no values at all.
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeValue::Text(values) => values.is_empty(),
            AttributeValue::Binary(values) => values.is_empty(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(vec![value.to_string()])
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(vec![value])
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::Text(values)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(vec![value])
    }
}

/// A raw entry returned by a directory search.
///
/// Attribute names are matched case-insensitively, as directories do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    dn: String,
    attributes: HashMap<String, AttributeValue>,
}

impl DirectoryEntry {
    /// Create an entry with the given distinguished name.
    ///
    /// The DN is also exposed as the `dn` pseudo-attribute so mappings can
    /// target it like any other attribute.
    pub fn new(dn: impl Into<String>) -> Self {
        let dn = dn.into();
        let mut attributes = HashMap::new();
        attributes.insert(
            DN_ATTRIBUTE.to_string(),
            AttributeValue::Text(vec![dn.clone()]),
        );
        Self { dn, attributes }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set (replace) an attribute.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<AttributeValue>) {
        self.attributes
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Distinguished name of the entry.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Look up an attribute by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// Whether the entry carries a non-empty value for the attribute.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }
}
