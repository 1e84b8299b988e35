//! Directory filters and filter escaping
//!
//! Filters are built as a typed tree and rendered to the standard prefix
//! notation only at the protocol boundary. Every caller-supplied value passes
//! through [`escape_filter_value`] or [`escape_binary_identifier`] on the way
//! out, so rendered filters never carry raw metacharacters from input.

use std::fmt;

use uuid::Uuid;

use crate::entry::DirectoryEntry;

/// Escape special characters in a filter assertion value (RFC 4515).
///
/// Not idempotent: escape raw input exactly once.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\5c")
        .replace('*', "\\2a")
        .replace('(', "\\28")
        .replace(')', "\\29")
        .replace('\0', "\\00")
}

/// Render arbitrary bytes as a sequence of `\XX` escapes for byte-exact matching.
pub fn escape_binary_identifier(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        let _ = write!(out, "\\{byte:02X}");
    }
    out
}

/// Escape a GUID in the mixed-endian byte layout directories store it in.
pub fn escape_guid(id: &Uuid) -> String {
    escape_binary_identifier(&id.to_bytes_le())
}

/// Decode an escaped assertion value back into raw bytes.
///
/// Returns `None` when a backslash is not followed by two hex digits.
pub fn unescape_filter_value(escaped: &str) -> Option<Vec<u8>> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = escaped.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

/// A directory search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters must match.
    And { filters: Vec<Filter> },
    /// At least one sub-filter must match.
    Or { filters: Vec<Filter> },
    /// The sub-filter must not match.
    Not { filter: Box<Filter> },
    /// Attribute equals the value.
    Equals { attribute: String, value: String },
    /// Attribute contains the value as a substring (`*value*`).
    Contains { attribute: String, value: String },
    /// Attribute is present.
    Present { attribute: String },
    /// Attribute equals the raw bytes.
    EqualsBytes { attribute: String, value: Vec<u8> },
}

impl Filter {
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    pub fn eq_bytes(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Filter::EqualsBytes {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And { filters }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or { filters }
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Evaluate the filter against an entry.
    ///
    /// String comparisons ignore case, matching directory defaults for the
    /// naming attributes this bridge queries.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::And { filters } => filters.iter().all(|f| f.matches(entry)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(entry)),
            Filter::Not { filter } => !filter.matches(entry),
            Filter::Equals { attribute, value } => entry.get(attribute).is_some_and(|values| {
                let wanted = value.to_lowercase();
                values.texts().iter().any(|v| v.to_lowercase() == wanted)
            }),
            Filter::Contains { attribute, value } if value.is_empty() => entry.has(attribute),
            Filter::Contains { attribute, value } => entry.get(attribute).is_some_and(|values| {
                let wanted = value.to_lowercase();
                values
                    .texts()
                    .iter()
                    .any(|v| v.to_lowercase().contains(&wanted))
            }),
            Filter::Present { attribute } => entry.has(attribute),
            Filter::EqualsBytes { attribute, value } => entry
                .get(attribute)
                .is_some_and(|values| values.iter_bytes().any(|v| v == value.as_slice())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And { filters } => {
                write!(f, "(&")?;
                for inner in filters {
                    write!(f, "{inner}")?;
                }
                write!(f, ")")
            }
            Filter::Or { filters } => {
                write!(f, "(|")?;
                for inner in filters {
                    write!(f, "{inner}")?;
                }
                write!(f, ")")
            }
            Filter::Not { filter } => write!(f, "(!{filter})"),
            Filter::Equals { attribute, value } => {
                write!(f, "({}={})", attribute, escape_filter_value(value))
            }
            // `(attr=**)` is not a valid substring filter
            Filter::Contains { attribute, value } if value.is_empty() => {
                write!(f, "({attribute}=*)")
            }
            Filter::Contains { attribute, value } => {
                write!(f, "({}=*{}*)", attribute, escape_filter_value(value))
            }
            Filter::Present { attribute } => write!(f, "({attribute}=*)"),
            Filter::EqualsBytes { attribute, value } => {
                write!(f, "({}={})", attribute, escape_binary_identifier(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("John Doe"), "John Doe");
        assert_eq!(escape_filter_value("John*"), "John\\2a");
        assert_eq!(escape_filter_value("(admin)"), "\\28admin\\29");
        assert_eq!(escape_filter_value("a\\b"), "a\\5cb");
        assert_eq!(escape_filter_value("nul\0"), "nul\\00");
    }

    #[test]
    fn test_escape_is_not_idempotent() {
        let once = escape_filter_value("*");
        assert_eq!(escape_filter_value(&once), "\\5c2a");
    }

    #[test]
    fn test_escaped_value_has_no_metacharacters() {
        let hostile = "*)(|(objectClass=*))(\\\0";
        let escaped = escape_filter_value(hostile);
        assert!(!escaped.contains('*'));
        assert!(!escaped.contains('('));
        assert!(!escaped.contains(')'));
        assert!(!escaped.contains('\0'));
        assert_eq!(
            unescape_filter_value(&escaped).as_deref(),
            Some(hostile.as_bytes())
        );
    }

    #[test]
    fn test_injection_stays_inside_one_assertion() {
        let filter = Filter::eq("sAMAccountName", "x)(|(sAMAccountName=*");
        assert_eq!(
            filter.to_string(),
            "(sAMAccountName=x\\29\\28|\\28sAMAccountName=\\2a)"
        );
    }

    #[test]
    fn test_escape_binary_identifier() {
        assert_eq!(escape_binary_identifier(&[]), "");
        assert_eq!(
            escape_binary_identifier(&[0x00, 0x0a, 0xff]),
            "\\00\\0A\\FF"
        );
    }

    #[test]
    fn test_escape_guid_uses_mixed_endian_layout() {
        let id = Uuid::parse_str("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(
            escape_guid(&id),
            "\\33\\22\\11\\00\\55\\44\\77\\66\\88\\99\\AA\\BB\\CC\\DD\\EE\\FF"
        );
    }

    #[test]
    fn test_guid_round_trip() {
        for _ in 0..32 {
            let id = Uuid::new_v4();
            let bytes = unescape_filter_value(&escape_guid(&id)).unwrap();
            let bytes: [u8; 16] = bytes.try_into().unwrap();
            assert_eq!(Uuid::from_bytes_le(bytes), id);
        }
    }

    #[test]
    fn test_unescape_rejects_truncated_escape() {
        assert_eq!(unescape_filter_value("abc\\2"), None);
        assert_eq!(unescape_filter_value("\\zz"), None);
    }

    #[test]
    fn test_filter_rendering() {
        let filter = Filter::and(vec![
            Filter::or(vec![
                Filter::contains("userPrincipalName", "jo"),
                Filter::contains("sAMAccountName", "jo"),
            ]),
            Filter::eq("memberOf", "CN=Teachers,OU=Groups,DC=school,DC=local"),
            Filter::negate(Filter::present("disabled")),
        ]);
        assert_eq!(
            filter.to_string(),
            "(&(|(userPrincipalName=*jo*)(sAMAccountName=*jo*))\
             (memberOf=CN=Teachers,OU=Groups,DC=school,DC=local)(!(disabled=*)))"
        );
    }

    #[test]
    fn test_empty_contains_renders_presence() {
        assert_eq!(Filter::contains("name", "").to_string(), "(name=*)");
    }

    #[test]
    fn test_equals_bytes_rendering() {
        let filter = Filter::eq_bytes("objectGUID", vec![0xde, 0xad]);
        assert_eq!(filter.to_string(), "(objectGUID=\\DE\\AD)");
    }

    #[test]
    fn test_matches() {
        let entry = DirectoryEntry::new("CN=Jane Doe,OU=Staff")
            .with("sAMAccountName", "jdoe")
            .with("name", "Jane Doe")
            .with("objectGUID", vec![1u8, 2, 3]);

        assert!(Filter::eq("samaccountname", "JDOE").matches(&entry));
        assert!(Filter::contains("name", "ne d").matches(&entry));
        assert!(Filter::contains("name", "").matches(&entry));
        assert!(!Filter::contains("mail", "").matches(&entry));
        assert!(Filter::eq_bytes("objectGUID", vec![1u8, 2, 3]).matches(&entry));
        assert!(!Filter::eq_bytes("objectGUID", vec![1u8, 2]).matches(&entry));
        assert!(Filter::negate(Filter::present("mail")).matches(&entry));
        assert!(Filter::or(vec![
            Filter::eq("name", "nobody"),
            Filter::eq("dn", "cn=jane doe,ou=staff"),
        ])
        .matches(&entry));
    }

    #[test]
    fn test_literal_metacharacters_match_only_literally() {
        let star = DirectoryEntry::new("CN=a").with("cn", "*");
        let other = DirectoryEntry::new("CN=b").with("cn", "anything");

        let filter = Filter::eq("cn", "*");
        assert!(filter.matches(&star));
        assert!(!filter.matches(&other));
        assert_eq!(filter.to_string(), "(cn=\\2a)");
    }
}
