//! Fuzz target for filter value escaping.
//!
//! Escaped values must never contain raw filter metacharacters, must decode
//! back to the original bytes, and must render into a filter that still
//! matches the literal value.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_filter_escape -- -max_total_time=600

#![no_main]

use arbitrary::Arbitrary;
use idbridge::entry::DirectoryEntry;
use idbridge::filter::{escape_filter_value, unescape_filter_value, Filter};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct EscapeInput {
    value: String,
    contains: bool,
}

fuzz_target!(|input: EscapeInput| {
    if input.value.len() > 4096 {
        return;
    }

    let escaped = escape_filter_value(&input.value);
    assert!(
        !escaped.contains(['(', ')', '*', '\0']),
        "unescaped metacharacter in {escaped:?}"
    );

    let decoded = unescape_filter_value(&escaped).expect("escaped output must decode");
    assert_eq!(decoded, input.value.as_bytes());

    let filter = if input.contains {
        Filter::contains("cn", input.value.as_str())
    } else {
        Filter::eq("cn", input.value.as_str())
    };
    let rendered = filter.to_string();
    assert!(rendered.starts_with("(cn=") && rendered.ends_with(')'));

    let entry = DirectoryEntry::new("CN=fuzz").with("cn", input.value.as_str());
    assert!(filter.matches(&entry));
});
