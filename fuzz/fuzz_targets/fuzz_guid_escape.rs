//! Fuzz target for binary identifier escaping.
//!
//! Every GUID must escape to sixteen `\XX` pairs in the directory's
//! mixed-endian byte order and decode back to the same identifier.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_guid_escape -- -max_total_time=600

#![no_main]

use idbridge::filter::{escape_binary_identifier, escape_guid, unescape_filter_value};
use libfuzzer_sys::fuzz_target;
use uuid::Uuid;

fuzz_target!(|bytes: [u8; 16]| {
    let id = Uuid::from_bytes(bytes);

    let escaped = escape_guid(&id);
    assert_eq!(escaped.len(), 48);
    assert_eq!(escaped, escape_binary_identifier(&id.to_bytes_le()));

    let decoded = unescape_filter_value(&escaped).expect("escaped GUID must decode");
    let le: [u8; 16] = decoded.try_into().expect("sixteen bytes");
    assert_eq!(Uuid::from_bytes_le(le), id);
});
