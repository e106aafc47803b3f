//! Storage key layout.
//!
//! Every record lives under a one-byte namespace so prefix records, values,
//! blocks and the transaction index never collide.

use quark_types::{join_key, prefix_end, Hash};

pub const PREFIX_INFO: u8 = 0x00;
pub const PREFIX_VALUE: u8 = 0x01;
pub const BLOCK: u8 = 0x02;
pub const TX_INDEX: u8 = 0x03;
pub const LAST_ACCEPTED: &[u8] = &[0x04];

fn namespaced(ns: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + body.len());
    key.push(ns);
    key.extend_from_slice(body);
    key
}

pub fn prefix_info_key(prefix: &[u8]) -> Vec<u8> {
    namespaced(PREFIX_INFO, prefix)
}

/// `[PREFIX_VALUE] ‖ prefix/key`
pub fn value_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    namespaced(PREFIX_VALUE, &join_key(prefix, key))
}

/// Strip the namespace byte, leaving the `prefix/key` path.
pub fn value_path(db_key: &[u8]) -> &[u8] {
    db_key.get(1..).unwrap_or_default()
}

/// Backend bounds for values of `prefix` with `start <= key < end`. An empty
/// `end` covers the rest of the prefix.
pub fn value_range(prefix: &[u8], start: &[u8], end: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let lower = value_key(prefix, start);
    let upper = if end.is_empty() {
        // The delimiter is never 0xff, so this is always bounded.
        prefix_end(&value_key(prefix, b""))
    } else {
        value_key(prefix, end)
    };
    (lower, upper)
}

pub fn block_key(id: &Hash) -> Vec<u8> {
    namespaced(BLOCK, id.as_bytes())
}

pub fn tx_key(id: &Hash) -> Vec<u8> {
    namespaced(TX_INDEX, id.as_bytes())
}
