//! Prefix ownership records and key-path helpers.

use crate::address::Address;
use crate::error::TypesError;
use crate::genesis::Genesis;
use crate::transaction::validate_prefix;
use borsh::{BorshDeserialize, BorshSerialize};

/// Separator between a prefix and a key in a full path (`prefix/key`).
pub const DELIMITER: u8 = b'/';

/// Ownership record of a claimed prefix.
///
/// Expiry is never stored: a prefix is expired whenever `now >= expiry`.
#[derive(Clone, Debug, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrefixInfo {
    pub owner: Address,
    #[cfg_attr(feature = "serde", serde(rename = "createdAt"))]
    pub created: u64,
    #[cfg_attr(feature = "serde", serde(rename = "expiresAt"))]
    pub expiry: u64,
    #[cfg_attr(feature = "serde", serde(rename = "lastRenewedAt"))]
    pub last_renewed: u64,
}

impl PrefixInfo {
    pub fn new(owner: Address, now: u64, lifeline: u64) -> Self {
        Self {
            owner,
            created: now,
            expiry: now.saturating_add(lifeline),
            last_renewed: now,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }
}

/// A key-value pair returned from a range query. `key` is the full
/// `prefix/key` path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Join a prefix and a key into a full path.
pub fn join_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut path = Vec::with_capacity(prefix.len() + 1 + key.len());
    path.extend_from_slice(prefix);
    path.push(DELIMITER);
    path.extend_from_slice(key);
    path
}

/// Split a `prefix/key` path.
///
/// Returns `(prefix, key, range_end)` where `range_end` bounds every key that
/// starts with `key` (empty when unbounded). A bare prefix yields an empty key.
/// At most one delimiter is allowed to keep the key space flat, and both
/// halves are held to the genesis length limits.
pub fn parse_key(path: &[u8], g: &Genesis) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), TypesError> {
    let mut parts = path.splitn(3, |b| *b == DELIMITER);
    let prefix = parts.next().unwrap_or_default().to_vec();
    let key = parts.next().unwrap_or_default().to_vec();
    if parts.next().is_some() {
        return Err(TypesError::InvalidKey(format!(
            "{:?} has more than one delimiter",
            String::from_utf8_lossy(path)
        )));
    }
    validate_prefix(&prefix, g)?;
    if key.len() as u64 > g.max_key_len {
        return Err(TypesError::KeyTooLong {
            max: g.max_key_len as usize,
            actual: key.len(),
        });
    }
    let range_end = prefix_end(&key);
    Ok((prefix, key, range_end))
}

/// Smallest byte string greater than every string starting with `key`.
/// Empty when no such bound exists (empty key or all `0xff`).
pub fn prefix_end(key: &[u8]) -> Vec<u8> {
    let mut end = key.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    Vec::new()
}
