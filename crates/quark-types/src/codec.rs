//! Versioned binary codec over an explicit type registry.
//!
//! Every payload is laid out as `version (u16 BE) | type id (u16 BE) | borsh`.
//! Borsh is canonical for the types in this crate (no hash maps), so equal
//! values always encode to identical bytes and identities can be derived from
//! the encoding.

use crate::block::StatefulBlock;
use crate::hash::Hash;
use crate::prefix::PrefixInfo;
use crate::transaction::{BaseTx, ClaimTx, LifelineTx, SetTx, Transaction};
use borsh::{BorshDeserialize, BorshSerialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Current codec version.
pub const CODEC_VERSION: u16 = 0;

/// Largest payload accepted, 1 MiB.
pub const MAX_SIZE: usize = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// Errors produced while encoding or decoding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Payload too large: {size} bytes, limit {limit}")]
    Capacity { size: usize, limit: usize },

    #[error("Unknown codec version: {0}")]
    UnknownVersion(u16),

    #[error("Type not registered: {0}")]
    Unregistered(&'static str),

    #[error("Type mismatch: expected id {expected}, got {got}")]
    TypeMismatch { expected: u16, got: u16 },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Registry error: {0}")]
    Registry(String),
}

/// A type with a slot in the codec registry.
pub trait Registered: BorshSerialize + BorshDeserialize {
    const TYPE_NAME: &'static str;
}

impl Registered for BaseTx {
    const TYPE_NAME: &'static str = "BaseTx";
}

impl Registered for ClaimTx {
    const TYPE_NAME: &'static str = "ClaimTx";
}

impl Registered for LifelineTx {
    const TYPE_NAME: &'static str = "LifelineTx";
}

impl Registered for SetTx {
    const TYPE_NAME: &'static str = "SetTx";
}

impl Registered for Transaction {
    const TYPE_NAME: &'static str = "Transaction";
}

impl Registered for StatefulBlock {
    const TYPE_NAME: &'static str = "StatefulBlock";
}

impl Registered for PrefixInfo {
    const TYPE_NAME: &'static str = "PrefixInfo";
}

/// Codec with its type registry.
///
/// Built once during initialization and shared by reference; there is no
/// process-wide instance.
#[derive(Debug, Clone)]
pub struct Codec {
    version: u16,
    max_size: usize,
    registry: BTreeMap<&'static str, u16>,
}

impl Codec {
    /// Build the codec with the standard registry. Registration order fixes
    /// the type ids and must never change for a given version.
    pub fn new() -> Result<Self, CodecError> {
        let mut codec = Self::empty(CODEC_VERSION, MAX_SIZE);
        codec.register::<BaseTx>()?;
        codec.register::<ClaimTx>()?;
        codec.register::<LifelineTx>()?;
        codec.register::<SetTx>()?;
        codec.register::<Transaction>()?;
        codec.register::<StatefulBlock>()?;
        codec.register::<PrefixInfo>()?;
        Ok(codec)
    }

    /// An empty registry, for building custom registries.
    pub fn empty(version: u16, max_size: usize) -> Self {
        Self {
            version,
            max_size,
            registry: BTreeMap::new(),
        }
    }

    /// Register `T`, returning its type id.
    pub fn register<T: Registered>(&mut self) -> Result<u16, CodecError> {
        if self.registry.contains_key(T::TYPE_NAME) {
            return Err(CodecError::Registry(format!(
                "{} registered twice",
                T::TYPE_NAME
            )));
        }
        let id = u16::try_from(self.registry.len())
            .map_err(|_| CodecError::Registry("registry full".into()))?;
        self.registry.insert(T::TYPE_NAME, id);
        Ok(id)
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Type id of `T`, if registered.
    pub fn type_id<T: Registered>(&self) -> Option<u16> {
        self.registry.get(T::TYPE_NAME).copied()
    }

    pub fn marshal<T: Registered>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let type_id = self
            .type_id::<T>()
            .ok_or(CodecError::Unregistered(T::TYPE_NAME))?;
        let body = borsh::to_vec(value).map_err(|e| CodecError::Malformed(e.to_string()))?;

        let size = HEADER_LEN + body.len();
        if size > self.max_size {
            return Err(CodecError::Capacity {
                size,
                limit: self.max_size,
            });
        }

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&type_id.to_be_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn unmarshal<T: Registered>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        // Size is checked before anything is parsed.
        if bytes.len() > self.max_size {
            return Err(CodecError::Capacity {
                size: bytes.len(),
                limit: self.max_size,
            });
        }
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::Malformed(format!(
                "payload of {} bytes has no header",
                bytes.len()
            )));
        }

        let version = u16::from_be_bytes([bytes[0], bytes[1]]);
        if version != self.version {
            return Err(CodecError::UnknownVersion(version));
        }

        let expected = self
            .type_id::<T>()
            .ok_or(CodecError::Unregistered(T::TYPE_NAME))?;
        let got = u16::from_be_bytes([bytes[2], bytes[3]]);
        if got != expected {
            return Err(CodecError::TypeMismatch { expected, got });
        }

        borsh::from_slice(&bytes[HEADER_LEN..]).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    /// Identity of a value: blake3 over its canonical encoding.
    pub fn id<T: Registered>(&self, value: &T) -> Result<Hash, CodecError> {
        Ok(Hash::compute(&self.marshal(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, UnsignedTransaction};
    use proptest::prelude::*;

    fn sample_base() -> BaseTx {
        BaseTx::new(Address::from_bytes([7u8; 20]), 42, 3, Hash::compute(b"parent"))
    }

    #[test]
    fn test_registry_ids_are_stable() {
        let codec = Codec::new().unwrap();
        assert_eq!(codec.type_id::<BaseTx>(), Some(0));
        assert_eq!(codec.type_id::<ClaimTx>(), Some(1));
        assert_eq!(codec.type_id::<LifelineTx>(), Some(2));
        assert_eq!(codec.type_id::<SetTx>(), Some(3));
        assert_eq!(codec.type_id::<Transaction>(), Some(4));
        assert_eq!(codec.type_id::<StatefulBlock>(), Some(5));
        assert_eq!(codec.type_id::<PrefixInfo>(), Some(6));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut codec = Codec::empty(CODEC_VERSION, MAX_SIZE);
        codec.register::<BaseTx>().unwrap();
        assert!(matches!(
            codec.register::<BaseTx>(),
            Err(CodecError::Registry(_))
        ));
    }

    #[test]
    fn test_unregistered_type() {
        let codec = Codec::empty(CODEC_VERSION, MAX_SIZE);
        assert_eq!(
            codec.marshal(&sample_base()),
            Err(CodecError::Unregistered("BaseTx"))
        );
    }

    #[test]
    fn test_header_layout() {
        let codec = Codec::new().unwrap();
        let bytes = codec.marshal(&PrefixInfo::default()).unwrap();
        assert_eq!(&bytes[..2], &CODEC_VERSION.to_be_bytes());
        assert_eq!(&bytes[2..4], &6u16.to_be_bytes());
    }

    #[test]
    fn test_block_roundtrip() {
        let codec = Codec::new().unwrap();
        let block = StatefulBlock {
            parent: Hash::compute(b"p"),
            height: 9,
            timestamp: 1_700_000_000,
            txs: vec![
                Transaction::claim(sample_base(), "hello.avax"),
                Transaction::set(sample_base(), "hello.avax", "foo1", "hello world 1"),
                Transaction::lifeline(sample_base(), "hello.avax", 3600),
            ],
            cost: 17,
            price: 2,
        };
        let bytes = codec.marshal(&block).unwrap();
        let decoded: StatefulBlock = codec.unmarshal(&bytes).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(codec.id(&decoded).unwrap(), codec.id(&block).unwrap());
    }

    #[test]
    fn test_oversized_payload_rejected_before_parsing() {
        let codec = Codec::new().unwrap();
        // Valid header, garbage body: only the size check can trigger.
        let mut bytes = vec![0xffu8; MAX_SIZE + 1];
        bytes[..2].copy_from_slice(&CODEC_VERSION.to_be_bytes());
        bytes[2..4].copy_from_slice(&4u16.to_be_bytes());
        assert_eq!(
            codec.unmarshal::<Transaction>(&bytes),
            Err(CodecError::Capacity {
                size: MAX_SIZE + 1,
                limit: MAX_SIZE
            })
        );
    }

    #[test]
    fn test_oversized_value_rejected_on_marshal() {
        let codec = Codec::new().unwrap();
        let tx = Transaction::set(sample_base(), "p", "k", vec![0u8; MAX_SIZE]);
        assert!(matches!(
            codec.marshal(&tx),
            Err(CodecError::Capacity { .. })
        ));
    }

    #[test]
    fn test_type_mismatch_and_version() {
        let codec = Codec::new().unwrap();
        let bytes = codec.marshal(&PrefixInfo::default()).unwrap();
        assert!(matches!(
            codec.unmarshal::<Transaction>(&bytes),
            Err(CodecError::TypeMismatch { expected: 4, got: 6 })
        ));

        let mut wrong_version = bytes.clone();
        wrong_version[1] = 9;
        assert_eq!(
            codec.unmarshal::<PrefixInfo>(&wrong_version),
            Err(CodecError::UnknownVersion(9))
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = Codec::new().unwrap();
        let mut bytes = codec.marshal(&PrefixInfo::default()).unwrap();
        bytes.push(0);
        assert!(matches!(
            codec.unmarshal::<PrefixInfo>(&bytes),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            codec.unmarshal::<PrefixInfo>(&[0u8; 3]),
            Err(CodecError::Malformed(_))
        ));
    }

    fn arb_base() -> impl Strategy<Value = BaseTx> {
        (any::<[u8; 20]>(), any::<u64>(), any::<u64>(), any::<[u8; 32]>()).prop_map(
            |(sender, nonce, price, block)| {
                BaseTx::new(Address::from_bytes(sender), nonce, price, Hash::from_bytes(block))
            },
        )
    }

    fn arb_tx() -> impl Strategy<Value = Transaction> {
        let bytes = || proptest::collection::vec(any::<u8>(), 0..64);
        prop_oneof![
            (arb_base(), bytes()).prop_map(|(base, prefix)| Transaction::claim(base, prefix)),
            (arb_base(), bytes(), bytes(), bytes())
                .prop_map(|(base, p, k, v)| Transaction::set(base, p, k, v)),
            (arb_base(), bytes(), any::<u64>())
                .prop_map(|(base, p, ext)| Transaction::lifeline(base, p, ext)),
        ]
    }

    proptest! {
        #[test]
        fn prop_transaction_roundtrip(tx in arb_tx()) {
            let codec = Codec::new().unwrap();
            let bytes = codec.marshal(&tx).unwrap();
            let decoded: Transaction = codec.unmarshal(&bytes).unwrap();
            prop_assert_eq!(&decoded, &tx);
            // Canonical: re-encoding yields the same bytes.
            prop_assert_eq!(codec.marshal(&decoded).unwrap(), bytes);
        }

        #[test]
        fn prop_payload_roundtrip(tx in arb_tx()) {
            let codec = Codec::new().unwrap();
            match tx.unsigned {
                UnsignedTransaction::Claim(inner) => {
                    let decoded: ClaimTx = codec.unmarshal(&codec.marshal(&inner).unwrap()).unwrap();
                    prop_assert_eq!(decoded, inner);
                }
                UnsignedTransaction::Set(inner) => {
                    let decoded: SetTx = codec.unmarshal(&codec.marshal(&inner).unwrap()).unwrap();
                    prop_assert_eq!(decoded, inner);
                }
                UnsignedTransaction::Lifeline(inner) => {
                    let decoded: LifelineTx = codec.unmarshal(&codec.marshal(&inner).unwrap()).unwrap();
                    prop_assert_eq!(decoded, inner);
                }
            }
        }

        #[test]
        fn prop_prefix_info_roundtrip(owner in any::<[u8; 20]>(), created in any::<u64>(), life in any::<u32>()) {
            let codec = Codec::new().unwrap();
            let info = PrefixInfo::new(Address::from_bytes(owner), created, u64::from(life));
            let decoded: PrefixInfo = codec.unmarshal(&codec.marshal(&info).unwrap()).unwrap();
            prop_assert_eq!(decoded, info);
        }
    }
}
