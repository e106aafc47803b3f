//! Quark Types - Core type definitions for the Quark VM.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - Addresses (20-byte owner identities)
//! - Hashes (32-byte, blake3 digests)
//! - Transactions (claim / set / lifeline payloads)
//! - Stateful blocks and prefix ownership records
//! - Genesis parameters and the versioned binary codec

pub mod address;
pub mod hash;
pub mod transaction;
pub mod block;
pub mod prefix;
pub mod genesis;
pub mod codec;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use hash::Hash;
pub use transaction::{validate_prefix, BaseTx, ClaimTx, LifelineTx, SetTx, Transaction, UnsignedTransaction};
pub use block::StatefulBlock;
pub use prefix::{join_key, parse_key, prefix_end, KeyValue, PrefixInfo, DELIMITER};
pub use genesis::Genesis;
pub use codec::{Codec, CodecError, Registered, CODEC_VERSION, MAX_SIZE};
pub use error::TypesError;
