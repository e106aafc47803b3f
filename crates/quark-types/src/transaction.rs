use crate::address::Address;
use crate::error::TypesError;
use crate::genesis::Genesis;
use crate::hash::Hash;
use crate::prefix::DELIMITER;
use borsh::{BorshDeserialize, BorshSerialize};

/// Fields shared by every transaction payload.
#[derive(Clone, Debug, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct BaseTx {
    /// Identity issuing the transaction
    pub sender: Address,
    /// Anti-replay marker; distinguishes otherwise identical transactions
    pub nonce: u64,
    /// Declared price per load unit
    pub price: u64,
    /// Recent block the transaction was built against
    pub block_id: Hash,
}

impl BaseTx {
    pub fn new(sender: Address, nonce: u64, price: u64, block_id: Hash) -> Self {
        Self {
            sender,
            nonce,
            price,
            block_id,
        }
    }
}

/// Request exclusive, time-bounded ownership of a prefix.
#[derive(Clone, Debug, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct ClaimTx {
    pub base: BaseTx,
    pub prefix: Vec<u8>,
}

/// Write (or delete, when `value` is empty) a key inside an owned prefix.
#[derive(Clone, Debug, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct SetTx {
    pub base: BaseTx,
    pub prefix: Vec<u8>,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Extend the expiry of an existing claim by `extension` seconds.
#[derive(Clone, Debug, PartialEq, Eq, Default, BorshSerialize, BorshDeserialize)]
pub struct LifelineTx {
    pub base: BaseTx,
    pub prefix: Vec<u8>,
    pub extension: u64,
}

/// Exactly one payload kind per transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum UnsignedTransaction {
    Claim(ClaimTx),
    Set(SetTx),
    Lifeline(LifelineTx),
}

/// Transaction envelope. Its identity is the hash of its canonical encoding.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub unsigned: UnsignedTransaction,
}

impl Transaction {
    pub fn new(unsigned: UnsignedTransaction) -> Self {
        Self { unsigned }
    }

    pub fn claim(base: BaseTx, prefix: impl Into<Vec<u8>>) -> Self {
        Self::new(UnsignedTransaction::Claim(ClaimTx {
            base,
            prefix: prefix.into(),
        }))
    }

    pub fn set(
        base: BaseTx,
        prefix: impl Into<Vec<u8>>,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self::new(UnsignedTransaction::Set(SetTx {
            base,
            prefix: prefix.into(),
            key: key.into(),
            value: value.into(),
        }))
    }

    pub fn lifeline(base: BaseTx, prefix: impl Into<Vec<u8>>, extension: u64) -> Self {
        Self::new(UnsignedTransaction::Lifeline(LifelineTx {
            base,
            prefix: prefix.into(),
            extension,
        }))
    }

    pub fn base(&self) -> &BaseTx {
        match &self.unsigned {
            UnsignedTransaction::Claim(tx) => &tx.base,
            UnsignedTransaction::Set(tx) => &tx.base,
            UnsignedTransaction::Lifeline(tx) => &tx.base,
        }
    }

    pub fn prefix(&self) -> &[u8] {
        match &self.unsigned {
            UnsignedTransaction::Claim(tx) => &tx.prefix,
            UnsignedTransaction::Set(tx) => &tx.prefix,
            UnsignedTransaction::Lifeline(tx) => &tx.prefix,
        }
    }

    pub fn sender(&self) -> Address {
        self.base().sender
    }

    pub fn price(&self) -> u64 {
        self.base().price
    }

    pub fn block_id(&self) -> Hash {
        self.base().block_id
    }

    /// Deterministic resource cost of executing this transaction.
    pub fn load_units(&self, g: &Genesis) -> u64 {
        let extra = match &self.unsigned {
            UnsignedTransaction::Claim(tx) => {
                // Shorter prefixes are scarcer and therefore cost more.
                let len = tx.prefix.len() as u64;
                let rarity = g.max_prefix_len.saturating_sub(len).saturating_add(1);
                g.claim_load_multiplier.saturating_mul(rarity)
            }
            UnsignedTransaction::Set(tx) => ceil_div(tx.value.len() as u64, g.value_unit_size),
            UnsignedTransaction::Lifeline(tx) => ceil_div(tx.extension, g.lifeline_unit_secs),
        };
        g.base_tx_units.saturating_add(extra)
    }

    /// Total declared fee: `price * units`.
    pub fn fee(&self, g: &Genesis) -> u64 {
        self.price().saturating_mul(self.load_units(g))
    }

    /// Structural checks that need no chain state.
    pub fn validate_basic(&self, g: &Genesis) -> Result<(), TypesError> {
        validate_prefix(self.prefix(), g)?;
        match &self.unsigned {
            UnsignedTransaction::Claim(_) => Ok(()),
            UnsignedTransaction::Set(tx) => {
                if tx.key.is_empty() {
                    return Err(TypesError::InvalidKey("empty key".into()));
                }
                if tx.key.contains(&DELIMITER) {
                    return Err(TypesError::InvalidKey("key contains delimiter".into()));
                }
                if tx.key.len() as u64 > g.max_key_len {
                    return Err(TypesError::KeyTooLong {
                        max: g.max_key_len as usize,
                        actual: tx.key.len(),
                    });
                }
                if tx.value.len() as u64 > g.max_value_size {
                    return Err(TypesError::ValueTooLarge {
                        max: g.max_value_size as usize,
                        actual: tx.value.len(),
                    });
                }
                Ok(())
            }
            UnsignedTransaction::Lifeline(tx) => {
                if tx.extension == 0 {
                    return Err(TypesError::InvalidKey("lifeline extension must be > 0".into()));
                }
                Ok(())
            }
        }
    }
}

/// Non-empty, delimiter-free and within `max_prefix_len`.
pub fn validate_prefix(prefix: &[u8], g: &Genesis) -> Result<(), TypesError> {
    if prefix.is_empty() {
        return Err(TypesError::InvalidKey("empty prefix".into()));
    }
    if prefix.contains(&DELIMITER) {
        return Err(TypesError::InvalidKey("prefix contains delimiter".into()));
    }
    if prefix.len() as u64 > g.max_prefix_len {
        return Err(TypesError::PrefixTooLong {
            max: g.max_prefix_len as usize,
            actual: prefix.len(),
        });
    }
    Ok(())
}

fn ceil_div(n: u64, d: u64) -> u64 {
    if d == 0 {
        return 0;
    }
    n / d + u64::from(n % d != 0)
}
