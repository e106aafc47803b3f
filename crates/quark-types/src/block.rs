use crate::hash::Hash;
use crate::transaction::Transaction;
use crate::genesis::Genesis;
use borsh::{BorshDeserialize, BorshSerialize};

/// Block contents as proposed and persisted.
///
/// The identity of a block is the hash of its canonical encoding, computed by
/// the codec (see [`crate::Codec::id`]).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StatefulBlock {
    /// Identity of the parent block
    pub parent: Hash,
    /// Block height (parent height + 1)
    pub height: u64,
    /// Unix timestamp (seconds), never below the parent's
    pub timestamp: u64,
    /// Ordered transactions
    pub txs: Vec<Transaction>,
    /// Declared load units consumed by `txs`
    pub cost: u64,
    /// Minimum price in force for this block
    pub price: u64,
}

impl StatefulBlock {
    /// Create the genesis block for the given parameters.
    pub fn genesis(g: &Genesis) -> Self {
        Self {
            parent: Hash::ZERO,
            height: 0,
            timestamp: g.genesis_timestamp,
            txs: Vec::new(),
            cost: 0,
            price: g.min_price,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.parent.is_zero()
    }

    /// Sum of the load units of every transaction in the block.
    pub fn total_units(&self, g: &Genesis) -> u64 {
        self.txs
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.load_units(g)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, BaseTx};

    #[test]
    fn test_genesis_block() {
        let g = Genesis::default();
        let block = StatefulBlock::genesis(&g);
        assert!(block.is_genesis());
        assert_eq!(block.price, g.min_price);
        assert_eq!(block.total_units(&g), 0);
    }

    #[test]
    fn test_total_units() {
        let g = Genesis::default();
        let base = BaseTx::new(Address::ZERO, 0, 1, Hash::ZERO);
        let txs = vec![
            Transaction::set(base.clone(), "p", "k", "v"),
            Transaction::lifeline(base, "p", 1),
        ];
        let expected: u64 = txs.iter().map(|t| t.load_units(&g)).sum();
        let block = StatefulBlock {
            parent: Hash::ZERO,
            height: 1,
            timestamp: 1,
            txs,
            cost: expected,
            price: 1,
        };
        assert_eq!(block.total_units(&g), expected);
    }
}
