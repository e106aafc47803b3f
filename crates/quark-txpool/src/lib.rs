//! Quark Transaction Pool - Pending transactions ordered by declared price.
//!
//! The executor and VM hooks depend only on the [`Mempool`] contract;
//! [`TxPool`] is the concurrent implementation.

pub mod error;
pub mod ordering;
pub mod validation;
pub mod pool;

pub use error::PoolError;
pub use ordering::PriorityScore;
pub use pool::{PoolConfig, TxPool};

use quark_types::{Hash, Transaction};

/// Capability contract of a mempool.
pub trait Mempool: Send + Sync {
    /// Insert `tx`, reporting why it was refused.
    fn try_add(&self, tx: Transaction) -> Result<Hash, PoolError>;

    /// Insert `tx`. Returns false, with no side effects, when it is a
    /// duplicate, malformed or priced below the posted minimum.
    fn add(&self, tx: Transaction) -> bool {
        self.try_add(tx).is_ok()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &Hash) -> bool;

    /// Remove and return the highest-priced transaction with its declared
    /// price. Ties go to the lowest transaction id.
    fn pop_max(&self) -> Option<(Transaction, u64)>;

    /// Preview transactions in priority order until the next one would push
    /// the cumulative load units past `max_units`. Nothing is removed.
    fn new_txs(&self, max_units: u64) -> Vec<Transaction>;

    /// Remove every listed transaction that is present.
    fn prune(&self, ids: &[Hash]);

    /// Post the minimum price a new transaction must declare.
    fn set_min_price(&self, price: u64);

    fn min_price(&self) -> u64;
}
