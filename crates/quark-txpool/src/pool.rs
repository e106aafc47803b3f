//! Transaction pool management.
//!
//! One reader-writer lock guards both the priority index and the id map, so
//! `len` and `new_txs` run concurrently while `add`, `pop_max` and `prune`
//! are mutually exclusive.

use crate::error::PoolError;
use crate::ordering::PriorityScore;
use crate::validation::validate_transaction;
use crate::Mempool;
use parking_lot::RwLock;
use quark_types::{Codec, CodecError, Genesis, Hash, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for the transaction pool.
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    /// Maximum number of pending transactions (0 = unbounded)
    pub max_size: usize,
}

#[derive(Debug)]
struct PooledTx {
    tx: Transaction,
    units: u64,
}

#[derive(Debug, Default)]
struct PoolIndex {
    by_priority: BTreeSet<PriorityScore>,
    by_id: HashMap<Hash, PooledTx>,
}

impl PoolIndex {
    fn remove(&mut self, id: &Hash) -> Option<PooledTx> {
        let pooled = self.by_id.remove(id)?;
        self.by_priority
            .remove(&PriorityScore::new(pooled.tx.price(), *id));
        Some(pooled)
    }
}

/// Concurrent priority pool.
#[derive(Debug)]
pub struct TxPool {
    codec: Arc<Codec>,
    genesis: Genesis,
    config: PoolConfig,
    index: RwLock<PoolIndex>,
    min_price: AtomicU64,
}

impl TxPool {
    pub fn new(codec: Arc<Codec>, genesis: Genesis, config: PoolConfig) -> Self {
        let min_price = genesis.min_price;
        Self {
            codec,
            genesis,
            config,
            index: RwLock::new(PoolIndex::default()),
            min_price: AtomicU64::new(min_price),
        }
    }

    /// Get a pooled transaction by id.
    pub fn get(&self, id: &Hash) -> Option<Transaction> {
        self.index.read().by_id.get(id).map(|p| p.tx.clone())
    }

    fn tx_id(&self, tx: &Transaction) -> Result<Hash, PoolError> {
        self.codec.id(tx).map_err(|e| match e {
            CodecError::Capacity { size, limit } => PoolError::Oversized { size, limit },
            other => PoolError::Validation(other.to_string()),
        })
    }
}

impl Mempool for TxPool {
    fn try_add(&self, tx: Transaction) -> Result<Hash, PoolError> {
        validate_transaction(&tx, &self.genesis, self.min_price())?;
        let id = self.tx_id(&tx)?;
        let score = PriorityScore::new(tx.price(), id);
        let units = tx.load_units(&self.genesis);

        let mut index = self.index.write();
        if index.by_id.contains_key(&id) {
            return Err(PoolError::Duplicate(id.to_string()));
        }

        if self.config.max_size > 0 && index.by_id.len() >= self.config.max_size {
            // Full: only a better-paying transaction may displace the worst.
            let worst = index.by_priority.first().copied();
            match worst {
                Some(worst) if score > worst => {
                    index.remove(&worst.id);
                    tracing::debug!(evicted = %worst.id, price = worst.price, "Evicted lowest-priced transaction");
                }
                _ => return Err(PoolError::Capacity(self.config.max_size)),
            }
        }

        index.by_priority.insert(score);
        index.by_id.insert(id, PooledTx { tx, units });
        tracing::debug!(tx = %id, price = score.price, units, "Added transaction to pool");
        Ok(id)
    }

    fn len(&self) -> usize {
        self.index.read().by_id.len()
    }

    fn contains(&self, id: &Hash) -> bool {
        self.index.read().by_id.contains_key(id)
    }

    fn pop_max(&self) -> Option<(Transaction, u64)> {
        let mut index = self.index.write();
        let best = index.by_priority.pop_last()?;
        let pooled = index.by_id.remove(&best.id)?;
        Some((pooled.tx, best.price))
    }

    fn new_txs(&self, max_units: u64) -> Vec<Transaction> {
        let index = self.index.read();
        let mut selected = Vec::new();
        let mut used = 0u64;
        for score in index.by_priority.iter().rev() {
            let Some(pooled) = index.by_id.get(&score.id) else {
                continue;
            };
            let next = used.saturating_add(pooled.units);
            if next > max_units {
                break;
            }
            used = next;
            selected.push(pooled.tx.clone());
        }
        selected
    }

    fn prune(&self, ids: &[Hash]) {
        let mut index = self.index.write();
        let mut removed = 0usize;
        for id in ids {
            if index.remove(id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, remaining = index.by_id.len(), "Pruned transactions");
        }
    }

    fn set_min_price(&self, price: u64) {
        self.min_price.store(price, Ordering::Release);
    }

    fn min_price(&self) -> u64 {
        self.min_price.load(Ordering::Acquire)
    }
}
