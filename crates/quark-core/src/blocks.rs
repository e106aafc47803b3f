//! Accepted block records and the transaction index.

use crate::error::ChainError;
use crate::fee_market::BlockLookup;
use crate::keys;
use quark_storage::{Database, WriteBatch};
use quark_types::{Codec, Hash, StatefulBlock};
use std::sync::Arc;

/// Block store for accepted blocks
pub struct BlockStore {
    db: Arc<dyn Database>,
    codec: Arc<Codec>,
}

impl BlockStore {
    pub fn new(db: Arc<dyn Database>, codec: Arc<Codec>) -> Self {
        Self { db, codec }
    }

    /// Get an accepted block by id
    pub fn get(&self, id: &Hash) -> Result<Option<StatefulBlock>, ChainError> {
        match self.db.get(&keys::block_key(id))? {
            Some(raw) => Ok(Some(self.codec.unmarshal(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn last_accepted(&self) -> Result<Option<Hash>, ChainError> {
        match self.db.get(keys::LAST_ACCEPTED)? {
            Some(raw) => Ok(Some(Hash::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn has_tx(&self, tx_id: &Hash) -> Result<bool, ChainError> {
        Ok(self.db.has(&keys::tx_key(tx_id))?)
    }

    /// Add the block record, its transaction index entries and the
    /// last-accepted pointer to `batch`.
    pub fn stage(
        &self,
        batch: &mut WriteBatch,
        id: &Hash,
        block: &StatefulBlock,
    ) -> Result<(), ChainError> {
        batch.put(&keys::block_key(id), &self.codec.marshal(block)?);
        for tx in &block.txs {
            batch.put(&keys::tx_key(&self.codec.id(tx)?), id.as_bytes());
        }
        batch.put(keys::LAST_ACCEPTED, id.as_bytes());
        Ok(())
    }
}

impl BlockLookup for BlockStore {
    fn get_block(&self, id: &Hash) -> Result<Option<StatefulBlock>, ChainError> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quark_storage::MemoryDatabase;
    use quark_types::{Address, BaseTx, Genesis, Transaction};

    #[test]
    fn test_stage_and_read_back() {
        let codec = Arc::new(Codec::new().unwrap());
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let store = BlockStore::new(Arc::clone(&db), Arc::clone(&codec));
        assert_eq!(store.last_accepted().unwrap(), None);

        let tx = Transaction::claim(BaseTx::new(Address::ZERO, 0, 1, Hash::ZERO), "p");
        let mut block = StatefulBlock::genesis(&Genesis::default());
        block.txs.push(tx.clone());
        let id = codec.id(&block).unwrap();

        let mut batch = WriteBatch::new();
        store.stage(&mut batch, &id, &block).unwrap();
        // nothing is visible before the batch is written
        assert_eq!(store.get(&id).unwrap(), None);
        db.write_batch(batch).unwrap();

        let tx_id = codec.id(&tx).unwrap();
        assert_eq!(store.get(&id).unwrap(), Some(block));
        assert_eq!(store.last_accepted().unwrap(), Some(id));
        assert!(store.has_tx(&tx_id).unwrap());
        assert!(!store.has_tx(&Hash::ZERO).unwrap());
    }
}
