//! VM hooks called by the host consensus engine.
//!
//! Lifecycle of a block: `parse_block` or `build_block`, then `verify`
//! (which ends in the [`Vm::verified`] hook), then exactly one of
//! [`Vm::accepted`] or [`Vm::rejected`].

use crate::blocks::BlockStore;
use crate::clock::Clock;
use crate::config::VmConfig;
use crate::error::ChainError;
use crate::executor::{apply_transaction, verify_block};
use crate::fee_market::{execution_context, BlockLookup, ExecutionContext};
use crate::state::PrefixStore;
use dashmap::DashMap;
use parking_lot::RwLock;
use quark_storage::{Database, Overlay, WriteBatch};
use quark_txpool::{Mempool, PoolConfig, TxPool};
use quark_types::{Address, Codec, Genesis, Hash, StatefulBlock, Transaction};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decision state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// Parsed or built, not yet verified
    Unverified,
    /// Verified, awaiting a decision
    Processing,
    Accepted,
}

/// A block with its identity, encoding and decision state.
#[derive(Debug, Clone)]
pub struct StatelessBlock {
    block: StatefulBlock,
    id: Hash,
    bytes: Vec<u8>,
    status: BlockStatus,
    /// Writes of this block alone, set once verified
    pending: Option<WriteBatch>,
}

impl StatelessBlock {
    pub fn new(codec: &Codec, block: StatefulBlock) -> Result<Self, ChainError> {
        let bytes = codec.marshal(&block)?;
        Ok(Self {
            id: Hash::compute(&bytes),
            block,
            bytes,
            status: BlockStatus::Unverified,
            pending: None,
        })
    }

    pub fn parse(codec: &Codec, bytes: &[u8]) -> Result<Self, ChainError> {
        let block: StatefulBlock = codec.unmarshal(bytes)?;
        Ok(Self {
            id: Hash::compute(bytes),
            block,
            bytes: bytes.to_vec(),
            status: BlockStatus::Unverified,
            pending: None,
        })
    }

    fn with_status(mut self, status: BlockStatus) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> Hash {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn status(&self) -> BlockStatus {
        self.status
    }

    pub fn block(&self) -> &StatefulBlock {
        &self.block
    }

    pub fn parent(&self) -> Hash {
        self.block.parent
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn timestamp(&self) -> u64 {
        self.block.timestamp
    }

    pub fn txs(&self) -> &[Transaction] {
        &self.block.txs
    }
}

/// Services the VM exposes to blocks and the host.
pub trait Vm: Send + Sync {
    fn genesis(&self) -> &Genesis;
    fn is_bootstrapped(&self) -> bool;
    fn state(&self) -> Arc<dyn Database>;
    fn mempool(&self) -> Arc<dyn Mempool>;
    fn get_stateless_block(&self, id: &Hash) -> Result<StatelessBlock, ChainError>;
    fn beneficiary(&self) -> Option<Address>;
    fn set_beneficiary(&self, beneficiary: Address);
    fn execution_context(&self, now: u64, parent: &Hash) -> Result<ExecutionContext, ChainError>;
    fn verified(&self, block: &StatelessBlock);
    fn rejected(&self, block: &StatelessBlock);
    fn accepted(&self, block: &StatelessBlock);
}

/// The Quark VM.
pub struct ChainVm {
    genesis: Genesis,
    codec: Arc<Codec>,
    db: Arc<dyn Database>,
    store: PrefixStore,
    blocks: BlockStore,
    mempool: Arc<dyn Mempool>,
    clock: Arc<dyn Clock>,
    /// Verified, undecided blocks
    verified: DashMap<Hash, StatelessBlock>,
    last_accepted: RwLock<(Hash, StatefulBlock)>,
    bootstrapped: AtomicBool,
    beneficiary: RwLock<Option<Address>>,
    max_block_txs: usize,
}

impl ChainVm {
    /// Build a VM from configuration, with a [`TxPool`] mempool.
    pub fn from_config(
        config: &VmConfig,
        db: Arc<dyn Database>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let codec = Arc::new(Codec::new()?);
        let mempool = Arc::new(TxPool::new(
            Arc::clone(&codec),
            config.genesis.clone(),
            PoolConfig {
                max_size: config.mempool_max_size,
            },
        ));
        let vm = Self::initialize(config.genesis.clone(), codec, db, mempool, clock)?
            .with_max_block_txs(config.build_block_max_txs);
        if let Some(beneficiary) = config.beneficiary()? {
            vm.set_beneficiary(beneficiary);
        }
        Ok(vm)
    }

    /// Open the chain in `db`, writing the genesis block on first start and
    /// resuming from the last accepted block otherwise.
    pub fn initialize(
        genesis: Genesis,
        codec: Arc<Codec>,
        db: Arc<dyn Database>,
        mempool: Arc<dyn Mempool>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChainError> {
        genesis.validate()?;
        let blocks = BlockStore::new(Arc::clone(&db), Arc::clone(&codec));

        let last_accepted = match blocks.last_accepted()? {
            Some(id) => {
                let block = blocks.get(&id)?.ok_or_else(|| {
                    ChainError::NotFound(format!("last accepted block {id}"))
                })?;
                tracing::info!(block = %id, height = block.height, "Resuming chain");
                (id, block)
            }
            None => {
                let block = StatefulBlock::genesis(&genesis);
                let id = codec.id(&block)?;
                let mut batch = WriteBatch::new();
                blocks.stage(&mut batch, &id, &block)?;
                db.write_batch(batch)?;
                tracing::info!(block = %id, "Wrote genesis block");
                (id, block)
            }
        };

        let vm = Self {
            store: PrefixStore::new(Arc::clone(&codec), genesis.clone()),
            genesis,
            codec,
            db,
            blocks,
            mempool,
            clock,
            verified: DashMap::new(),
            last_accepted: RwLock::new(last_accepted),
            bootstrapped: AtomicBool::new(false),
            beneficiary: RwLock::new(None),
            max_block_txs: 0,
        };
        vm.post_min_price();
        Ok(vm)
    }

    /// Cap the number of transactions per built block (0 = no cap).
    pub fn with_max_block_txs(mut self, max: usize) -> Self {
        self.max_block_txs = max;
        self
    }

    pub fn set_bootstrapped(&self, bootstrapped: bool) {
        self.bootstrapped.store(bootstrapped, Ordering::Release);
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    pub fn prefix_store(&self) -> &PrefixStore {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn last_accepted(&self) -> (Hash, StatefulBlock) {
        self.last_accepted.read().clone()
    }

    /// Whether `tx_id` is part of an accepted block.
    pub fn has_tx(&self, tx_id: &Hash) -> Result<bool, ChainError> {
        self.blocks.has_tx(tx_id)
    }

    pub fn parse_block(&self, bytes: &[u8]) -> Result<StatelessBlock, ChainError> {
        let block = StatelessBlock::parse(&self.codec, bytes)?;
        if let Some(known) = self.verified.get(&block.id) {
            return Ok(known.clone());
        }
        Ok(block)
    }

    /// Writes of undecided ancestors of `parent`, oldest first.
    fn pending_writes(&self, parent: &Hash) -> WriteBatch {
        let mut chain = Vec::new();
        let mut cursor = *parent;
        while let Some(entry) = self.verified.get(&cursor) {
            if let Some(pending) = &entry.pending {
                chain.push(pending.clone());
            }
            cursor = entry.parent();
        }
        let mut merged = WriteBatch::new();
        for batch in chain.into_iter().rev() {
            merged.merge(batch);
        }
        merged
    }

    /// Verify `block` and, on success, hand it to the [`Vm::verified`] hook.
    pub fn verify(&self, mut block: StatelessBlock) -> Result<StatelessBlock, ChainError> {
        let parent = self
            .lookup_block(&block.parent())?
            .ok_or_else(|| ChainError::Validation(format!("unknown parent block {}", block.parent())))?;
        let ctx = self.execution_context(block.timestamp(), &block.parent())?;

        let ancestors = Overlay::with_batch(self.db.as_ref(), self.pending_writes(&block.parent()));
        let batch = verify_block(&block.block, &parent, &ctx, &ancestors, &self.store, &self.codec)
            .map_err(|e| {
                tracing::debug!(block = %block.id, error = %e, "Block failed verification");
                e
            })?;

        block.pending = Some(batch);
        block.status = BlockStatus::Processing;
        self.verified(&block);
        Ok(block)
    }

    /// Assemble a block on the last accepted block at the clock's time.
    pub fn build_block(&self) -> Result<StatelessBlock, ChainError> {
        self.build_block_at(self.clock.now())
    }

    /// Assemble a block at `now` from the mempool's best transactions.
    ///
    /// Transactions invalid under the execution context or failing
    /// simulation are dropped from the mempool.
    pub fn build_block_at(&self, now: u64) -> Result<StatelessBlock, ChainError> {
        let (parent_id, parent) = self.last_accepted();
        let ctx = self.execution_context(now, &parent_id)?;
        let mut overlay = Overlay::new(self.db.as_ref());

        let mut txs = Vec::new();
        let mut units = 0u64;
        let mut seen = HashSet::new();
        let mut invalid = Vec::new();
        for tx in self.mempool.new_txs(ctx.next_cost) {
            if self.max_block_txs > 0 && txs.len() >= self.max_block_txs {
                break;
            }
            let id = self.codec.id(&tx)?;
            if !seen.insert(id) {
                continue;
            }
            let tx_units = tx.load_units(&self.genesis);
            if units.saturating_add(tx_units) > ctx.next_cost {
                break;
            }

            let outcome = tx
                .validate_basic(&self.genesis)
                .map_err(ChainError::from)
                .and_then(|_| ctx.check_transaction(&id, &tx))
                .and_then(|_| apply_transaction(&self.store, &mut overlay, &tx, now));
            match outcome {
                Ok(()) => {
                    units += tx_units;
                    txs.push(tx);
                }
                Err(e) => {
                    tracing::debug!(tx = %id, error = %e, "Dropping transaction from proposal");
                    invalid.push(id);
                }
            }
        }
        self.mempool.prune(&invalid);

        if txs.is_empty() {
            return Err(ChainError::NotFound("no executable transactions".into()));
        }

        let block = StatefulBlock {
            parent: parent_id,
            height: parent.height + 1,
            timestamp: now,
            txs,
            cost: units,
            price: ctx.next_price,
        };
        let built = StatelessBlock::new(&self.codec, block)?;
        tracing::debug!(block = %built.id, height = built.height(), txs = built.txs().len(), units, "Built block");
        Ok(built)
    }

    fn lookup_block(&self, id: &Hash) -> Result<Option<StatefulBlock>, ChainError> {
        if let Some(entry) = self.verified.get(id) {
            return Ok(Some(entry.block.clone()));
        }
        self.blocks.get(id)
    }

    /// Post the next block's minimum price to the mempool.
    fn post_min_price(&self) {
        let (id, block) = self.last_accepted();
        match self.execution_context(block.timestamp, &id) {
            Ok(ctx) => self.mempool.set_min_price(ctx.next_price),
            Err(e) => tracing::warn!(error = %e, "Could not compute next price"),
        }
    }

    fn commit(&self, block: &StatelessBlock, pending: WriteBatch) -> Result<(), ChainError> {
        let mut batch = pending;
        self.blocks.stage(&mut batch, &block.id, &block.block)?;
        self.db.write_batch(batch)?;
        *self.last_accepted.write() = (block.id, block.block.clone());
        Ok(())
    }
}

impl BlockLookup for ChainVm {
    fn get_block(&self, id: &Hash) -> Result<Option<StatefulBlock>, ChainError> {
        self.lookup_block(id)
    }
}

impl Vm for ChainVm {
    fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }

    fn state(&self) -> Arc<dyn Database> {
        Arc::clone(&self.db)
    }

    fn mempool(&self) -> Arc<dyn Mempool> {
        Arc::clone(&self.mempool)
    }

    fn get_stateless_block(&self, id: &Hash) -> Result<StatelessBlock, ChainError> {
        if let Some(entry) = self.verified.get(id) {
            return Ok(entry.clone());
        }
        let block = self
            .blocks
            .get(id)?
            .ok_or_else(|| ChainError::NotFound(format!("block {id}")))?;
        Ok(StatelessBlock::new(&self.codec, block)?.with_status(BlockStatus::Accepted))
    }

    fn beneficiary(&self) -> Option<Address> {
        *self.beneficiary.read()
    }

    fn set_beneficiary(&self, beneficiary: Address) {
        *self.beneficiary.write() = Some(beneficiary);
    }

    fn execution_context(&self, now: u64, parent: &Hash) -> Result<ExecutionContext, ChainError> {
        execution_context(now, parent, self, &self.codec, &self.genesis)
    }

    fn verified(&self, block: &StatelessBlock) {
        if block.pending.is_none() {
            tracing::warn!(block = %block.id, "Ignoring unverified block");
            return;
        }
        let mut entry = block.clone();
        entry.status = BlockStatus::Processing;
        self.verified.insert(block.id, entry);
        tracing::debug!(block = %block.id, height = block.height(), "Block verified");
    }

    fn rejected(&self, block: &StatelessBlock) {
        let Some((_, entry)) = self.verified.remove(&block.id) else {
            tracing::warn!(block = %block.id, "Ignoring rejection of unknown block");
            return;
        };
        let mut readded = 0usize;
        for tx in entry.txs() {
            if self.mempool.add(tx.clone()) {
                readded += 1;
            }
        }
        tracing::warn!(block = %block.id, height = block.height(), readded, "Block rejected");
    }

    fn accepted(&self, block: &StatelessBlock) {
        let Some((_, entry)) = self.verified.remove(&block.id) else {
            tracing::warn!(block = %block.id, "Ignoring acceptance of unknown block");
            return;
        };
        let pending = entry.pending.clone().unwrap_or_default();
        if let Err(e) = self.commit(&entry, pending) {
            tracing::error!(block = %block.id, error = %e, "Failed to commit accepted block");
            return;
        }

        let mut ids = Vec::with_capacity(entry.txs().len());
        for tx in entry.txs() {
            match self.codec.id(tx) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(error = %e, "Could not hash accepted transaction"),
            }
        }
        self.mempool.prune(&ids);
        self.post_min_price();
        tracing::info!(
            block = %block.id,
            height = block.height(),
            txs = ids.len(),
            cost = entry.block.cost,
            price = entry.block.price,
            "Block accepted"
        );
    }
}
