//! Block execution.
//!
//! A block is verified against its parent and execution context, then every
//! transaction is applied to an overlay. Any failure invalidates the whole
//! block; the live store is never written here.

use crate::error::ChainError;
use crate::fee_market::ExecutionContext;
use crate::state::PrefixStore;
use quark_storage::{KeyValueRead, KeyValueWrite, Overlay, WriteBatch};
use quark_types::{Codec, StatefulBlock, Transaction, UnsignedTransaction};
use std::collections::HashSet;

/// Apply one transaction's state transition at block time `now`.
pub fn apply_transaction<W: KeyValueWrite + ?Sized>(
    store: &PrefixStore,
    db: &mut W,
    tx: &Transaction,
    now: u64,
) -> Result<(), ChainError> {
    let sender = tx.sender();
    match &tx.unsigned {
        UnsignedTransaction::Claim(claim) => {
            store.claim(db, &claim.prefix, sender, now)?;
        }
        UnsignedTransaction::Set(set) => {
            store.set(db, &set.prefix, &set.key, &set.value, sender, now)?;
        }
        UnsignedTransaction::Lifeline(lifeline) => {
            store.lifeline(db, &lifeline.prefix, sender, now, lifeline.extension)?;
        }
    }
    Ok(())
}

/// Verify `block` on top of `parent` and simulate it over `base`.
///
/// `base` must reflect the parent's post-state (the live store, or an overlay
/// carrying the writes of undecided ancestors). Returns the block's own
/// writes.
pub fn verify_block<R: KeyValueRead + ?Sized>(
    block: &StatefulBlock,
    parent: &StatefulBlock,
    ctx: &ExecutionContext,
    base: &R,
    store: &PrefixStore,
    codec: &Codec,
) -> Result<WriteBatch, ChainError> {
    let genesis = store.genesis();

    if block.height != parent.height + 1 {
        return Err(ChainError::Validation(format!(
            "height {} does not follow parent height {}",
            block.height, parent.height
        )));
    }
    if block.timestamp < parent.timestamp {
        return Err(ChainError::Validation(format!(
            "timestamp {} precedes parent timestamp {}",
            block.timestamp, parent.timestamp
        )));
    }

    let units = block.total_units(genesis);
    if block.cost != units {
        return Err(ChainError::Validation(format!(
            "declared cost {} but transactions use {} units",
            block.cost, units
        )));
    }
    if block.price != ctx.next_price {
        return Err(ChainError::Validation(format!(
            "declared price {} but expected {}",
            block.price, ctx.next_price
        )));
    }
    if block.cost > ctx.next_cost {
        return Err(ChainError::Capacity {
            used: block.cost,
            limit: ctx.next_cost,
        });
    }

    let mut overlay = Overlay::new(base);
    let mut seen = HashSet::with_capacity(block.txs.len());
    for tx in &block.txs {
        let id = codec.id(tx)?;
        if !seen.insert(id) {
            return Err(ChainError::Validation(format!(
                "transaction {id} appears twice in block"
            )));
        }
        tx.validate_basic(genesis)?;
        ctx.check_transaction(&id, tx)?;
        apply_transaction(store, &mut overlay, tx, block.timestamp).map_err(|e| {
            tracing::debug!(tx = %id, error = %e, "Transaction failed in block");
            e
        })?;
    }
    Ok(overlay.into_batch())
}
