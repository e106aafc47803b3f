//! Fee market calculations.
//!
//! Pricing for the next block is a pure function of the trailing
//! `lookback_window` accepted blocks: no wall clock, no randomness.

use crate::error::ChainError;
use quark_types::{Codec, Genesis, Hash, StatefulBlock, Transaction};
use std::collections::HashSet;

/// Host-provided access to blocks by id.
pub trait BlockLookup {
    fn get_block(&self, id: &Hash) -> Result<Option<StatefulBlock>, ChainError>;
}

/// Pricing and replay-protection state for the block built on a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub recent_block_ids: HashSet<Hash>,
    pub recent_tx_ids: HashSet<Hash>,
    pub recent_units: u64,
    /// Per-block declared costs, oldest first
    pub block_costs: Vec<u64>,
    /// Per-block declared prices, oldest first
    pub prices: Vec<u64>,
    /// Load-unit cap of the next block
    pub next_cost: u64,
    /// Minimum price of the next block
    pub next_price: u64,
}

impl ExecutionContext {
    /// Check that `tx` may enter the next block.
    pub fn check_transaction(&self, id: &Hash, tx: &Transaction) -> Result<(), ChainError> {
        if self.recent_tx_ids.contains(id) {
            return Err(ChainError::Duplicate(id.to_string()));
        }
        if tx.price() < self.next_price {
            return Err(ChainError::Fee {
                required: self.next_price,
                offered: tx.price(),
            });
        }
        if !self.recent_block_ids.contains(&tx.block_id()) {
            return Err(ChainError::Validation(format!(
                "transaction {} references block {} outside the recent window",
                id,
                tx.block_id()
            )));
        }
        Ok(())
    }
}

/// Next block's minimum price.
///
/// Above target the price rises by `max(1, price * pct / 100)`; below target
/// it falls by the same step, never under `min_price`.
pub fn next_price(parent_price: u64, recent_units: u64, genesis: &Genesis) -> u64 {
    let step = (u128::from(parent_price) * u128::from(genesis.price_change_pct) / 100)
        .max(1)
        .min(u128::from(u64::MAX)) as u64;

    match recent_units.cmp(&genesis.target_units) {
        std::cmp::Ordering::Greater => parent_price.saturating_add(step),
        std::cmp::Ordering::Less => parent_price
            .saturating_sub(step)
            .max(genesis.min_price),
        std::cmp::Ordering::Equal => parent_price,
    }
}

/// Next block's load-unit cap.
///
/// A block arriving a full target interval after its parent may use
/// `max_block_cost`; earlier blocks get a proportional share, floored at
/// `min_block_cost`.
pub fn next_block_cost(now: u64, parent_timestamp: u64, genesis: &Genesis) -> Result<u64, ChainError> {
    let elapsed = now.checked_sub(parent_timestamp).ok_or_else(|| {
        ChainError::Validation(format!(
            "timestamp {now} is before parent timestamp {parent_timestamp}"
        ))
    })?;

    if genesis.block_target_secs == 0 || elapsed >= genesis.block_target_secs {
        return Ok(genesis.max_block_cost);
    }
    let scaled = u128::from(genesis.max_block_cost) * u128::from(elapsed)
        / u128::from(genesis.block_target_secs);
    Ok((scaled as u64).max(genesis.min_block_cost))
}

/// Build the execution context for a block at `now` on top of `parent`.
pub fn execution_context(
    now: u64,
    parent: &Hash,
    blocks: &dyn BlockLookup,
    codec: &Codec,
    genesis: &Genesis,
) -> Result<ExecutionContext, ChainError> {
    let parent_block = blocks
        .get_block(parent)?
        .ok_or_else(|| ChainError::Validation(format!("unknown parent block {parent}")))?;
    let next_cost = next_block_cost(now, parent_block.timestamp, genesis)?;

    let mut ctx = ExecutionContext::default();
    let mut walked = Vec::new();
    let mut cursor = Some((*parent, parent_block.clone()));
    while let Some((id, block)) = cursor.take() {
        ctx.recent_block_ids.insert(id);
        for tx in &block.txs {
            ctx.recent_tx_ids.insert(codec.id(tx)?);
        }
        ctx.recent_units = ctx.recent_units.saturating_add(block.cost);
        let done = block.is_genesis() || walked.len() + 1 >= genesis.lookback_window as usize;
        let next_id = block.parent;
        walked.push(block);
        if !done {
            cursor = blocks.get_block(&next_id)?.map(|b| (next_id, b));
        }
    }

    for block in walked.iter().rev() {
        ctx.block_costs.push(block.cost);
        ctx.prices.push(block.price);
    }
    ctx.next_cost = next_cost;
    ctx.next_price = next_price(parent_block.price, ctx.recent_units, genesis);
    Ok(ctx)
}
