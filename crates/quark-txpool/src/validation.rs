//! Admission checks run before a transaction enters the pool.

use crate::error::PoolError;
use quark_types::{Genesis, Transaction};

/// Stateless checks: well-formed payload and a price at or above the posted
/// minimum. Ownership and replay checks belong to the executor.
pub fn validate_transaction(
    tx: &Transaction,
    genesis: &Genesis,
    min_price: u64,
) -> Result<(), PoolError> {
    tx.validate_basic(genesis)
        .map_err(|e| PoolError::Validation(e.to_string()))?;

    if tx.price() < min_price {
        return Err(PoolError::Fee {
            minimum: min_price,
            got: tx.price(),
        });
    }
    Ok(())
}
