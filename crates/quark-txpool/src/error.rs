use thiserror::Error;

/// Errors that can occur in the transaction pool.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("Invalid transaction: {0}")]
    Validation(String),

    #[error("Transaction already exists: {0}")]
    Duplicate(String),

    #[error("Price too low: minimum {minimum}, got {got}")]
    Fee { minimum: u64, got: u64 },

    #[error("Transaction pool full: {0} transactions")]
    Capacity(usize),

    #[error("Transaction too large: {size} bytes, limit {limit}")]
    Oversized { size: usize, limit: usize },
}
