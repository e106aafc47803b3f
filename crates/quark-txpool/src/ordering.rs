//! Transaction ordering.
//!
//! Orders transactions by:
//! 1. Declared price per load unit (higher = better)
//! 2. Transaction id (lower = better, for determinism)

use quark_types::Hash;
use std::cmp::Ordering;

/// Priority score for a transaction. Greater scores are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityScore {
    pub price: u64,
    pub id: Hash,
}

impl PriorityScore {
    pub fn new(price: u64, id: Hash) -> Self {
        Self { price, id }
    }
}

impl PartialOrd for PriorityScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by price (higher is better)
        match self.price.cmp(&other.price) {
            Ordering::Equal => {}
            other => return other,
        }

        // Then by id (lower is better)
        other.id.cmp(&self.id)
    }
}
