use crate::error::TypesError;

/// Chain-level parameters fixed at genesis.
///
/// Every node must run with identical values: the fee market and the load
/// unit accounting are pure functions of these constants and chain history.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Genesis {
    /// Timestamp of the genesis block (seconds)
    pub genesis_timestamp: u64,

    // Fee market
    pub lookback_window: u64,            // 60 blocks
    pub block_target_secs: u64,          // 1
    pub target_units: u64,               // 100_000 units per window
    pub min_price: u64,                  // 1
    pub price_change_pct: u64,           // 12 (12.5% rounded down)
    pub min_block_cost: u64,             // 1_000 units
    pub max_block_cost: u64,             // 10_000 units

    // Load units
    pub base_tx_units: u64,              // 1
    pub claim_load_multiplier: u64,      // 2
    pub value_unit_size: u64,            // 256 bytes
    pub lifeline_unit_secs: u64,         // 3_600 seconds

    // Prefix ownership
    pub default_lifeline_secs: u64,      // 60 * 60 * 24 * 30
    pub max_prefix_len: u64,             // 256
    pub max_key_len: u64,                // 256
    pub max_value_size: u64,             // 128 KiB
}

impl Default for Genesis {
    fn default() -> Self {
        Self {
            genesis_timestamp: 0,
            lookback_window: 60,
            block_target_secs: 1,
            target_units: 100_000,
            min_price: 1,
            price_change_pct: 12,
            min_block_cost: 1_000,
            max_block_cost: 10_000,
            base_tx_units: 1,
            claim_load_multiplier: 2,
            value_unit_size: 256,
            lifeline_unit_secs: 3_600,
            default_lifeline_secs: 60 * 60 * 24 * 30,
            max_prefix_len: 256,
            max_key_len: 256,
            max_value_size: 128 * 1024,
        }
    }
}

impl Genesis {
    /// Reject parameter combinations the fee market cannot work with.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.lookback_window == 0 {
            return Err(TypesError::InvalidGenesis("lookback_window must be > 0".into()));
        }
        if self.min_price == 0 {
            return Err(TypesError::InvalidGenesis("min_price must be > 0".into()));
        }
        if self.min_block_cost > self.max_block_cost {
            return Err(TypesError::InvalidGenesis(format!(
                "min_block_cost {} exceeds max_block_cost {}",
                self.min_block_cost, self.max_block_cost
            )));
        }
        if self.value_unit_size == 0 || self.lifeline_unit_secs == 0 {
            return Err(TypesError::InvalidGenesis("unit sizes must be > 0".into()));
        }
        if self.max_prefix_len == 0 || self.max_key_len == 0 {
            return Err(TypesError::InvalidGenesis("prefix and key limits must be > 0".into()));
        }
        if self.default_lifeline_secs == 0 {
            return Err(TypesError::InvalidGenesis("default_lifeline_secs must be > 0".into()));
        }
        Ok(())
    }
}
