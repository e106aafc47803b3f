//! Quark Core - Prefix ownership, fee market and block execution.

pub mod blocks;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod fee_market;
pub mod keys;
pub mod state;
pub mod telemetry;
pub mod vm;

pub use blocks::BlockStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VmConfig;
pub use error::ChainError;
pub use executor::{apply_transaction, verify_block};
pub use fee_market::{execution_context, next_block_cost, next_price, BlockLookup, ExecutionContext};
pub use state::{PrefixStore, RangeIter};
pub use telemetry::init_telemetry;
pub use vm::{BlockStatus, ChainVm, StatelessBlock, Vm};
