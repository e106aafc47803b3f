//! Quark RPC - JSON-RPC handlers for the Quark VM.
//!
//! Methods:
//! - `quark.range` - key-value pairs of a prefix in a half-open key range
//! - `quark.prefixInfo` - ownership record of a prefix
//! - `quark.issueTx` - submit a transaction, optionally waiting for acceptance
//! - `quark.hasTx` - whether a transaction is in an accepted block

pub mod api;
pub mod error;
pub mod handlers;

pub use api::{rpc_module, QuarkApiServer};
pub use error::{error_codes, RpcError, RpcResult};
pub use handlers::{IssueTxResponse, RangeEntry, RpcHandler, CONFIRMATION_POLL_INTERVAL};
