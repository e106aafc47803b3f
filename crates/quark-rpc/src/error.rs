//! RPC error types.

use jsonrpsee::types::error::ErrorObjectOwned;
use quark_core::ChainError;
use quark_txpool::PoolError;
use quark_types::CodecError;
use thiserror::Error;

/// JSON-RPC error codes.
pub mod error_codes {
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Resource not found
    pub const RESOURCE_NOT_FOUND: i32 = -32001;
    /// Transaction rejected
    pub const TRANSACTION_REJECTED: i32 = -32003;
    /// Limit exceeded
    pub const LIMIT_EXCEEDED: i32 = -32005;
    /// Bounded wait elapsed
    pub const TIMEOUT: i32 = -32008;
}

/// RPC errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl RpcError {
    /// Get the error code.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            RpcError::InternalError(_) => error_codes::INTERNAL_ERROR,
            RpcError::ResourceNotFound(_) => error_codes::RESOURCE_NOT_FOUND,
            RpcError::TransactionRejected(_) => error_codes::TRANSACTION_REJECTED,
            RpcError::LimitExceeded(_) => error_codes::LIMIT_EXCEEDED,
            RpcError::Timeout(_) => error_codes::TIMEOUT,
        }
    }

    /// Convert to JSON-RPC error object.
    pub fn to_error_object(&self) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(self.code(), self.to_string(), None::<()>)
    }
}

impl From<RpcError> for ErrorObjectOwned {
    fn from(err: RpcError) -> Self {
        err.to_error_object()
    }
}

impl From<CodecError> for RpcError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Capacity { .. } => RpcError::LimitExceeded(err.to_string()),
            CodecError::Registry(_) | CodecError::Unregistered(_) => RpcError::InternalError(err.to_string()),
            _ => RpcError::InvalidParams(err.to_string()),
        }
    }
}

impl From<ChainError> for RpcError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Validation(_) => RpcError::InvalidParams(err.to_string()),
            ChainError::NotFound(_) => RpcError::ResourceNotFound(err.to_string()),
            ChainError::Ownership(_)
            | ChainError::Fee { .. }
            | ChainError::Duplicate(_)
            | ChainError::Capacity { .. } => RpcError::TransactionRejected(err.to_string()),
            ChainError::Codec(e) => e.into(),
            ChainError::Storage(e) => RpcError::InternalError(e.to_string()),
        }
    }
}

impl From<PoolError> for RpcError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Validation(_) => RpcError::InvalidParams(err.to_string()),
            PoolError::Capacity(_) | PoolError::Oversized { .. } => RpcError::LimitExceeded(err.to_string()),
            PoolError::Duplicate(_) | PoolError::Fee { .. } => RpcError::TransactionRejected(err.to_string()),
        }
    }
}

/// Standard RPC result type.
pub type RpcResult<T> = Result<T, RpcError>;
