use thiserror::Error;

/// Errors that can occur in type operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid address length: expected 20, got {0}")]
    InvalidAddressLength(usize),

    #[error("Invalid hash length: expected 32, got {0}")]
    InvalidHashLength(usize),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Prefix too long: max {max}, got {actual}")]
    PrefixTooLong { max: usize, actual: usize },

    #[error("Key too long: max {max}, got {actual}")]
    KeyTooLong { max: usize, actual: usize },

    #[error("Value too large: max {max}, got {actual}")]
    ValueTooLarge { max: usize, actual: usize },

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),
}

impl From<hex::FromHexError> for TypesError {
    fn from(e: hex::FromHexError) -> Self {
        TypesError::InvalidHex(e.to_string())
    }
}
