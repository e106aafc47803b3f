use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ownership error: {0}")]
    Ownership(String),

    #[error("Fee too low: required {required}, offered {offered}")]
    Fee { required: u64, offered: u64 },

    #[error("Duplicate transaction: {0}")]
    Duplicate(String),

    #[error("Capacity exceeded: {used} > {limit}")]
    Capacity { used: u64, limit: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] quark_storage::StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] quark_types::CodecError),
}

impl From<quark_types::TypesError> for ChainError {
    fn from(e: quark_types::TypesError) -> Self {
        ChainError::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainError::Fee { required: 10, offered: 3 };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("3"));

        let err = ChainError::Capacity { used: 11, limit: 10 };
        assert_eq!(err.to_string(), "Capacity exceeded: 11 > 10");
    }

    #[test]
    fn test_types_error_is_validation() {
        let err: ChainError = quark_types::TypesError::InvalidKey("bad".into()).into();
        assert!(matches!(err, ChainError::Validation(_)));
    }
}
