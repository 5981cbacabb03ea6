//! Error types for memory snapshot access.

use thiserror::Error;

/// Errors that can occur while reading a memory snapshot.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// An address is not covered by the layer.
    #[error("Invalid address {invalid_address:#x} in layer '{layer_name}': {message}")]
    InvalidAddress {
        layer_name: String,
        invalid_address: u64,
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The layer has been destroyed and cannot be used.
    #[error("Layer '{0}' has been destroyed")]
    LayerDestroyed(String),

    /// Invalid parameter provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl MemoryError {
    /// Create an InvalidAddress error.
    pub fn invalid_address(layer_name: impl Into<String>, addr: u64, msg: impl Into<String>) -> Self {
        MemoryError::InvalidAddress {
            layer_name: layer_name.into(),
            invalid_address: addr,
            message: msg.into(),
        }
    }

    /// Create a LayerDestroyed error.
    pub fn layer_destroyed(name: impl Into<String>) -> Self {
        MemoryError::LayerDestroyed(name.into())
    }
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_error() {
        let err = MemoryError::invalid_address("snapshot", 0x7ffd_0000_1000, "below base address");
        assert!(err.to_string().contains("snapshot"));
        assert!(err.to_string().contains("0x7ffd00001000"));
        assert!(err.to_string().contains("below base address"));
    }

    #[test]
    fn test_layer_destroyed_error() {
        let err = MemoryError::layer_destroyed("snapshot");
        assert_eq!(err.to_string(), "Layer 'snapshot' has been destroyed");
    }
}
