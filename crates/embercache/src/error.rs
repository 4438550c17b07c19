//! Error types for embercache

use std::fmt;

/// Result type alias for embercache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error types for cache operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A caller-supplied argument was rejected (absent key, key without identity)
    InvalidArgument(String),

    /// Cache configuration failed validation
    InvalidConfig(String),
}

impl CacheError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        CacheError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        CacheError::InvalidConfig(msg.into())
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CacheError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
