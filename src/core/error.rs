//! Hook engine error types
//!
//! Only setup-time operations (parsing configuration, building hooks) return
//! these. Faults raised while a hook runs are translated into a `HookResult`
//! and never surface as errors.

use thiserror::Error;

/// Errors that can occur while configuring the hook engine
#[derive(Error, Debug)]
pub enum HookError {
    /// Configuration has the wrong shape
    #[error("Invalid hook configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HookError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        HookError::InvalidConfig(msg.into())
    }
}

/// Result type alias for hook engine setup operations
pub type Result<T, E = HookError> = std::result::Result<T, E>;
