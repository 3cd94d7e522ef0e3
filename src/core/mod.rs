//! Core types for the hook engine
//!
//! - `HookContext` - Caller state passed into a pipeline run
//! - `HookError` - Setup-time error types

pub mod context;
pub mod error;

pub use context::HookContext;
pub use error::{HookError, Result};
