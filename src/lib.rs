pub mod core;

// Tool-call hooks: matching, registry, pipeline
pub mod hooks;

// Optional components
pub mod logging;

pub use crate::core::{HookContext, HookError};
pub use hooks::{
    CallableHook, CommandHook, Hook, HookEvent, HookManager, HookPhase, HookResult,
    PermissionDecision,
};
