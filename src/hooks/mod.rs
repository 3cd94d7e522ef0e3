//! Hooks Module
//!
//! Govern tool calls at two points of an agent turn.
//!
//! # Overview
//!
//! Hooks let you:
//! - Block dangerous tool calls before they execute
//! - Flag calls that need confirmation
//! - Rewrite tool arguments (each hook sees the previous hook's rewrite)
//! - Inject extra content into the agent's context after a tool ran
//!
//! # Example
//!
//! ```ignore
//! use tool_hooks::hooks::{CallableHook, CommandHook, HookManager, HookPhase, HookResult};
//!
//! let manager = HookManager::new();
//!
//! // Block dangerous commands for every agent
//! manager.register_global_hook(
//!     HookPhase::PreToolUse,
//!     Arc::new(CallableHook::from_fn("block_rm", |event| {
//!         let cmd = event.tool_input.get("command").and_then(|v| v.as_str()).unwrap_or("");
//!         if cmd.contains("rm -rf") {
//!             HookResult::deny("Dangerous command blocked")
//!         } else {
//!             HookResult::allow()
//!         }
//!     })
//!     .with_matcher("Bash")),
//! );
//!
//! // External policy script, only for the coder agent
//! manager.register_agent_hook(
//!     "coder",
//!     HookPhase::PreToolUse,
//!     Arc::new(CommandHook::new("path_guard", "/opt/hooks/path_guard").with_matcher("Write|Edit")),
//!     false,
//! );
//!
//! let verdict = manager.execute_hooks(HookPhase::PreToolUse, "Bash", &args, &ctx).await;
//! ```
//!
//! # Phases
//!
//! | Phase | When | Can |
//! |-------|------|-----|
//! | `PreToolUse` | Before tool executes | deny, ask, rewrite arguments |
//! | `PostToolUse` | After tool executes | inject content |
//!
//! # Failure policy
//!
//! | Fault | Default | `fail_closed` |
//! |-------|---------|---------------|
//! | Handler not registered | deny | deny |
//! | Handler panicked | allow | deny |
//! | Hook timed out | allow | deny |
//! | Command could not run | allow | deny |
//! | Command exited non-zero | allow | allow |
//! | Command output not a result object | allow | allow |

pub mod builtin;
mod callable;
mod command;
mod config;
mod hook;
mod manager;
mod matcher;
mod registry;
mod types;

pub use callable::{CallableHook, HandlerRegistry, HookHandler, HookOutput};
pub use command::{CommandHook, DEFAULT_ENV_PREFIX};
pub use config::{ConfigReport, HookSpec, HooksConfig, PhaseHooksConfig};
pub use hook::{ArcHook, Hook, HookFault, HookSettings, DEFAULT_HOOK_TIMEOUT};
pub use manager::HookManager;
pub use matcher::ToolMatcher;
pub use registry::HookRegistry;
pub use types::{
    decode_arguments, HookEvent, HookPhase, HookResult, Injection, InjectionStrategy,
    PermissionDecision, HOOK_SCHEMA_VERSION,
};
