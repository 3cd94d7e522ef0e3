//! Hook Manager
//!
//! Entry point used by the agent loop around every tool call. Owns the hook
//! registry and the handler table, and runs the hook pipeline:
//!
//! 1. Resolve the effective hooks for the agent and phase, keep the ones whose
//!    matcher accepts the tool
//! 2. Run them one at a time, feeding each the arguments as rewritten by the
//!    previous ones
//! 3. Stop at the first deny; otherwise aggregate ask, rewritten arguments
//!    and injections into a single result

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::callable::HandlerRegistry;
use super::hook::ArcHook;
use super::registry::HookRegistry;
use super::types::{HookPhase, HookResult, Injection, PermissionDecision};
use crate::core::HookContext;

/// Registry + pipeline facade
///
/// # Example
///
/// ```ignore
/// let manager = HookManager::new();
/// manager.register_global_hook(
///     HookPhase::PreToolUse,
///     Arc::new(CommandHook::new("path_guard", "/opt/hooks/path_guard").with_matcher("Write|Edit")),
/// );
///
/// let ctx = HookContext::new(session_id, orchestrator_id).with_agent("coder");
/// let verdict = manager
///     .execute_hooks(HookPhase::PreToolUse, "Write", &args_json, &ctx)
///     .await;
/// if verdict.is_deny() {
///     // skip the tool, surface verdict.reason to the agent
/// }
/// ```
#[derive(Debug, Default)]
pub struct HookManager {
    registry: HookRegistry,
    handlers: HandlerRegistry,
}

impl HookManager {
    /// Create a manager with no hooks and no named handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager whose configuration can refer to the given handlers
    pub fn with_handlers(handlers: HandlerRegistry) -> Self {
        Self {
            registry: HookRegistry::new(),
            handlers,
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Named handlers available to configuration
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Add a hook that applies to every agent
    pub fn register_global_hook(&self, phase: HookPhase, hook: ArcHook) {
        self.registry.register_global_hook(phase, hook);
    }

    /// Add a hook for one agent (see `HookRegistry::register_agent_hook`)
    pub fn register_agent_hook(
        &self,
        agent_id: &str,
        phase: HookPhase,
        hook: ArcHook,
        override_global: bool,
    ) {
        self.registry
            .register_agent_hook(agent_id, phase, hook, override_global);
    }

    /// Remove every registered hook
    pub fn clear_hooks(&self) {
        self.registry.clear();
    }

    /// Run all matching hooks for a tool call and aggregate their results
    ///
    /// `arguments` is the JSON-encoded tool input. For PostToolUse the caller
    /// puts the tool output in `ctx.tool_output` first.
    ///
    /// The returned result:
    /// - `deny` from the first denying hook; later hooks do not run
    /// - `ask` if any hook asked (last reason wins), otherwise `allow`
    /// - `updated_input` / `modified_args` only if the arguments changed
    /// - one injection with all contents joined by newlines, strategy taken
    ///   from the last injecting hook
    ///
    /// Hook faults never escape; they are handled by each hook's failure policy.
    pub async fn execute_hooks(
        &self,
        phase: HookPhase,
        tool_name: &str,
        arguments: &str,
        ctx: &HookContext,
    ) -> HookResult {
        let hooks: Vec<ArcHook> = self
            .registry
            .effective_hooks(ctx.agent_id.as_deref(), phase)
            .into_iter()
            .filter(|hook| hook.matches(tool_name))
            .collect();

        if hooks.is_empty() {
            return HookResult::allow();
        }

        let span = tracing::debug_span!(
            "hook_pipeline",
            run_id = %Uuid::new_v4(),
            phase = %phase,
            tool = tool_name,
            agent = ctx.agent_id.as_deref().unwrap_or(""),
        );
        run_pipeline(&hooks, phase, tool_name, arguments, ctx)
            .instrument(span)
            .await
    }
}

async fn run_pipeline(
    hooks: &[ArcHook],
    phase: HookPhase,
    tool_name: &str,
    arguments: &str,
    ctx: &HookContext,
) -> HookResult {
    tracing::debug!("[HookManager] Running {} hook(s)", hooks.len());

    let mut current_args = arguments.to_string();
    let mut pending_ask: Option<Option<String>> = None;
    let mut injections: Vec<Injection> = Vec::new();

    for hook in hooks {
        if ctx.is_cancelled() {
            tracing::debug!("[HookManager] Cancelled before hook {}", hook.name());
            return HookResult::deny("Hook execution cancelled");
        }

        let outcome = AssertUnwindSafe(hook.execute(phase, tool_name, &current_args, ctx))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                tracing::error!(
                    "[HookManager] Hook {} failed unexpectedly: {}",
                    hook.name(),
                    panic_message(panic.as_ref())
                );
                continue;
            }
        };

        if result.is_deny() {
            let reason = result
                .reason
                .or_else(|| {
                    result
                        .metadata
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| format!("Denied by hook {}", hook.name()));
            tracing::info!(
                "[HookManager] {} denied by hook {}: {}",
                tool_name,
                hook.name(),
                reason
            );
            return HookResult::deny(reason);
        }

        if result.decision == PermissionDecision::Ask {
            pending_ask = Some(result.reason.clone());
        }

        if let Some(args) = result.modified_args {
            current_args = args;
        } else if let Some(input) = result.updated_input {
            match serde_json::to_string(&input) {
                Ok(args) => current_args = args,
                Err(e) => tracing::error!(
                    "[HookManager] Could not encode updated input from {}: {}",
                    hook.name(),
                    e
                ),
            }
        }

        if let Some(injection) = result.injection {
            injections.push(injection);
        }
    }

    let mut final_result = HookResult::allow();

    if let Some(reason) = pending_ask {
        final_result.decision = PermissionDecision::Ask;
        final_result.reason = reason;
    }

    if arguments_changed(arguments, &current_args) {
        final_result.updated_input = match serde_json::from_str::<Value>(&current_args) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        final_result.modified_args = Some(current_args);
    }

    final_result.injection = combine_injections(&injections);
    final_result
}

/// Compare as JSON when both sides parse, otherwise as text
fn arguments_changed(original: &str, current: &str) -> bool {
    match (
        serde_json::from_str::<Value>(original),
        serde_json::from_str::<Value>(current),
    ) {
        (Ok(a), Ok(b)) => a != b,
        _ => original != current,
    }
}

/// Join non-empty contents with newlines; strategy of the last injection wins
fn combine_injections(injections: &[Injection]) -> Option<Injection> {
    let last = injections.last()?;
    let content = injections
        .iter()
        .map(|i| i.content.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if content.is_empty() {
        None
    } else {
        Some(Injection::new(content, last.strategy))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic".to_string()
    }
}
