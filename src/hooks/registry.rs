//! Hook Registry
//!
//! Stores global hooks and per-agent hooks for each phase.
//!
//! Lookup order for an agent:
//! - agent has override set for the phase → only the agent's hooks
//! - otherwise → global hooks first, then the agent's hooks
//!
//! Global checks therefore always run (and can deny) before agent-local ones.

use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::hook::ArcHook;
use super::types::HookPhase;

/// One agent's hooks for one phase
#[derive(Default, Clone)]
struct AgentPhaseHooks {
    /// Global hooks are skipped while set
    override_global: bool,
    hooks: Vec<ArcHook>,
}

#[derive(Default)]
struct RegistryState {
    global: HashMap<HookPhase, Vec<ArcHook>>,
    agents: HashMap<String, HashMap<HookPhase, AgentPhaseHooks>>,
}

/// Central registry for all hooks
///
/// Mutated during setup and teardown, queried on every tool call. Queries
/// return a snapshot, so no lock is held while hooks run.
///
/// # Example
///
/// ```ignore
/// let registry = HookRegistry::new();
/// registry.register_global_hook(HookPhase::PreToolUse, Arc::new(audit_hook));
/// registry.register_agent_hook("coder", HookPhase::PreToolUse, Arc::new(path_guard), false);
///
/// // [audit_hook, path_guard]
/// let hooks = registry.effective_hooks(Some("coder"), HookPhase::PreToolUse);
/// ```
#[derive(Default)]
pub struct HookRegistry {
    state: RwLock<RegistryState>,
}

impl HookRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written entry behind
    // (every mutation is a single push or insert), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a hook that applies to every agent
    pub fn register_global_hook(&self, phase: HookPhase, hook: ArcHook) {
        tracing::debug!(
            "[HookRegistry] Registered global {} hook: {}",
            phase,
            hook.name()
        );
        self.write().global.entry(phase).or_default().push(hook);
    }

    /// Add a hook for one agent
    ///
    /// `override_global = true` latches: the agent stops seeing global hooks
    /// for this phase, including for hooks registered later without the flag.
    /// Use `set_agent_override` to clear it.
    pub fn register_agent_hook(
        &self,
        agent_id: &str,
        phase: HookPhase,
        hook: ArcHook,
        override_global: bool,
    ) {
        tracing::debug!(
            "[HookRegistry] Registered {} hook for agent {}: {}{}",
            phase,
            agent_id,
            hook.name(),
            if override_global { " (override)" } else { "" }
        );

        let mut state = self.write();
        let entry = state
            .agents
            .entry(agent_id.to_string())
            .or_default()
            .entry(phase)
            .or_default();
        entry.hooks.push(hook);
        if override_global {
            entry.override_global = true;
        }
    }

    /// Explicitly set or clear an agent's override flag for a phase
    pub fn set_agent_override(&self, agent_id: &str, phase: HookPhase, override_global: bool) {
        let mut state = self.write();
        state
            .agents
            .entry(agent_id.to_string())
            .or_default()
            .entry(phase)
            .or_default()
            .override_global = override_global;
    }

    /// Whether an agent currently overrides global hooks for a phase
    pub fn agent_overrides(&self, agent_id: &str, phase: HookPhase) -> bool {
        self.read()
            .agents
            .get(agent_id)
            .and_then(|phases| phases.get(&phase))
            .map(|entry| entry.override_global)
            .unwrap_or(false)
    }

    /// Hooks that apply to an agent for a phase, in execution order
    ///
    /// `agent_id = None` yields only the global hooks.
    pub fn effective_hooks(&self, agent_id: Option<&str>, phase: HookPhase) -> Vec<ArcHook> {
        let state = self.read();

        let agent_entry = agent_id
            .and_then(|id| state.agents.get(id))
            .and_then(|phases| phases.get(&phase));

        if let Some(entry) = agent_entry {
            if entry.override_global {
                return entry.hooks.clone();
            }
        }

        let mut hooks = state.global.get(&phase).cloned().unwrap_or_default();
        if let Some(entry) = agent_entry {
            hooks.extend(entry.hooks.iter().cloned());
        }
        hooks
    }

    /// Check if there are any hooks (global or per-agent) for a phase
    pub fn has_hooks(&self, phase: HookPhase) -> bool {
        self.hook_count(phase) > 0
    }

    /// Number of hooks (global and per-agent) registered for a phase
    pub fn hook_count(&self, phase: HookPhase) -> usize {
        let state = self.read();
        let global = state.global.get(&phase).map(|v| v.len()).unwrap_or(0);
        let agents: usize = state
            .agents
            .values()
            .filter_map(|phases| phases.get(&phase))
            .map(|entry| entry.hooks.len())
            .sum();
        global + agents
    }

    /// Remove every hook and override flag
    pub fn clear(&self) {
        let mut state = self.write();
        state.global.clear();
        state.agents.clear();
        tracing::debug!("[HookRegistry] Cleared all hooks");
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        let mut map = f.debug_map();
        for (phase, hooks) in &state.global {
            map.entry(&format!("global:{}", phase), &hooks.len());
        }
        for (agent, phases) in &state.agents {
            for (phase, entry) in phases {
                map.entry(&format!("{}:{}", agent, phase), &entry.hooks.len());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::callable::CallableHook;
    use crate::hooks::types::{HookEvent, HookResult};
    use std::sync::Arc;

    fn hook(name: &str) -> ArcHook {
        Arc::new(CallableHook::from_fn(name, |_event: HookEvent| {
            HookResult::allow()
        }))
    }

    fn names(hooks: &[ArcHook]) -> Vec<String> {
        hooks.iter().map(|h| h.name().to_string()).collect()
    }

    #[test]
    fn test_register_global_hook() {
        let registry = HookRegistry::new();
        registry.register_global_hook(HookPhase::PreToolUse, hook("test"));

        let hooks = registry.effective_hooks(None, HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["test"]);
        assert!(registry.has_hooks(HookPhase::PreToolUse));
        assert!(!registry.has_hooks(HookPhase::PostToolUse));
    }

    #[test]
    fn test_register_agent_hook() {
        let registry = HookRegistry::new();
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("test"), false);

        assert_eq!(
            registry
                .effective_hooks(Some("agent-1"), HookPhase::PreToolUse)
                .len(),
            1
        );
        assert!(registry
            .effective_hooks(Some("agent-2"), HookPhase::PreToolUse)
            .is_empty());
        assert!(registry
            .effective_hooks(Some("agent-1"), HookPhase::PostToolUse)
            .is_empty());
    }

    #[test]
    fn test_global_before_agent_in_registration_order() {
        let registry = HookRegistry::new();
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("a1"), false);
        registry.register_global_hook(HookPhase::PreToolUse, hook("g1"));
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("a2"), false);
        registry.register_global_hook(HookPhase::PreToolUse, hook("g2"));

        let hooks = registry.effective_hooks(Some("agent-1"), HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["g1", "g2", "a1", "a2"]);
    }

    #[test]
    fn test_agent_override() {
        let registry = HookRegistry::new();
        registry.register_global_hook(HookPhase::PreToolUse, hook("global"));
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("agent"), true);

        let hooks = registry.effective_hooks(Some("agent-1"), HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["agent"]);

        let hooks = registry.effective_hooks(Some("agent-2"), HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["global"]);

        // Override is per phase
        registry.register_global_hook(HookPhase::PostToolUse, hook("global_post"));
        let hooks = registry.effective_hooks(Some("agent-1"), HookPhase::PostToolUse);
        assert_eq!(names(&hooks), vec!["global_post"]);
    }

    #[test]
    fn test_override_latches() {
        let registry = HookRegistry::new();
        registry.register_global_hook(HookPhase::PreToolUse, hook("global"));
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("a1"), true);
        registry.register_agent_hook("agent-1", HookPhase::PreToolUse, hook("a2"), false);

        assert!(registry.agent_overrides("agent-1", HookPhase::PreToolUse));
        let hooks = registry.effective_hooks(Some("agent-1"), HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["a1", "a2"]);

        registry.set_agent_override("agent-1", HookPhase::PreToolUse, false);
        let hooks = registry.effective_hooks(Some("agent-1"), HookPhase::PreToolUse);
        assert_eq!(names(&hooks), vec!["global", "a1", "a2"]);
    }

    #[test]
    fn test_override_without_hooks_hides_globals() {
        let registry = HookRegistry::new();
        registry.register_global_hook(HookPhase::PreToolUse, hook("global"));
        registry.set_agent_override("sandboxed", HookPhase::PreToolUse, true);

        assert!(registry
            .effective_hooks(Some("sandboxed"), HookPhase::PreToolUse)
            .is_empty());
    }

    #[test]
    fn test_hook_count_and_clear() {
        let registry = HookRegistry::new();
        registry.register_global_hook(HookPhase::PreToolUse, hook("g"));
        registry.register_agent_hook("a", HookPhase::PreToolUse, hook("a"), true);
        registry.register_agent_hook("b", HookPhase::PostToolUse, hook("b"), false);

        assert_eq!(registry.hook_count(HookPhase::PreToolUse), 2);
        assert_eq!(registry.hook_count(HookPhase::PostToolUse), 1);

        registry.clear();
        assert!(!registry.has_hooks(HookPhase::PreToolUse));
        assert!(!registry.agent_overrides("a", HookPhase::PreToolUse));
        assert!(registry
            .effective_hooks(Some("a"), HookPhase::PreToolUse)
            .is_empty());
    }
}
