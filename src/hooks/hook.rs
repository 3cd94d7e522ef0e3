//! Hook trait and shared hook settings
//!
//! Contains:
//! - `Hook` trait - implemented by `CallableHook` and `CommandHook`
//! - `HookSettings` - name, matcher, timeout and failure policy
//! - `HookFault` - fault kinds translated into results by the failure policy

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::matcher::ToolMatcher;
use super::types::{HookPhase, HookResult};
use crate::core::HookContext;

/// Default per-hook timeout
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for hook implementations
///
/// Hooks are built once during setup and then shared read-only across
/// concurrent pipeline runs. `execute` never fails: every fault is turned
/// into a `HookResult` according to the hook's failure policy.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Hook identifier used in logs and deny reasons
    fn name(&self) -> &str;

    /// Tool-name filter
    fn matcher(&self) -> &ToolMatcher;

    /// Check if this hook applies to a tool name
    fn matches(&self, tool_name: &str) -> bool {
        self.matcher().matches(tool_name)
    }

    /// Run the hook for one tool call
    ///
    /// `arguments` is the JSON-encoded tool input as seen at this point of
    /// the chain (earlier hooks may have rewritten it).
    async fn execute(
        &self,
        phase: HookPhase,
        tool_name: &str,
        arguments: &str,
        ctx: &HookContext,
    ) -> HookResult;
}

/// Type alias for stored hooks
pub type ArcHook = Arc<dyn Hook>;

/// Fault raised while running a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookFault {
    /// Handler panicked, or the process could not be run
    Error(String),
    /// Hook exceeded its timeout
    Timeout,
    /// Owning agent turn was cancelled
    Cancelled,
}

/// Attributes shared by every hook kind
#[derive(Debug, Clone)]
pub struct HookSettings {
    pub name: String,
    pub matcher: ToolMatcher,
    pub timeout: Duration,
    /// Deny instead of allow when the hook errors or times out
    pub fail_closed: bool,
}

impl HookSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matcher: ToolMatcher::any(),
            timeout: DEFAULT_HOOK_TIMEOUT,
            fail_closed: false,
        }
    }

    /// Translate a fault into a result
    ///
    /// Errors and timeouts allow unless `fail_closed` is set. Cancellation
    /// always denies: the owning turn is gone and the call must not proceed.
    pub fn on_fault(&self, kind: &str, tool_name: &str, fault: HookFault) -> HookResult {
        match fault {
            HookFault::Cancelled => {
                tracing::debug!("[{}] Hook {} cancelled for {}", kind, self.name, tool_name);
                HookResult::deny(format!("Hook {} cancelled", self.name))
            }
            HookFault::Timeout => {
                tracing::warn!(
                    "[{}] Hook {} timed out for {} (event: timeout, fail_closed: {})",
                    kind,
                    self.name,
                    tool_name,
                    self.fail_closed
                );
                if self.fail_closed {
                    HookResult::deny(format!(
                        "Hook {} timed out after {:?}",
                        self.name, self.timeout
                    ))
                } else {
                    HookResult::allow()
                }
            }
            HookFault::Error(msg) => {
                tracing::error!(
                    "[{}] Hook {} failed for {}: {} (event: error, fail_closed: {})",
                    kind,
                    self.name,
                    tool_name,
                    msg,
                    self.fail_closed
                );
                if self.fail_closed {
                    HookResult::deny(format!("Hook {} failed: {}", self.name, msg))
                } else {
                    HookResult::allow()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::types::PermissionDecision;

    #[test]
    fn test_settings_defaults() {
        let settings = HookSettings::new("guard");
        assert_eq!(settings.timeout, DEFAULT_HOOK_TIMEOUT);
        assert!(!settings.fail_closed);
        assert!(settings.matcher.matches("anything"));
    }

    #[test]
    fn test_fail_open_faults_allow() {
        let settings = HookSettings::new("guard");
        let result = settings.on_fault("Test", "Write", HookFault::Timeout);
        assert_eq!(result.decision, PermissionDecision::Allow);

        let result = settings.on_fault("Test", "Write", HookFault::Error("boom".into()));
        assert_eq!(result.decision, PermissionDecision::Allow);
    }

    #[test]
    fn test_fail_closed_faults_deny() {
        let mut settings = HookSettings::new("guard");
        settings.fail_closed = true;

        let result = settings.on_fault("Test", "Write", HookFault::Timeout);
        assert!(result.is_deny());
        assert!(result.reason.unwrap().contains("timed out"));

        let result = settings.on_fault("Test", "Write", HookFault::Error("boom".into()));
        assert_eq!(result.reason.as_deref(), Some("Hook guard failed: boom"));
    }

    #[test]
    fn test_cancellation_always_denies() {
        let settings = HookSettings::new("guard");
        let result = settings.on_fault("Test", "Write", HookFault::Cancelled);
        assert!(result.is_deny());
    }
}
