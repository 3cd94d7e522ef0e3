//! Hook configuration
//!
//! Turns already-parsed hook configuration into registered hooks. The
//! expected shape (shown as YAML):
//!
//! ```yaml
//! PreToolUse:
//!   - handler: policies.block_rm        # name in the HandlerRegistry
//!     matcher: "Bash"
//!     timeout: 10
//!   - handler: /opt/hooks/path_guard.sh
//!     type: command
//!     matcher: "Write|Edit"
//!     fail_closed: true
//! PostToolUse:
//!   override: true                      # per-agent only: skip global hooks
//!   hooks:
//!     - handler: policies.add_reminder
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::callable::CallableHook;
use super::command::CommandHook;
use super::hook::ArcHook;
use super::manager::HookManager;
use super::types::HookPhase;
use crate::core::{HookError, Result};

fn default_matcher() -> String {
    "*".to_string()
}

fn default_timeout_secs() -> f64 {
    30.0
}

fn default_hook_type() -> String {
    "callable".to_string()
}

/// One hook entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    /// Handler name (callable) or executable path (command)
    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default = "default_matcher")]
    pub matcher: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout: f64,

    /// `"command"` for an external process; anything else (`"callable"`, the
    /// legacy `"python"`) is an in-process callable
    #[serde(rename = "type", default = "default_hook_type")]
    pub hook_type: String,

    #[serde(default)]
    pub fail_closed: bool,

    /// Extra arguments for command hooks
    #[serde(default)]
    pub args: Vec<String>,
}

impl HookSpec {
    pub fn is_command(&self) -> bool {
        self.hook_type == "command"
    }

    fn timeout(&self) -> Duration {
        if self.timeout.is_finite() && self.timeout > 0.0 {
            Duration::from_secs_f64(self.timeout)
        } else {
            Duration::from_secs_f64(default_timeout_secs())
        }
    }
}

/// Hooks for one phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseHooksConfig {
    /// Agent-level only: ignore global hooks for this phase
    pub override_global: bool,
    pub hooks: Vec<HookSpec>,
}

/// Full hook configuration, keyed by phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HooksConfig {
    pub phases: Vec<(HookPhase, PhaseHooksConfig)>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPhaseHooks {
    List(Vec<HookSpec>),
    WithOverride {
        #[serde(default, rename = "override")]
        override_global: bool,
        #[serde(default)]
        hooks: Vec<HookSpec>,
    },
}

impl HooksConfig {
    /// Parse from a JSON value (e.g. a YAML document converted by the caller)
    ///
    /// Unknown phase names are skipped with a warning; a top-level
    /// `override` key is ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(HookError::invalid_config("hook configuration must be an object"));
        };

        let mut phases = Vec::new();
        for (name, entry) in map {
            if name == "override" {
                continue;
            }
            let Some(phase) = HookPhase::from_name(&name) else {
                tracing::warn!("[HooksConfig] Unknown hook type: {}", name);
                continue;
            };

            let raw: RawPhaseHooks = serde_json::from_value(entry).map_err(|e| {
                HookError::invalid_config(format!("invalid {} hooks: {}", name, e))
            })?;
            let config = match raw {
                RawPhaseHooks::List(hooks) => PhaseHooksConfig {
                    override_global: false,
                    hooks,
                },
                RawPhaseHooks::WithOverride {
                    override_global,
                    hooks,
                } => PhaseHooksConfig {
                    override_global,
                    hooks,
                },
            };
            phases.push((phase, config));
        }

        Ok(Self { phases })
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn get(&self, phase: HookPhase) -> Option<&PhaseHooksConfig> {
        self.phases
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, config)| config)
    }
}

/// Outcome of applying a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigReport {
    /// Hooks added to the registry
    pub registered: usize,
    /// Callable handler names that had no registered function
    ///
    /// These hooks are still registered and deny every call they match.
    pub unresolved: Vec<String>,
    /// Entries skipped because they had no handler
    pub skipped: usize,
}

impl HookManager {
    /// Build a hook from one `HookSpec` entry
    ///
    /// Returns `None` when the entry has no handler. Callable handlers are
    /// resolved against `self.handlers()` now; an unknown name yields a hook
    /// that always denies.
    pub fn build_hook(&self, spec: &HookSpec) -> Option<ArcHook> {
        let handler = match spec.handler.as_deref() {
            Some(handler) if !handler.is_empty() => handler,
            _ => {
                tracing::warn!("[HookManager] Hook config missing 'handler'");
                return None;
            }
        };
        let name = format!("{}_{}", spec.hook_type, handler);

        if spec.is_command() {
            return Some(Arc::new(
                CommandHook::new(name, handler)
                    .with_args(spec.args.iter().cloned())
                    .with_matcher(&spec.matcher)
                    .with_timeout(spec.timeout())
                    .with_fail_closed(spec.fail_closed),
            ));
        }

        let hook = match self.handlers().resolve(handler) {
            Some(resolved) => CallableHook::new(name, resolved),
            None => {
                tracing::error!(
                    "[HookManager] No handler registered as '{}'; hook {} will deny every matching call",
                    handler,
                    name
                );
                CallableHook::unresolved(name, handler)
            }
        };
        Some(Arc::new(
            hook.with_matcher(&spec.matcher)
                .with_timeout(spec.timeout())
                .with_fail_closed(spec.fail_closed),
        ))
    }

    /// Register every hook in a configuration
    ///
    /// `agent_id = None` registers global hooks (any `override` flag is
    /// meaningless there and ignored); otherwise hooks are registered for that
    /// agent, honoring the phase's `override` flag.
    pub fn register_hooks_from_config(
        &self,
        config: &HooksConfig,
        agent_id: Option<&str>,
    ) -> ConfigReport {
        let mut report = ConfigReport::default();

        for (phase, phase_config) in &config.phases {
            for spec in &phase_config.hooks {
                let Some(hook) = self.build_hook(spec) else {
                    report.skipped += 1;
                    continue;
                };

                if !spec.is_command() {
                    if let Some(handler) = spec.handler.as_deref() {
                        if !self.handlers().contains(handler) {
                            report.unresolved.push(handler.to_string());
                        }
                    }
                }

                match agent_id {
                    Some(agent_id) => self.register_agent_hook(
                        agent_id,
                        *phase,
                        hook,
                        phase_config.override_global,
                    ),
                    None => self.register_global_hook(*phase, hook),
                }
                report.registered += 1;
            }
        }

        tracing::info!(
            "[HookManager] Registered {} hook(s) from config{} ({} unresolved, {} skipped)",
            report.registered,
            agent_id
                .map(|id| format!(" for agent {}", id))
                .unwrap_or_default(),
            report.unresolved.len(),
            report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HookContext;
    use crate::hooks::callable::{HandlerRegistry, HookHandler};
    use crate::hooks::types::{HookEvent, HookResult};
    use serde_json::json;

    fn manager() -> HookManager {
        let handlers = HandlerRegistry::new();
        handlers.register(
            "policies.allow",
            HookHandler::from_blocking(|_e: HookEvent| HookResult::allow()),
        );
        handlers.register(
            "policies.deny_bash",
            HookHandler::from_blocking(|_e: HookEvent| HookResult::deny("no shell")),
        );
        HookManager::with_handlers(handlers)
    }

    #[test]
    fn test_spec_defaults() {
        let spec: HookSpec = serde_json::from_value(json!({"handler": "x"})).unwrap();
        assert_eq!(spec.matcher, "*");
        assert_eq!(spec.timeout, 30.0);
        assert_eq!(spec.hook_type, "callable");
        assert!(!spec.fail_closed);
        assert!(!spec.is_command());
    }

    #[test]
    fn test_parse_list_and_override_forms() {
        let config = HooksConfig::from_value(json!({
            "PreToolUse": [{"handler": "policies.allow", "matcher": "Write|Edit"}],
            "PostToolUse": {"override": true, "hooks": [{"handler": "x", "type": "command"}]},
            "override": true,
            "OnStop": [{"handler": "ignored"}],
        }))
        .unwrap();

        let pre = config.get(HookPhase::PreToolUse).unwrap();
        assert!(!pre.override_global);
        assert_eq!(pre.hooks[0].matcher, "Write|Edit");

        let post = config.get(HookPhase::PostToolUse).unwrap();
        assert!(post.override_global);
        assert!(post.hooks[0].is_command());

        assert_eq!(config.phases.len(), 2);
    }

    #[test]
    fn test_invalid_config_shape() {
        assert!(matches!(
            HooksConfig::from_value(json!(["PreToolUse"])),
            Err(HookError::InvalidConfig(_))
        ));
        assert!(matches!(
            HooksConfig::from_value(json!({"PreToolUse": "not a list"})),
            Err(HookError::InvalidConfig(_))
        ));
        assert!(matches!(
            HooksConfig::from_json("{"),
            Err(HookError::Serialization(_))
        ));
    }

    #[test]
    fn test_register_global_from_config() {
        let manager = manager();
        let config = HooksConfig::from_value(json!({
            "PreToolUse": [{"handler": "policies.allow", "matcher": "*"}],
            "PostToolUse": [{"handler": "policies.allow", "matcher": "*"}],
        }))
        .unwrap();

        let report = manager.register_hooks_from_config(&config, None);
        assert_eq!(report.registered, 2);
        assert!(report.unresolved.is_empty());

        let pre = manager.registry().effective_hooks(None, HookPhase::PreToolUse);
        let post = manager.registry().effective_hooks(None, HookPhase::PostToolUse);
        assert_eq!(pre.len(), 1);
        assert_eq!(post.len(), 1);
        assert_eq!(pre[0].name(), "callable_policies.allow");
    }

    #[test]
    fn test_register_agent_override_from_config() {
        let manager = manager();
        let global = HooksConfig::from_value(json!({
            "PreToolUse": [{"handler": "policies.deny_bash"}],
        }))
        .unwrap();
        let agent = HooksConfig::from_value(json!({
            "PreToolUse": {"override": true, "hooks": [{"handler": "policies.allow"}]},
        }))
        .unwrap();

        manager.register_hooks_from_config(&global, None);
        manager.register_hooks_from_config(&agent, Some("trusted"));

        let hooks = manager
            .registry()
            .effective_hooks(Some("trusted"), HookPhase::PreToolUse);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].name(), "callable_policies.allow");
        assert!(manager
            .registry()
            .agent_overrides("trusted", HookPhase::PreToolUse));
    }

    #[tokio::test]
    async fn test_python_type_builds_callable() {
        let manager = manager();
        let spec: HookSpec =
            serde_json::from_value(json!({"handler": "policies.deny_bash", "type": "python"}))
                .unwrap();
        assert!(!spec.is_command());

        let hook = manager.build_hook(&spec).unwrap();
        assert_eq!(hook.name(), "python_policies.deny_bash");

        let ctx = HookContext::new("s", "o");
        let result = hook.execute(HookPhase::PreToolUse, "Bash", "{}", &ctx).await;
        assert_eq!(result.reason.as_deref(), Some("no shell"));
    }

    #[test]
    fn test_missing_handler_is_skipped() {
        let manager = manager();
        let config = HooksConfig::from_value(json!({
            "PreToolUse": [{"matcher": "*"}, {"handler": ""}],
        }))
        .unwrap();

        let report = manager.register_hooks_from_config(&config, None);
        assert_eq!(report.registered, 0);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_command_spec_builds_command_hook() {
        let manager = manager();
        let spec: HookSpec = serde_json::from_value(json!({
            "handler": "/opt/hooks/guard.sh",
            "type": "command",
            "matcher": "Write",
            "timeout": 0.5,
        }))
        .unwrap();

        let hook = manager.build_hook(&spec).unwrap();
        assert_eq!(hook.name(), "command_/opt/hooks/guard.sh");
        assert!(hook.matches("Write"));
        assert!(!hook.matches("Read"));
    }

    #[tokio::test]
    async fn test_unresolved_handler_denies() {
        let manager = manager();
        let config = HooksConfig::from_value(json!({
            "PreToolUse": [{"handler": "policies.typo", "matcher": "Bash"}],
        }))
        .unwrap();

        let report = manager.register_hooks_from_config(&config, None);
        assert_eq!(report.registered, 1);
        assert_eq!(report.unresolved, vec!["policies.typo".to_string()]);

        let ctx = HookContext::new("s", "o");
        let result = manager
            .execute_hooks(HookPhase::PreToolUse, "Bash", "{}", &ctx)
            .await;
        assert!(result.is_deny());
        assert!(result.reason.unwrap().contains("policies.typo"));

        let result = manager
            .execute_hooks(HookPhase::PreToolUse, "Read", "{}", &ctx)
            .await;
        assert!(result.allowed());
    }

    #[tokio::test]
    async fn test_configured_hooks_run() {
        let manager = manager();
        let config = HooksConfig::from_value(json!({
            "PreToolUse": [
                {"handler": "policies.allow"},
                {"handler": "policies.deny_bash", "matcher": "Bash"},
            ],
        }))
        .unwrap();
        manager.register_hooks_from_config(&config, Some("coder"));

        let ctx = HookContext::new("s", "o").with_agent("coder");
        let bash = manager
            .execute_hooks(HookPhase::PreToolUse, "Bash", "{}", &ctx)
            .await;
        let read = manager
            .execute_hooks(HookPhase::PreToolUse, "Read", "{}", &ctx)
            .await;
        assert_eq!(bash.reason.as_deref(), Some("no shell"));
        assert!(read.allowed());
    }
}
