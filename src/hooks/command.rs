//! External command hooks
//!
//! The command receives the `HookEvent` as one JSON document on stdin, plus a
//! few scalar duplicates in the environment for scripts that would rather not
//! parse JSON:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `MASSGEN_HOOK_TYPE` | `PreToolUse` / `PostToolUse` |
//! | `MASSGEN_TOOL_NAME` | tool being called |
//! | `MASSGEN_SESSION_ID` | session id |
//! | `MASSGEN_AGENT_ID` | agent id (empty if none) |
//! | `MASSGEN_ORCHESTRATOR_ID` | orchestrator id |
//! | `MASSGEN_HOOK_SCHEMA_VERSION` | version of the stdin document |
//!
//! It answers with a `HookResult`-shaped JSON object on stdout:
//!
//! ```json
//! {"decision": "deny", "reason": "no writes outside the workspace"}
//! ```
//!
//! The exit code is informational only. A non-zero exit is logged and the
//! call is allowed, even for `fail_closed` hooks.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::hook::{Hook, HookFault, HookSettings};
use super::matcher::ToolMatcher;
use super::types::{HookEvent, HookPhase, HookResult, HOOK_SCHEMA_VERSION};
use crate::core::HookContext;

const KIND: &str = "CommandHook";

/// Default prefix for the scalar environment variables
pub const DEFAULT_ENV_PREFIX: &str = "MASSGEN_";

/// Hook that runs an external executable
#[derive(Debug, Clone)]
pub struct CommandHook {
    settings: HookSettings,
    program: PathBuf,
    args: Vec<String>,
    env_prefix: String,
}

impl CommandHook {
    /// Create a hook for an executable (matches all tools, 30s timeout, fail-open)
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            settings: HookSettings::new(name),
            program: program.into(),
            args: Vec::new(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Fixed arguments passed before anything else
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_matcher(mut self, matcher: &str) -> Self {
        self.settings.matcher = ToolMatcher::new(matcher);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.settings.fail_closed = fail_closed;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, event: &HookEvent) -> Command {
        let prefix = &self.env_prefix;
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(format!("{prefix}HOOK_TYPE"), event.hook_type.as_str())
            .env(format!("{prefix}TOOL_NAME"), &event.tool_name)
            .env(format!("{prefix}SESSION_ID"), &event.session_id)
            .env(
                format!("{prefix}AGENT_ID"),
                event.agent_id.as_deref().unwrap_or(""),
            )
            .env(format!("{prefix}ORCHESTRATOR_ID"), &event.orchestrator_id)
            .env(
                format!("{prefix}HOOK_SCHEMA_VERSION"),
                HOOK_SCHEMA_VERSION.to_string(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child on timeout or cancellation kills it
            .kill_on_drop(true);
        command
    }

    /// Spawn the process, feed it the event and wait for it to exit
    async fn run_process(&self, event: &HookEvent, payload: String) -> std::io::Result<Output> {
        let mut child = self.command(event).spawn()?;
        let stdin = child.stdin.take();

        let write_stdin = async move {
            if let Some(mut stdin) = stdin {
                // The script may exit without reading stdin; that is not an error
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    tracing::debug!("[{}] Could not write event to stdin: {}", KIND, e);
                }
            }
        };

        let ((), output) = tokio::join!(write_stdin, child.wait_with_output());
        output
    }

    fn interpret(&self, tool_name: &str, output: Output) -> HookResult {
        let name = &self.settings.name;

        if !output.stderr.is_empty() {
            tracing::debug!(
                "[{}] stderr from {}: {}",
                KIND,
                name,
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }

        if !output.status.success() {
            tracing::warn!(
                "[{}] {} exited with code {:?} for {}, allowing",
                KIND,
                name,
                output.status.code(),
                tool_name
            );
            return HookResult::allow();
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            tracing::warn!("[{}] {} produced no output, allowing", KIND, name);
            return HookResult::allow();
        }

        match serde_json::from_str::<Value>(stdout) {
            Ok(value) => HookResult::from_value(value).unwrap_or_else(|| {
                tracing::warn!("[{}] {} did not return a result object, allowing", KIND, name);
                HookResult::allow()
            }),
            Err(e) => {
                tracing::warn!("[{}] Invalid JSON from {}: {}", KIND, name, e);
                HookResult::allow()
            }
        }
    }
}

#[async_trait]
impl Hook for CommandHook {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn matcher(&self) -> &ToolMatcher {
        &self.settings.matcher
    }

    async fn execute(
        &self,
        phase: HookPhase,
        tool_name: &str,
        arguments: &str,
        ctx: &HookContext,
    ) -> HookResult {
        let event = HookEvent::new(phase, tool_name, arguments, ctx);
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                return self
                    .settings
                    .on_fault(KIND, tool_name, HookFault::Error(e.to_string()))
            }
        };

        tracing::debug!(
            "[{}] Running {} ({}) for {}",
            KIND,
            self.settings.name,
            self.program.display(),
            tool_name
        );

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                self.settings.on_fault(KIND, tool_name, HookFault::Cancelled)
            }
            finished = tokio::time::timeout(self.settings.timeout, self.run_process(&event, payload)) => {
                match finished {
                    Ok(Ok(output)) => self.interpret(tool_name, output),
                    Ok(Err(e)) => self.settings.on_fault(
                        KIND,
                        tool_name,
                        HookFault::Error(format!("{}: {}", self.program.display(), e)),
                    ),
                    Err(_) => self.settings.on_fault(KIND, tool_name, HookFault::Timeout),
                }
            }
        }
    }
}
