//! Hook context - caller-supplied state for one hook pipeline run

use std::fmt;
use tokio_util::sync::CancellationToken;

/// Context handed to `HookManager::execute_hooks` by the agent loop
///
/// Identity fields end up in every `HookEvent` built during the run. For
/// PostToolUse the caller sets `tool_output` before invoking the pipeline.
///
/// Cancelling `cancel` (e.g. because the owning agent turn was aborted)
/// stops the in-flight hook and ends the run with a deny.
#[derive(Clone, Default)]
pub struct HookContext {
    /// Session the tool call belongs to
    pub session_id: String,

    /// Orchestrator coordinating the agents
    pub orchestrator_id: String,

    /// Agent that requested the tool call (None = global hooks only)
    pub agent_id: Option<String>,

    /// Tool output (PostToolUse only)
    pub tool_output: Option<String>,

    /// Cancellation for the owning agent turn
    pub cancel: CancellationToken,
}

impl HookContext {
    /// Create a context for an agent's tool call
    pub fn new(session_id: impl Into<String>, orchestrator_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            orchestrator_id: orchestrator_id.into(),
            ..Default::default()
        }
    }

    /// Set the requesting agent
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Attach the tool output for PostToolUse hooks
    pub fn with_tool_output(mut self, output: impl Into<String>) -> Self {
        self.tool_output = Some(output.into());
        self
    }

    /// Use an existing cancellation token (usually a child of the turn's token)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether the owning turn has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl fmt::Debug for HookContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("session_id", &self.session_id)
            .field("orchestrator_id", &self.orchestrator_id)
            .field("agent_id", &self.agent_id)
            .field("has_tool_output", &self.tool_output.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
