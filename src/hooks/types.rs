//! Hook Types
//!
//! Core records for the hooks system:
//! - `HookPhase` - When a hook fires
//! - `HookEvent` - Immutable input handed to one hook invocation
//! - `HookResult` - Result returned from a hook (and from the pipeline)
//! - `PermissionDecision` - allow / deny / ask verdict
//! - `Injection` - Content surfaced to the agent after a tool call

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::HookContext;

/// Version of the JSON document written to command hooks
pub const HOOK_SCHEMA_VERSION: u32 = 1;

/// Hook phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    /// Before a tool is executed - can block, flag, or rewrite arguments
    PreToolUse,
    /// After a tool executes - can inject content
    PostToolUse,
}

impl HookPhase {
    /// All phases, in pipeline order
    pub const ALL: [HookPhase; 2] = [HookPhase::PreToolUse, HookPhase::PostToolUse];

    /// Wire name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::PreToolUse => "PreToolUse",
            HookPhase::PostToolUse => "PostToolUse",
        }
    }

    /// Parse a wire name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PreToolUse" => Some(HookPhase::PreToolUse),
            "PostToolUse" => Some(HookPhase::PostToolUse),
            _ => None,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission decision returned by a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Let the tool call proceed
    #[default]
    Allow,
    /// Block the tool call; the reason is surfaced to the agent
    Deny,
    /// Flag the call for confirmation; later hooks still run
    Ask,
}

impl PermissionDecision {
    /// Wire name of the decision
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionDecision::Allow => "allow",
            PermissionDecision::Deny => "deny",
            PermissionDecision::Ask => "ask",
        }
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How injected content reaches the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionStrategy {
    /// Appended to the tool result
    #[default]
    ToolResult,
    /// Surfaced as a synthetic user message on the next turn
    UserMessage,
}

/// Content injected into the agent's context after a tool call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Injection {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub strategy: InjectionStrategy,
}

impl Injection {
    pub fn new(content: impl Into<String>, strategy: InjectionStrategy) -> Self {
        Self {
            content: content.into(),
            strategy,
        }
    }
}

/// Result returned from a hook
///
/// `allowed` on the wire is a legacy mirror of `decision`: it is derived when
/// encoding, and a falsy `allowed` forces a deny when decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(into = "WireHookResult")]
pub struct HookResult {
    /// Permission decision
    pub decision: PermissionDecision,

    /// Reason for the decision (shown to the agent if denied)
    pub reason: Option<String>,

    /// Replacement arguments (PreToolUse)
    pub updated_input: Option<Map<String, Value>>,

    /// Legacy replacement arguments as a raw JSON string; wins over `updated_input`
    pub modified_args: Option<String>,

    /// Content to inject (PostToolUse)
    pub injection: Option<Injection>,

    /// Free-form hook metadata
    pub metadata: Map<String, Value>,
}

impl HookResult {
    /// Allow the operation
    pub fn allow() -> Self {
        Self::default()
    }

    /// Deny the operation with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: PermissionDecision::Deny,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Flag the operation for confirmation
    pub fn ask(reason: impl Into<String>) -> Self {
        Self {
            decision: PermissionDecision::Ask,
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Add a reason to an existing result
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Replace the tool arguments
    pub fn with_updated_input(mut self, input: Map<String, Value>) -> Self {
        self.updated_input = Some(input);
        self
    }

    /// Inject content after the tool call
    pub fn with_injection(
        mut self,
        content: impl Into<String>,
        strategy: InjectionStrategy,
    ) -> Self {
        self.injection = Some(Injection::new(content, strategy));
        self
    }

    /// Legacy view of the decision
    pub fn allowed(&self) -> bool {
        self.decision != PermissionDecision::Deny
    }

    pub fn is_deny(&self) -> bool {
        self.decision == PermissionDecision::Deny
    }

    /// Normalize a loosely-typed JSON value into a result
    ///
    /// Returns `None` for anything that is not an object. Objects always
    /// decode: see `from_map`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            _ => None,
        }
    }

    /// Decode a result object field by field
    ///
    /// `allowed` and `decision` are read first and never depend on the other
    /// fields. Unknown keys are ignored; a field of the wrong type is dropped
    /// with a warning.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let allowed = match map.remove("allowed") {
            None | Some(Value::Bool(true)) => true,
            Some(Value::Bool(false)) => false,
            Some(other) => {
                tracing::warn!("[HookResult] Non-boolean 'allowed': {}", other);
                is_truthy(&other)
            }
        };

        let decision = match map.remove("decision") {
            None | Some(Value::Null) => PermissionDecision::Allow,
            Some(Value::String(name)) => match name.as_str() {
                "allow" => PermissionDecision::Allow,
                "deny" => PermissionDecision::Deny,
                "ask" => PermissionDecision::Ask,
                other => {
                    tracing::warn!("[HookResult] Unknown decision '{}', treating as allow", other);
                    PermissionDecision::Allow
                }
            },
            Some(other) => {
                tracing::warn!("[HookResult] Unknown decision {}, treating as allow", other);
                PermissionDecision::Allow
            }
        };
        let decision = if allowed {
            decision
        } else {
            PermissionDecision::Deny
        };

        Self {
            decision,
            reason: take_string(&mut map, "reason"),
            updated_input: take_object(&mut map, "updated_input"),
            modified_args: take_string(&mut map, "modified_args"),
            injection: take_injection(&mut map),
            metadata: take_object(&mut map, "metadata").unwrap_or_default(),
        }
    }

    /// Encode to the wire JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<'de> Deserialize<'de> for HookResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_map)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => {
            tracing::warn!("[HookResult] Ignoring non-string '{}': {}", key, other);
            None
        }
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match map.remove(key)? {
        Value::Object(object) => Some(object),
        Value::Null => None,
        other => {
            tracing::warn!("[HookResult] Ignoring non-object '{}': {}", key, other);
            None
        }
    }
}

fn take_injection(map: &mut Map<String, Value>) -> Option<Injection> {
    let mut inject = take_object(map, "inject")?;
    let content = take_string(&mut inject, "content").unwrap_or_default();
    let strategy = match take_string(&mut inject, "strategy").as_deref() {
        None | Some("tool_result") => InjectionStrategy::ToolResult,
        Some("user_message") => InjectionStrategy::UserMessage,
        Some(other) => {
            tracing::warn!("[HookResult] Unknown injection strategy '{}'", other);
            InjectionStrategy::ToolResult
        }
    };
    Some(Injection::new(content, strategy))
}

/// Wire shape of `HookResult`
#[derive(Serialize)]
struct WireHookResult {
    allowed: bool,
    decision: String,
    reason: Option<String>,
    updated_input: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_args: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
    inject: Option<Injection>,
}

impl From<HookResult> for WireHookResult {
    fn from(result: HookResult) -> Self {
        Self {
            allowed: result.allowed(),
            decision: result.decision.as_str().to_string(),
            reason: result.reason,
            updated_input: result.updated_input,
            modified_args: result.modified_args,
            metadata: result.metadata,
            inject: result.injection,
        }
    }
}

/// Decode the pipeline's JSON argument string into a tool input object
///
/// Empty → `{}`; anything that is not a JSON object → `{"raw": arguments}`.
pub fn decode_arguments(arguments: &str) -> Map<String, Value> {
    if arguments.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("raw".to_string(), Value::String(arguments.to_string()));
            map
        }
    }
}

/// Input handed to a single hook invocation
///
/// Built fresh for every hook call inside a pipeline run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    pub schema_version: u32,
    pub hook_type: HookPhase,
    pub session_id: String,
    pub orchestrator_id: String,
    pub agent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub tool_input: Map<String, Value>,
    /// Only populated for PostToolUse
    pub tool_output: Option<String>,
}

impl HookEvent {
    /// Build the event for one hook call
    pub fn new(phase: HookPhase, tool_name: &str, arguments: &str, ctx: &HookContext) -> Self {
        let tool_output = match phase {
            HookPhase::PostToolUse => ctx.tool_output.clone(),
            HookPhase::PreToolUse => None,
        };

        Self {
            schema_version: HOOK_SCHEMA_VERSION,
            hook_type: phase,
            session_id: ctx.session_id.clone(),
            orchestrator_id: ctx.orchestrator_id.clone(),
            agent_id: ctx.agent_id.clone(),
            timestamp: Utc::now(),
            tool_name: tool_name.to_string(),
            tool_input: decode_arguments(arguments),
            tool_output,
        }
    }

    /// Encode to the JSON document written to command hooks
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
