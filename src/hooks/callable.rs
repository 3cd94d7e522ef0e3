//! In-process callable hooks
//!
//! Contains:
//! - `HookOutput` - loosely-typed handler return value
//! - `HookHandler` - async or blocking function invoked with a `HookEvent`
//! - `HandlerRegistry` - startup-time table of symbolic handler names
//! - `CallableHook` - runs a handler under a timeout with the failure policy

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::task::AbortOnDropHandle;

use super::hook::{Hook, HookFault, HookSettings};
use super::matcher::ToolMatcher;
use super::types::{HookEvent, HookPhase, HookResult};
use crate::core::HookContext;

const KIND: &str = "CallableHook";

/// Value returned by a hook handler
///
/// Handlers may return a full `HookResult`, a JSON value shaped like one, or
/// nothing at all.
#[derive(Debug, Clone)]
pub enum HookOutput {
    Result(HookResult),
    Value(Value),
    Nothing,
}

impl HookOutput {
    /// Normalize into a `HookResult`
    ///
    /// JSON objects are decoded with the wire rules; `null` and `Nothing`
    /// allow; any other value allows with a warning.
    pub fn normalize(self, hook_name: &str) -> HookResult {
        match self {
            HookOutput::Result(result) => result,
            HookOutput::Nothing | HookOutput::Value(Value::Null) => HookResult::allow(),
            HookOutput::Value(value @ Value::Object(_)) => {
                HookResult::from_value(value).unwrap_or_else(HookResult::allow)
            }
            HookOutput::Value(other) => {
                tracing::warn!(
                    "[{}] Hook {} returned unsupported value {}, treating as allow",
                    KIND,
                    hook_name,
                    other
                );
                HookResult::allow()
            }
        }
    }
}

impl From<HookResult> for HookOutput {
    fn from(result: HookResult) -> Self {
        HookOutput::Result(result)
    }
}

impl From<Option<HookResult>> for HookOutput {
    fn from(result: Option<HookResult>) -> Self {
        result.map_or(HookOutput::Nothing, HookOutput::Result)
    }
}

impl From<Value> for HookOutput {
    fn from(value: Value) -> Self {
        HookOutput::Value(value)
    }
}

impl From<Map<String, Value>> for HookOutput {
    fn from(map: Map<String, Value>) -> Self {
        HookOutput::Value(Value::Object(map))
    }
}

impl From<()> for HookOutput {
    fn from(_: ()) -> Self {
        HookOutput::Nothing
    }
}

type AsyncHookFn = Arc<dyn Fn(HookEvent) -> BoxFuture<'static, HookOutput> + Send + Sync>;
type BlockingHookFn = Arc<dyn Fn(HookEvent) -> HookOutput + Send + Sync>;

/// Function invoked by a `CallableHook`
#[derive(Clone)]
pub enum HookHandler {
    /// Runs as a tokio task; aborted on timeout or cancellation
    Async(AsyncHookFn),
    /// Runs on the blocking pool so the timeout stays enforceable
    ///
    /// A blocking thread cannot be preempted: on timeout its eventual
    /// result is discarded.
    Blocking(BlockingHookFn),
}

impl HookHandler {
    /// Wrap an async function
    pub fn from_async<F, Fut, O>(f: F) -> Self
    where
        F: Fn(HookEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<HookOutput>,
    {
        HookHandler::Async(Arc::new(move |event| {
            let fut = f(event);
            async move { fut.await.into() }.boxed()
        }))
    }

    /// Wrap a synchronous (possibly blocking) function
    pub fn from_blocking<F, O>(f: F) -> Self
    where
        F: Fn(HookEvent) -> O + Send + Sync + 'static,
        O: Into<HookOutput>,
    {
        HookHandler::Blocking(Arc::new(move |event| f(event).into()))
    }

    fn spawn(&self, event: HookEvent) -> JoinHandle<HookOutput> {
        match self {
            HookHandler::Async(f) => tokio::spawn(f(event)),
            HookHandler::Blocking(f) => {
                let f = Arc::clone(f);
                tokio::task::spawn_blocking(move || f(event))
            }
        }
    }
}

impl fmt::Debug for HookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookHandler::Async(_) => f.write_str("HookHandler::Async"),
            HookHandler::Blocking(_) => f.write_str("HookHandler::Blocking"),
        }
    }
}

/// Table of handlers addressable by symbolic name
///
/// Populated at startup so that configuration can refer to handlers by name
/// (e.g. `"policies.block_rm"`) and resolution failures show up when the
/// configuration is applied rather than mid-run.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HookHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler under a name
    pub fn register(&self, name: impl Into<String>, handler: HookHandler) {
        let name = name.into();
        tracing::debug!("[HandlerRegistry] Registering handler: {}", name);
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name, handler);
    }

    /// Look up a handler
    pub fn resolve(&self, name: &str) -> Option<HookHandler> {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        f.debug_set().entries(handlers.keys()).finish()
    }
}

#[derive(Debug, Clone)]
enum CallableTarget {
    Resolved(HookHandler),
    /// The handler reference could not be bound; always denies
    Unresolved { reference: String },
}

/// Hook that invokes an in-process function
///
/// # Example
///
/// ```ignore
/// let hook = CallableHook::from_async("block_rm", |event: HookEvent| async move {
///     let cmd = event.tool_input.get("command").and_then(|v| v.as_str()).unwrap_or("");
///     if cmd.contains("rm -rf") {
///         HookResult::deny("Dangerous command blocked")
///     } else {
///         HookResult::allow()
///     }
/// })
/// .with_matcher("Bash")
/// .with_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct CallableHook {
    settings: HookSettings,
    target: CallableTarget,
}

impl CallableHook {
    /// Create a hook around a handler (matches all tools, 30s timeout, fail-open)
    pub fn new(name: impl Into<String>, handler: HookHandler) -> Self {
        Self {
            settings: HookSettings::new(name),
            target: CallableTarget::Resolved(handler),
        }
    }

    /// Create a hook around an async function
    pub fn from_async<F, Fut, O>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(HookEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        O: Into<HookOutput>,
    {
        Self::new(name, HookHandler::from_async(f))
    }

    /// Create a hook around a synchronous function
    pub fn from_fn<F, O>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(HookEvent) -> O + Send + Sync + 'static,
        O: Into<HookOutput>,
    {
        Self::new(name, HookHandler::from_blocking(f))
    }

    /// Create a hook whose handler reference failed to resolve
    pub fn unresolved(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            settings: HookSettings::new(name),
            target: CallableTarget::Unresolved {
                reference: reference.into(),
            },
        }
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

    pub fn settings(&self) -> &HookSettings {
        &self.settings
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.target, CallableTarget::Resolved(_))
    }

    async fn run(
        &self,
        handler: &HookHandler,
        event: HookEvent,
        tool_name: &str,
        ctx: &HookContext,
    ) -> HookResult {
        // Dropping this future (e.g. a caller-side timeout) aborts the handler task
        let mut task = AbortOnDropHandle::new(handler.spawn(event));

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                task.abort();
                self.settings.on_fault(KIND, tool_name, HookFault::Cancelled)
            }
            joined = tokio::time::timeout(self.settings.timeout, &mut task) => match joined {
                Ok(Ok(output)) => output.normalize(&self.settings.name),
                Ok(Err(e)) => {
                    self.settings
                        .on_fault(KIND, tool_name, HookFault::Error(join_error_message(e)))
                }
                Err(_) => {
                    task.abort();
                    self.settings.on_fault(KIND, tool_name, HookFault::Timeout)
                }
            },
        }
    }
}

#[async_trait]
impl Hook for CallableHook {
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
        let handler = match &self.target {
            CallableTarget::Resolved(handler) => handler,
            CallableTarget::Unresolved { reference } => {
                // An unloadable check is never assumed safe, regardless of fail_closed
                tracing::error!(
                    "[{}] Hook {} has no handler '{}'",
                    KIND,
                    self.settings.name,
                    reference
                );
                return HookResult::deny(format!(
                    "Hook import failed: no handler registered as '{}'",
                    reference
                ));
            }
        };

        let event = HookEvent::new(phase, tool_name, arguments, ctx);
        self.run(handler, event, tool_name, ctx).await
    }
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            return (*msg).to_string();
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            return msg.clone();
        }
        return "handler panicked".to_string();
    }
    err.to_string()
}
