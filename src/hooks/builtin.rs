//! Built-in PostToolUse hooks
//!
//! - `mid_stream_injection` - surfaces pending updates (e.g. answers from other
//!   agents) inside the tool result
//! - `reminder_extraction` - lifts a `reminder` field out of JSON tool output
//!   into a user message so the agent does not miss it

use std::time::Duration;

use serde_json::Value;

use super::callable::CallableHook;
use super::types::{HookEvent, HookResult, InjectionStrategy};

/// Timeout for built-in hooks
pub const BUILTIN_HOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Hook that injects whatever the callback returns into the tool result
///
/// The callback is polled once per tool call; `None` or an empty string
/// injects nothing.
pub fn mid_stream_injection<F>(callback: F) -> CallableHook
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    CallableHook::from_fn("mid_stream_injection", move |event: HookEvent| {
        match callback() {
            Some(content) if !content.is_empty() => {
                tracing::debug!(
                    "[MidStreamInjection] Injecting content for {}",
                    event.tool_name
                );
                HookResult::allow().with_injection(content, InjectionStrategy::ToolResult)
            }
            _ => HookResult::allow(),
        }
    })
    .with_timeout(BUILTIN_HOOK_TIMEOUT)
}

/// Hook that turns a JSON tool output's `reminder` field into a user message
pub fn reminder_extraction() -> CallableHook {
    CallableHook::from_fn("reminder_extraction", |event: HookEvent| {
        match event.tool_output.as_deref().and_then(extract_reminder) {
            Some(reminder) => {
                tracing::debug!(
                    "[ReminderExtraction] Extracting reminder from {}",
                    event.tool_name
                );
                HookResult::allow().with_injection(reminder, InjectionStrategy::UserMessage)
            }
            None => HookResult::allow(),
        }
    })
    .with_timeout(BUILTIN_HOOK_TIMEOUT)
}

fn extract_reminder(output: &str) -> Option<String> {
    match serde_json::from_str::<Value>(output).ok()? {
        Value::Object(map) => match map.get("reminder") {
            Some(Value::String(reminder)) if !reminder.is_empty() => Some(reminder.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HookContext;
    use crate::hooks::hook::Hook;
    use crate::hooks::types::HookPhase;

    async fn run(hook: &CallableHook, tool_output: Option<&str>) -> HookResult {
        let mut ctx = HookContext::new("s", "o");
        ctx.tool_output = tool_output.map(String::from);
        hook.execute(HookPhase::PostToolUse, "tool", "{}", &ctx).await
    }

    #[tokio::test]
    async fn test_mid_stream_callback_returns_none() {
        let hook = mid_stream_injection(|| None);
        let result = run(&hook, None).await;
        assert!(result.allowed());
        assert!(result.injection.is_none());
    }

    #[tokio::test]
    async fn test_mid_stream_callback_returns_content() {
        let hook = mid_stream_injection(|| Some("Injected content from other agent".into()));
        let result = run(&hook, None).await;
        let injection = result.injection.unwrap();
        assert_eq!(injection.content, "Injected content from other agent");
        assert_eq!(injection.strategy, InjectionStrategy::ToolResult);
    }

    #[tokio::test]
    async fn test_reminder_no_output() {
        let result = run(&reminder_extraction(), None).await;
        assert!(result.allowed());
        assert!(result.injection.is_none());
    }

    #[tokio::test]
    async fn test_reminder_non_json_output() {
        let result = run(&reminder_extraction(), Some("plain text output")).await;
        assert!(result.injection.is_none());
    }

    #[tokio::test]
    async fn test_reminder_json_without_reminder() {
        let result = run(&reminder_extraction(), Some(r#"{"result": "success"}"#)).await;
        assert!(result.injection.is_none());

        let result = run(&reminder_extraction(), Some(r#"{"reminder": 3}"#)).await;
        assert!(result.injection.is_none());
    }

    #[tokio::test]
    async fn test_reminder_extracted() {
        let result = run(
            &reminder_extraction(),
            Some(r#"{"result": "ok", "reminder": "Remember this!"}"#),
        )
        .await;
        let injection = result.injection.unwrap();
        assert_eq!(injection.content, "Remember this!");
        assert_eq!(injection.strategy, InjectionStrategy::UserMessage);
    }
}
