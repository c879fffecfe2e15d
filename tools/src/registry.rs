use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use kestrel_protocol::{ErrorReason, ToolCall, ToolExecutionResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::spec::ToolSpec;
use crate::tool::{Tool, ToolContext};
use crate::validation::validate_arguments;

const REGISTERED_NAMES_FILE: &str = "tools_registered.json";

/// Name of the always-bypassed todo-management tool (spec §4.4: "a fixed,
/// documented list of read-only tools plus the todo-management tool").
pub const TODO_MANAGEMENT_TOOL: &str = "todo_write";

/// Maps tool names to executable `Tool` implementations and runs them
/// with bounded concurrency (spec §4.3).
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
    state_dir: Option<PathBuf>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: DashMap::new(), state_dir: None }
    }

    /// A registry that persists its registered tool names under
    /// `state_dir` (spec §4.3: "so that the enabled-tool list survives
    /// process restarts even before tools are re-registered").
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self { tools: DashMap::new(), state_dir: Some(state_dir.into()) }
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!(tool_name = tool.name(), "registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.clone())
    }

    /// Whether `name` is part of the fixed auto-bypass set: a read-only
    /// tool, or the todo-management tool (spec §4.4).
    pub fn is_bypassed(&self, name: &str) -> bool {
        if name == TODO_MANAGEMENT_TOOL {
            return true;
        }
        self.tools.get(name).map(|entry| entry.is_read_only()).unwrap_or(false)
    }

    /// Returns the declared `ToolSpec` for each enabled name, preserving
    /// the caller's ordering (spec §4.3). Names with no registered tool
    /// are skipped with a warning rather than failing the whole call.
    pub fn get_tool_definitions(&self, enabled_names: &[String]) -> Vec<ToolSpec> {
        enabled_names
            .iter()
            .filter_map(|name| match self.tools.get(name) {
                Some(tool) => Some(tool.spec().clone()),
                None => {
                    warn!(tool_name = name, "enabled tool is not registered, skipping its definition");
                    None
                }
            })
            .collect()
    }

    fn registered_names_path(&self) -> Option<PathBuf> {
        self.state_dir.as_ref().map(|dir| dir.join(REGISTERED_NAMES_FILE))
    }

    /// Writes the current set of registered tool names to the state-dir
    /// key-value file. A no-op when this registry has no `state_dir`.
    pub async fn persist_names(&self) -> Result<(), ToolError> {
        let Some(path) = self.registered_names_path() else { return Ok(()) };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ToolError::Persist { path: path.display().to_string(), source })?;
        }
        let names: Vec<String> = self.tools.iter().map(|entry| entry.key().clone()).collect();
        let bytes = serde_json::to_vec_pretty(&names)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| ToolError::Persist { path: path.display().to_string(), source })
    }

    /// Reads back the tool names persisted by a prior process, so the
    /// enabled-tool list is known before those tools are re-registered.
    pub async fn load_persisted_names(&self) -> Result<Vec<String>, ToolError> {
        let Some(path) = self.registered_names_path() else { return Ok(Vec::new()) };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(ToolError::Load { path: path.display().to_string(), source }),
        }
    }

    /// Validates `arguments` against `name`'s declared schema, returning
    /// a synthetic `ValidationFailed` result on mismatch (spec §4.2(d)).
    fn validate(&self, call: &ToolCall) -> Result<serde_json::Value, ToolExecutionResult> {
        let parsed: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(err) => {
                return Err(ToolExecutionResult::error(
                    call.id.clone(),
                    call.name.clone(),
                    format!("arguments are not valid JSON: {err}"),
                    ErrorReason::InvalidInput,
                    0,
                ));
            }
        };

        if let Some(tool) = self.tools.get(&call.name) {
            if let Err(message) = validate_arguments(&tool.spec().parameters_schema, &parsed) {
                return Err(ToolExecutionResult::error(
                    call.id.clone(),
                    call.name.clone(),
                    message,
                    ErrorReason::ValidationFailed,
                    0,
                ));
            }
        }
        Ok(parsed)
    }

    /// Runs `invocations` in batches of `max_concurrency`, waiting for a
    /// batch to finish before starting the next (spec §4.3, §9: kept
    /// batched by design, not a streaming scheduler).
    ///
    /// `strict_validation` gates the JSON-schema check (spec §6
    /// `strictToolValidation`); unregistered tool names always synthesize
    /// a `NotFound` result regardless of that flag.
    pub async fn execute_tool_calls(
        &self,
        invocations: &[ToolCall],
        ctx: &ToolContext,
        max_concurrency: usize,
        strict_validation: bool,
        cancel: CancellationToken,
    ) -> Vec<ToolExecutionResult> {
        let batch_size = max_concurrency.max(1);
        let mut results = Vec::with_capacity(invocations.len());

        for batch in invocations.chunks(batch_size) {
            let futures = batch.iter().map(|call| self.execute_one(call, ctx, strict_validation, cancel.clone()));
            let batch_results = futures::future::join_all(futures).await;
            results.extend(batch_results);
        }

        results
    }

    async fn execute_one(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        strict_validation: bool,
        cancel: CancellationToken,
    ) -> ToolExecutionResult {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool_name = call.name, "tool not found in registry");
            return ToolExecutionResult::error(
                call.id.clone(),
                call.name.clone(),
                format!("tool '{}' is not registered", call.name),
                ErrorReason::NotFound,
                0,
            );
        };

        let params = if strict_validation {
            match self.validate(call) {
                Ok(params) => params,
                Err(result) => return result,
            }
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(value) => value,
                Err(err) => {
                    return ToolExecutionResult::error(
                        call.id.clone(),
                        call.name.clone(),
                        format!("arguments are not valid JSON: {err}"),
                        ErrorReason::InvalidInput,
                        0,
                    );
                }
            }
        };

        let started = tokio::time::Instant::now();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                ToolExecutionResult::error(
                    call.id.clone(),
                    call.name.clone(),
                    "tool execution was cancelled",
                    ErrorReason::Aborted,
                    started.elapsed().as_millis() as u64,
                )
            }
            result = tool.execute(&call.id, params, ctx, cancel.clone()) => result,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kestrel_protocol::ToolMessageStatus;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct ReverseTextTool;

    #[async_trait]
    impl Tool for ReverseTextTool {
        fn spec(&self) -> &ToolSpec {
            static SPEC: std::sync::OnceLock<ToolSpec> = std::sync::OnceLock::new();
            SPEC.get_or_init(|| {
                ToolSpec::new(
                    "reverse_text",
                    "Reverses the given text",
                    serde_json::json!({
                        "type": "object",
                        "properties": { "text": { "type": "string" } },
                        "required": ["text"],
                    }),
                )
                .read_only()
            })
        }

        async fn execute(
            &self,
            id: &str,
            params: serde_json::Value,
            _ctx: &ToolContext,
            _cancel: CancellationToken,
        ) -> ToolExecutionResult {
            let text = params.get("text").and_then(|v| v.as_str()).unwrap_or_default();
            let reversed: String = text.chars().rev().collect();
            ToolExecutionResult::text_ok(id, "reverse_text", reversed, 0)
        }
    }

    struct SleepTool {
        millis: u64,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for SleepTool {
        fn spec(&self) -> &ToolSpec {
            static SPEC: std::sync::OnceLock<ToolSpec> = std::sync::OnceLock::new();
            SPEC.get_or_init(|| ToolSpec::new("sleep", "sleeps", serde_json::json!({"type": "object"})))
        }

        async fn execute(
            &self,
            id: &str,
            _params: serde_json::Value,
            _ctx: &ToolContext,
            cancel: CancellationToken,
        ) -> ToolExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(self.millis)) => {
                    ToolExecutionResult::text_ok(id, "sleep", "done", self.millis)
                }
                () = cancel.cancelled() => {
                    ToolExecutionResult::error(id, "sleep", "aborted", ErrorReason::Aborted, 0)
                }
            }
        }
    }

    #[tokio::test]
    async fn not_found_synthesizes_error_without_invoking() {
        let registry = ToolRegistry::new();
        let call = ToolCall { id: "1".into(), name: "missing".into(), arguments: "{}".into() };
        let ctx = ToolContext::new("c");
        let results =
            registry.execute_tool_calls(&[call], &ctx, 3, false, CancellationToken::new()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ToolMessageStatus::Error);
        assert_eq!(results[0].error_reason(), Some(ErrorReason::NotFound));
    }

    #[tokio::test]
    async fn validation_failure_does_not_execute() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(ReverseTextTool));
        let call = ToolCall { id: "1".into(), name: "reverse_text".into(), arguments: "{}".into() };
        let ctx = ToolContext::new("c");
        let results =
            registry.execute_tool_calls(&[call], &ctx, 3, true, CancellationToken::new()).await;
        assert_eq!(results[0].error_reason(), Some(ErrorReason::ValidationFailed));
    }

    #[tokio::test]
    async fn bypass_set_includes_read_only_and_todo_tool() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(ReverseTextTool));
        assert!(registry.is_bypassed("reverse_text"));
        assert!(registry.is_bypassed(TODO_MANAGEMENT_TOOL));
        assert!(!registry.is_bypassed("shell"));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_of_three_completes_in_one_sleep_not_three() {
        let registry = ToolRegistry::new();
        let calls_counter = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(SleepTool { millis: 200, calls: calls_counter.clone() }));
        let calls: Vec<ToolCall> = (0..3)
            .map(|i| ToolCall { id: i.to_string(), name: "sleep".into(), arguments: "{}".into() })
            .collect();
        let ctx = ToolContext::new("c");

        let started = tokio::time::Instant::now();
        let results = registry.execute_tool_calls(&calls, &ctx, 3, false, CancellationToken::new()).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 3);
        assert!(elapsed < Duration::from_millis(400), "elapsed={elapsed:?}");
        assert_eq!(calls_counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_of_one_serializes_batches() {
        let registry = ToolRegistry::new();
        let calls_counter = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(SleepTool { millis: 200, calls: calls_counter.clone() }));
        let calls: Vec<ToolCall> = (0..3)
            .map(|i| ToolCall { id: i.to_string(), name: "sleep".into(), arguments: "{}".into() })
            .collect();
        let ctx = ToolContext::new("c");

        let started = tokio::time::Instant::now();
        let results = registry.execute_tool_calls(&calls, &ctx, 1, false, CancellationToken::new()).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 3);
        assert!(elapsed >= Duration::from_millis(600), "elapsed={elapsed:?}");
    }

    #[tokio::test]
    async fn cancellation_yields_aborted_result() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(SleepTool { millis: 5_000, calls: Arc::new(AtomicUsize::new(0)) }));
        let call = ToolCall { id: "1".into(), name: "sleep".into(), arguments: "{}".into() };
        let ctx = ToolContext::new("c");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = registry.execute_tool_calls(&[call], &ctx, 1, false, cancel).await;
        assert_eq!(results[0].error_reason(), Some(ErrorReason::Aborted));
    }

    #[tokio::test]
    async fn persist_and_load_names_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::with_state_dir(dir.path());
        registry.register(Arc::new(ReverseTextTool));
        registry.persist_names().await.unwrap();

        let fresh = ToolRegistry::with_state_dir(dir.path());
        let names = fresh.load_persisted_names().await.unwrap();
        assert_eq!(names, vec!["reverse_text".to_string()]);
    }
}
