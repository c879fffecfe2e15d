use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::StreamExt;
use kestrel_approval::{partition_bypassed, ApprovalDecision, ApprovalOutcome, ApprovalRouter};
use kestrel_memory::ConversationStore;
use kestrel_metrics::{ContextWindowStatus, SessionMetrics};
use kestrel_model::{CompletionParams, CompletionResult, StreamEvent, ToolCallAccumulator, ToolDefinition};
use kestrel_protocol::{
    AgentConfig, AgentEvent, ErrorReason, EventSink, Message, MessageContent, ToolExecutionResult,
    ToolMessageStatus, Usage, UserPayload,
};
use kestrel_reminders::{ContextBuilder, ReminderContext};
use kestrel_tools::ToolContext;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::OrchestratorError;
use crate::options::{MessageResponse, SendOptions};
use crate::runtime::Runtime;

/// Safety cap on tool-call iterations within one turn (spec §4.2 step 6):
/// every iteration requires a fresh assistant reply, so this bounds the
/// turn loop rather than recursion depth.
const MAX_TOOL_ITERATIONS: u32 = 32;

struct LoopOutcome {
    content: MessageContent,
    usage: Option<Usage>,
}

/// Runs one conversation's turn loop to completion (spec §4.2).
///
/// Holds references, not ownership, to the shared [`Runtime`] and to a
/// [`ConversationStore`] and [`EventSink`] scoped to this orchestrator
/// instance (spec §3 "Ownership": "An Orchestrator holds references...
/// to a Memory, a ToolRegistry, a ModelBackend, and an EventSink — any
/// may be swapped at runtime"). The pending-approval table
/// (`ApprovalRouter`) and per-conversation `SessionMetrics` are owned
/// here, not shared, matching spec §5: "the pending-approval table is a
/// per-orchestrator map".
pub struct Orchestrator {
    runtime: Arc<Runtime>,
    config: AgentConfig,
    memory: Arc<ConversationStore>,
    events: Arc<dyn EventSink>,
    delegation_depth: u32,
    approvals: Arc<ApprovalRouter>,
    metrics: DashMap<String, SessionMetrics>,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<Runtime>,
        config: AgentConfig,
        memory: Arc<ConversationStore>,
        events: Arc<dyn EventSink>,
        delegation_depth: u32,
    ) -> Self {
        Self {
            runtime,
            config,
            memory,
            events,
            delegation_depth,
            approvals: Arc::new(ApprovalRouter::new()),
            metrics: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Resolves a pending `ToolApprovalRequired` (spec §4.4). Forwards
    /// directly to the owned `ApprovalRouter`; an unknown or
    /// already-resolved id is a benign no-op there.
    pub fn handle_tool_approval(&self, approval_id: &str, decision: ApprovalDecision) -> bool {
        self.approvals.resolve(approval_id, decision)
    }

    pub fn metrics_snapshot(&self, conversation_id: &str) -> SessionMetrics {
        self.metrics.get(conversation_id).map(|entry| entry.clone()).unwrap_or_default()
    }

    /// Runs one turn to completion (spec §4.2 steps 1-7).
    pub async fn send(
        &self,
        payload: impl Into<UserPayload>,
        opts: SendOptions,
    ) -> Result<MessageResponse, OrchestratorError> {
        let payload = payload.into();
        let conversation_key = opts.conversation_id.clone();
        let cancel = opts.signal.clone();
        let message_id = kestrel_protocol::new_id();

        // Step 1: allocate message id, load history.
        let history = self.memory.get(&conversation_key).await;

        // Step 2: reminder enhancement.
        let reminder_ctx = ReminderContext { conversation_id: &conversation_key, user_text: payload.text() };
        let enhanced = self.runtime.reminders.enhance(&reminder_ctx).await;
        let mut enhanced_text = String::new();
        for reminder in &enhanced {
            enhanced_text.push_str(reminder);
            enhanced_text.push('\n');
        }
        enhanced_text.push_str(payload.text());

        // Step 3: build user content and the initial provider message list.
        let user_content = ContextBuilder::build_user_content(&enhanced_text, payload.attachments());
        let new_user_msg = Message::user_with_content(user_content.clone());
        let mut provider_messages =
            ContextBuilder::build_provider_messages(&self.config.system_prompt, &history, &new_user_msg);

        // Step 4: append the user message immediately so cancellation still
        // yields a recorded turn (spec §4.2 step 4, §5 cancellation semantics).
        if let Err(err) = self.append_and_emit(&conversation_key, vec![new_user_msg]).await {
            self.events.emit(AgentEvent::Error {
                conversation_id: conversation_key.clone(),
                message_id: Some(message_id.clone()),
                error: err.to_string(),
            });
            return Err(err);
        }

        // Step 5: MessageStarted.
        self.events.emit(AgentEvent::MessageStarted {
            conversation_id: conversation_key.clone(),
            message_id: message_id.clone(),
            user_content,
            enhanced,
            tool_names: self.config.enabled_tools.clone(),
        });

        let started = tokio::time::Instant::now();

        // Step 6: the tool loop.
        let outcome =
            self.run_tool_loop(&conversation_key, &message_id, &mut provider_messages, opts.stream, cancel).await;

        // Step 7: Done or Error, exactly one, terminating the event stream.
        match outcome {
            Ok(outcome) => {
                self.events.emit(AgentEvent::Done {
                    conversation_id: conversation_key.clone(),
                    message_id: message_id.clone(),
                    response_time_ms: started.elapsed().as_millis() as u64,
                    usage: outcome.usage,
                });
                Ok(MessageResponse { message_id, content: outcome.content, usage: outcome.usage })
            }
            Err(err) => {
                let message = if matches!(err, OrchestratorError::Aborted) { "aborted".to_string() } else { err.to_string() };
                self.events.emit(AgentEvent::Error {
                    conversation_id: conversation_key.clone(),
                    message_id: Some(message_id),
                    error: message,
                });
                Err(err)
            }
        }
    }

    async fn run_tool_loop(
        &self,
        conversation_key: &str,
        message_id: &str,
        provider_messages: &mut Vec<Message>,
        stream: bool,
        cancel: CancellationToken,
    ) -> Result<LoopOutcome, OrchestratorError> {
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            if iteration > MAX_TOOL_ITERATIONS {
                return Err(OrchestratorError::DepthExceeded(MAX_TOOL_ITERATIONS));
            }
            if cancel.is_cancelled() {
                return Err(OrchestratorError::Aborted);
            }

            let call_started = tokio::time::Instant::now();
            let completion =
                self.request_completion(conversation_key, message_id, provider_messages, stream, cancel.clone()).await?;
            let call_elapsed = call_started.elapsed();

            if let Some(usage) = completion.usage {
                self.record_usage_and_check_window(conversation_key, usage, call_elapsed).await;
            }

            if !completion.has_tool_calls() {
                let assistant_msg = Message::assistant(message_id.to_string(), completion.content.clone());
                self.append_and_emit(conversation_key, vec![assistant_msg]).await?;
                self.events.emit(AgentEvent::AssistantMessage {
                    conversation_id: conversation_key.to_string(),
                    message_id: message_id.to_string(),
                    content: completion.content.clone(),
                    usage: completion.usage,
                });
                return Ok(LoopOutcome { content: completion.content, usage: completion.usage });
            }

            self.record_tool_call_count(conversation_key, completion.tool_calls.len());

            self.events.emit(AgentEvent::AssistantMessage {
                conversation_id: conversation_key.to_string(),
                message_id: message_id.to_string(),
                content: completion.content.clone(),
                usage: completion.usage,
            });
            self.events.emit(AgentEvent::ToolCalls {
                conversation_id: conversation_key.to_string(),
                message_id: message_id.to_string(),
                tool_calls: completion.tool_calls.clone(),
                usage: completion.usage,
            });

            let (bypassed, gated) =
                partition_bypassed(&completion.tool_calls, |name| self.runtime.tools.is_bypassed(name));

            let mut bypass_ctx = ToolContext::new(conversation_key.to_string()).with_message_id(message_id.to_string());
            bypass_ctx.delegation_depth = self.delegation_depth;
            let bypass_results = if bypassed.is_empty() {
                Vec::new()
            } else {
                self.runtime
                    .tools
                    .execute_tool_calls(
                        &bypassed,
                        &bypass_ctx,
                        self.config.max_tool_concurrency,
                        self.config.strict_tool_validation,
                        cancel.clone(),
                    )
                    .await
            };
            for result in &bypass_results {
                self.events.emit(AgentEvent::ToolResult {
                    conversation_id: conversation_key.to_string(),
                    message_id: message_id.to_string(),
                    result: result.clone(),
                });
            }

            if gated.is_empty() {
                let assistant_msg = Message::assistant_with_tool_calls(
                    message_id.to_string(),
                    completion.content.clone(),
                    completion.tool_calls.clone(),
                );
                let tool_msgs: Vec<Message> = bypass_results.iter().map(Self::to_tool_message).collect();
                let mut batch = vec![assistant_msg.clone()];
                batch.extend(tool_msgs.clone());
                self.append_and_emit(conversation_key, batch).await?;
                provider_messages.push(assistant_msg);
                provider_messages.extend(tool_msgs);
                continue;
            }

            let (approved_calls, denied_ids, edit_instruction) = if !self.config.require_tool_approval {
                (gated.clone(), Vec::new(), None)
            } else {
                let approval_id = kestrel_protocol::new_id();
                let rx = self.approvals.begin(approval_id.clone());
                self.events.emit(AgentEvent::ToolApprovalRequired {
                    conversation_id: conversation_key.to_string(),
                    message_id: message_id.to_string(),
                    tool_calls: gated.clone(),
                    approval_id: approval_id.clone(),
                });
                let outcome = self.approvals.await_decision(&approval_id, rx, cancel.clone()).await?;
                match outcome {
                    ApprovalOutcome::Denied => {
                        (Vec::new(), gated.iter().map(|call| call.id.clone()).collect(), None)
                    }
                    ApprovalOutcome::Proceed { calls, edit_instruction } => {
                        let approved_ids: HashSet<&str> = calls.iter().map(|call| call.id.as_str()).collect();
                        let denied_ids = gated
                            .iter()
                            .filter(|call| !approved_ids.contains(call.id.as_str()))
                            .map(|call| call.id.clone())
                            .collect();
                        (calls, denied_ids, edit_instruction)
                    }
                }
            };

            // spec §4.2(d): "If all non-bypass tools are denied, record a
            // tool-denial turn... and return"; partial denial (some gated
            // calls approved, the rest omitted from the decision) instead
            // synthesizes a Denied result for the rest and continues the
            // loop — see DESIGN.md for why this Open Question is resolved
            // that way.
            if approved_calls.is_empty() {
                let assistant_msg = Message::assistant_with_tool_calls(
                    message_id.to_string(),
                    completion.content.clone(),
                    completion.tool_calls.clone(),
                );
                let mut tool_msgs: Vec<Message> = bypass_results.iter().map(Self::to_tool_message).collect();
                for call in &gated {
                    tool_msgs.push(Message::tool_result(
                        call.id.clone(),
                        call.name.clone(),
                        MessageContent::Text("tool call was denied".to_string()),
                        ToolMessageStatus::Error,
                        0,
                        Some(ErrorReason::Denied),
                    ));
                }
                let mut batch = vec![assistant_msg];
                batch.extend(tool_msgs);
                self.append_and_emit(conversation_key, batch).await?;
                let denial_content = MessageContent::Text("One or more tool calls were denied.".to_string());
                return Ok(LoopOutcome { content: denial_content, usage: completion.usage });
            }

            let mut approved_ctx =
                ToolContext::new(conversation_key.to_string()).with_message_id(message_id.to_string());
            approved_ctx.delegation_depth = self.delegation_depth;
            approved_ctx.edit_instruction = edit_instruction;
            let approved_results = self
                .runtime
                .tools
                .execute_tool_calls(
                    &approved_calls,
                    &approved_ctx,
                    self.config.max_tool_concurrency,
                    self.config.strict_tool_validation,
                    cancel.clone(),
                )
                .await;
            for result in &approved_results {
                self.events.emit(AgentEvent::ToolResult {
                    conversation_id: conversation_key.to_string(),
                    message_id: message_id.to_string(),
                    result: result.clone(),
                });
            }

            let denied_results: Vec<ToolExecutionResult> = gated
                .iter()
                .filter(|call| denied_ids.contains(&call.id))
                .map(|call| {
                    ToolExecutionResult::error(
                        call.id.clone(),
                        call.name.clone(),
                        "tool call was denied",
                        ErrorReason::Denied,
                        0,
                    )
                })
                .collect();

            let assistant_msg = Message::assistant_with_tool_calls(
                message_id.to_string(),
                completion.content.clone(),
                completion.tool_calls.clone(),
            );
            let mut all_results = bypass_results;
            all_results.extend(approved_results);
            all_results.extend(denied_results);
            let tool_msgs: Vec<Message> = all_results.iter().map(Self::to_tool_message).collect();

            let mut batch = vec![assistant_msg.clone()];
            batch.extend(tool_msgs.clone());
            self.append_and_emit(conversation_key, batch).await?;

            provider_messages.push(assistant_msg);
            provider_messages.extend(tool_msgs);
        }
    }

    fn to_tool_message(result: &ToolExecutionResult) -> Message {
        Message::tool_result(
            result.id.clone(),
            result.name.clone(),
            MessageContent::Text(result.result_as_text()),
            result.status,
            result.duration_ms,
            result.error_reason(),
        )
    }

    async fn append_and_emit(&self, conversation_key: &str, messages: Vec<Message>) -> Result<(), OrchestratorError> {
        self.memory
            .append(conversation_key, messages.clone())
            .await
            .map_err(|err| OrchestratorError::Memory(err.to_string()))?;
        self.events
            .emit(AgentEvent::MemoryAppended { conversation_id: conversation_key.to_string(), delta: messages });
        Ok(())
    }

    fn build_tool_definitions(&self) -> Vec<ToolDefinition> {
        self.runtime
            .tools
            .get_tool_definitions(&self.config.enabled_tools)
            .into_iter()
            .map(|spec| ToolDefinition {
                name: spec.name,
                description: spec.description,
                parameters_schema: spec.parameters_schema,
            })
            .collect()
    }

    async fn request_completion(
        &self,
        conversation_key: &str,
        message_id: &str,
        provider_messages: &[Message],
        stream: bool,
        cancel: CancellationToken,
    ) -> Result<CompletionResult, OrchestratorError> {
        let params = CompletionParams {
            model: self.config.model.clone(),
            messages: provider_messages.to_vec(),
            tools: self.build_tool_definitions(),
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            max_tokens: self.config.max_tokens,
            reasoning_effort: self.config.reasoning_effort,
        };

        if stream && self.runtime.model.supports_streaming() {
            self.request_streaming_completion(conversation_key, message_id, &params, cancel).await
        } else {
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(OrchestratorError::Aborted),
                result = self.runtime.model.generate_completion(&params, cancel.clone()) => {
                    result.map_err(OrchestratorError::from)
                }
            }
        }
    }

    /// Streaming path (spec §4.2 step 6a, §4.6, §9 design notes): the
    /// backend hands back a finite lazy sequence of `StreamEvent`s; this
    /// iterates it, emitting downstream events synchronously and merging
    /// tool-call fragments through `ToolCallAccumulator` as they arrive.
    async fn request_streaming_completion(
        &self,
        conversation_key: &str,
        message_id: &str,
        params: &CompletionParams,
        cancel: CancellationToken,
    ) -> Result<CompletionResult, OrchestratorError> {
        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(OrchestratorError::Aborted),
            result = self.runtime.model.stream_completion(params, cancel.clone()) => result.map_err(OrchestratorError::from)?,
        };

        let mut text = String::new();
        let mut accumulator = ToolCallAccumulator::new();
        let mut finish_reason = None;
        let mut usage = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(OrchestratorError::Aborted),
                next = stream.next() => {
                    match next {
                        Some(StreamEvent::TextDelta(delta)) => {
                            text.push_str(&delta);
                            self.events.emit(AgentEvent::AssistantChunk {
                                conversation_id: conversation_key.to_string(),
                                message_id: message_id.to_string(),
                                delta,
                                usage: None,
                            });
                        }
                        Some(StreamEvent::ReasoningDelta(delta)) => {
                            self.events.emit(AgentEvent::ReasoningChunk {
                                conversation_id: conversation_key.to_string(),
                                message_id: message_id.to_string(),
                                delta,
                            });
                        }
                        Some(StreamEvent::ToolCallDelta(fragment)) => {
                            accumulator.merge(fragment);
                        }
                        Some(StreamEvent::Finish { finish_reason: fr, usage: u }) => {
                            finish_reason = fr.clone();
                            usage = u;
                            self.events.emit(AgentEvent::StreamFinish {
                                conversation_id: conversation_key.to_string(),
                                message_id: message_id.to_string(),
                                finish_reason: fr,
                                usage: u,
                            });
                        }
                        None => break,
                    }
                }
            }
        }

        Ok(CompletionResult { content: MessageContent::Text(text), tool_calls: accumulator.finish(), usage, finish_reason })
    }

    fn record_tool_call_count(&self, conversation_key: &str, count: usize) {
        if count == 0 {
            return;
        }
        let mut metrics = self.metrics.entry(conversation_key.to_string()).or_insert_with(SessionMetrics::new);
        metrics.record_tool_calls(count as u64);
    }

    /// Spec §4.7: records usage against the session counters, then
    /// evaluates the context-window threshold and either logs a warning
    /// or triggers auto-summarization.
    async fn record_usage_and_check_window(&self, conversation_key: &str, usage: Usage, request_time: Duration) {
        let cost = self.runtime.pricing.estimate(usage);
        self.memory.record_usage(conversation_key, usage.prompt_tokens, usage.completion_tokens, cost).await;

        let context_window = self.runtime.limits.context_window(&self.runtime.provider, &self.config.model);
        let status = {
            let mut metrics = self.metrics.entry(conversation_key.to_string()).or_insert_with(SessionMetrics::new);
            metrics.record_usage(usage, cost, request_time);
            metrics.check_context_window_usage(context_window)
        };

        match status {
            ContextWindowStatus::Ok => {}
            ContextWindowStatus::Warning { usage_fraction } => {
                warn!(
                    conversation_id = conversation_key,
                    usage_fraction, "context window usage is approaching its limit; consider /summary"
                );
            }
            ContextWindowStatus::AutoSummaryNeeded { usage_fraction } => {
                info!(
                    conversation_id = conversation_key,
                    usage_fraction, "context window nearly exhausted, auto-summarizing conversation history"
                );
                self.trigger_auto_summary(conversation_key).await;
            }
        }
    }

    /// History-replacement auto-summary (spec §4.7 Open Question,
    /// resolved in DESIGN.md): replaces the conversation's stored history
    /// with a single synthesized user message, then resets the session's
    /// counters.
    async fn trigger_auto_summary(&self, conversation_key: &str) {
        let Some(summarizer) = self.runtime.summarizer.as_ref() else {
            warn!(conversation_id = conversation_key, "auto-summary threshold reached but no summarizer is configured, skipping");
            return;
        };

        let history = self.memory.get(conversation_key).await;
        match summarizer.summarize(&history).await {
            Ok(summary) => {
                let summary_msg = Message::user(summary);
                if let Err(err) = self
                    .memory
                    .replace_with_summary(conversation_key, vec![summary_msg.clone()], Some(conversation_key.to_string()))
                    .await
                {
                    warn!(conversation_id = conversation_key, error = %err, "failed to persist auto-summary");
                    return;
                }
                self.events.emit(AgentEvent::MemoryAppended {
                    conversation_id: conversation_key.to_string(),
                    delta: vec![summary_msg],
                });
                if let Some(mut metrics) = self.metrics.get_mut(conversation_key) {
                    metrics.reset();
                }
                self.memory.reset_usage(conversation_key).await;
            }
            Err(err) => {
                warn!(conversation_id = conversation_key, error = %err, "auto-summary generation failed");
            }
        }
    }
}
