//! Router: drives a conversation between the agents of an [`AgentSet`].
//!
//! The router follows the "tools in a loop" pattern with one addition: the
//! agent whose instructions and operations are sent to the backend can
//! change mid-run.
//! 1. Send the transcript, the active agent's instructions and exactly its
//!    operation schemas to the backend
//! 2. Plain text ends the run
//! 3. Otherwise validate every requested operation against the agent that
//!    was active when the request was made, then execute them in order
//! 4. Capability results are appended as tool results; a transfer switches
//!    the active agent and appends a handoff record
//! 5. Repeat until text, the turn limit, or cancellation

mod events;

pub use events::{NoopObserver, RouterEvent, RouterObserver, TracingObserver};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent::{Agent, AgentSet, Operation};
use crate::config::DEFAULT_MAX_TURNS;
use crate::llm::{ChatRequest, LlmClient, TokenUsage, ToolCall};
use crate::session::{Message, Session};
use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Agent {agent} requested unknown operation {operation}")]
    UnknownOperation { agent: String, operation: String },

    #[error("Backend request failed for agent {agent}")]
    Backend {
        agent: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Backend returned an empty response for agent {agent}")]
    EmptyResponse { agent: String },
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The backend answered with plain text.
    Completed,
    /// The turn limit was hit while the backend kept requesting operations.
    MaxTurnsReached,
    /// The caller cancelled the run between two steps.
    Cancelled,
    /// Operations were requested but `execute_tools` was off.
    ToolsNotExecuted,
}

/// Per-run overrides.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Model used for every backend query instead of the agents' own.
    pub model_override: Option<String>,
    /// Turn limit for this run instead of the router's.
    pub max_turns: Option<usize>,
    /// When false, the run stops at the first operation request and reports
    /// the requested calls in [`RunResult::pending_calls`].
    pub execute_tools: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            model_override: None,
            max_turns: None,
            execute_tools: true,
        }
    }
}

/// Outcome of a run, owned by the caller.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Full log: the initial messages followed by everything the run added.
    pub messages: Vec<Message>,
    /// Agent active when the run ended.
    pub active_agent: Arc<Agent>,
    pub termination: Termination,
    /// Backend queries issued.
    pub turns: usize,
    /// Calls left unexecuted when `execute_tools` was off.
    pub pending_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    /// Final answer of a completed run.
    pub fn final_text(&self) -> Option<&str> {
        if self.termination != Termination::Completed {
            return None;
        }
        self.messages.last().and_then(Message::text)
    }

    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }
}

/// Routes conversations through a sealed agent set.
///
/// A router holds no per-run state, so one instance can serve concurrent
/// runs; each run owns its session and active-agent pointer.
pub struct Router {
    llm: Arc<dyn LlmClient>,
    agents: Arc<AgentSet>,
    observer: Arc<dyn RouterObserver>,
    max_turns: usize,
}

impl Router {
    pub fn new(llm: Arc<dyn LlmClient>, agents: Arc<AgentSet>) -> Self {
        Self {
            llm,
            agents,
            observer: Arc::new(TracingObserver),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RouterObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn agents(&self) -> &Arc<AgentSet> {
        &self.agents
    }

    /// Run a conversation starting at the agent named `starting_agent`.
    pub async fn run(
        &self,
        starting_agent: &str,
        messages: Vec<Message>,
    ) -> Result<RunResult, RouterError> {
        self.run_with(
            starting_agent,
            messages,
            RunOptions::default(),
            CancellationToken::new(),
        )
        .await
    }

    /// Run with per-run options. `cancel` is honoured between steps only.
    pub async fn run_with(
        &self,
        starting_agent: &str,
        messages: Vec<Message>,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<RunResult, RouterError> {
        let started_at = Utc::now();
        let mut active = self
            .agents
            .by_name(starting_agent)
            .cloned()
            .ok_or_else(|| RouterError::UnknownAgent(starting_agent.to_string()))?;

        let max_turns = options.max_turns.unwrap_or(self.max_turns);
        let mut session = Session::new(messages);
        let mut usage: Option<TokenUsage> = None;
        let mut pending_calls = Vec::new();
        let mut turns = 0;

        let termination = loop {
            if cancel.is_cancelled() {
                break Termination::Cancelled;
            }
            if turns >= max_turns {
                break Termination::MaxTurnsReached;
            }
            turns += 1;

            self.observer.on_event(&RouterEvent::TurnStarted {
                turn: turns,
                agent: active.name().to_string(),
            });

            let transcript = session.transcript(active.instructions());
            let tools = active.tool_definitions();
            let request = ChatRequest {
                model: options.model_override.as_deref().unwrap_or(active.model()),
                messages: &transcript,
                tools: &tools,
                tool_choice: active.tool_choice(),
                parallel_tool_calls: active.parallel_tool_calls(),
            };

            let response = self
                .llm
                .chat_completion(request)
                .await
                .map_err(|source| RouterError::Backend {
                    agent: active.name().to_string(),
                    source,
                })?;

            if let Some(u) = &response.usage {
                usage = Some(match &usage {
                    Some(acc) => acc.add(u),
                    None => *u,
                });
            }

            let calls = response.requested_calls().to_vec();
            self.observer.on_event(&RouterEvent::BackendResponded {
                turn: turns,
                agent: active.name().to_string(),
                requested: calls.iter().map(|c| c.function.name.clone()).collect(),
                has_text: response.content.is_some(),
            });

            let text = response.content.filter(|t| !t.trim().is_empty());

            if calls.is_empty() {
                let content = text.ok_or_else(|| RouterError::EmptyResponse {
                    agent: active.name().to_string(),
                })?;
                session.push(Message::agent(active.name(), content));
                break Termination::Completed;
            }

            if !options.execute_tools {
                if let Some(content) = text {
                    session.push(Message::agent(active.name(), content));
                }
                pending_calls = calls;
                break Termination::ToolsNotExecuted;
            }

            let planned = plan_step(&active, calls)?;
            let (staged, next_active) = self.execute_step(&active, planned, text).await?;

            // The step is committed as a whole.
            session.extend(staged);
            active = next_active;
        };

        self.observer.on_event(&RouterEvent::Terminated {
            agent: active.name().to_string(),
            termination,
            turns,
        });

        Ok(RunResult {
            messages: session.into_messages(),
            active_agent: active,
            termination,
            turns,
            pending_calls,
            usage,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Execute validated operations in request order and stage their messages.
    async fn execute_step(
        &self,
        requester: &Arc<Agent>,
        planned: Vec<(ToolCall, Operation)>,
        text: Option<String>,
    ) -> Result<(Vec<Message>, Arc<Agent>), RouterError> {
        let turn = Uuid::new_v4();
        let mut staged = Vec::with_capacity(planned.len() + 1);
        let mut active = Arc::clone(requester);

        if let Some(content) = text {
            staged.push(Message::Agent {
                sender: requester.name().to_string(),
                content,
                turn: Some(turn),
            });
        }

        for (call, operation) in planned {
            let args = call.parsed_arguments();

            match operation {
                Operation::Capability(tool) => {
                    let outcome = match args {
                        Ok(args) => {
                            self.observer.on_event(&RouterEvent::CapabilityCalled {
                                agent: requester.name().to_string(),
                                operation: call.function.name.clone(),
                                args: args.clone(),
                            });
                            invoke_capability(tool.as_ref(), args).await
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Malformed arguments for {}: {}",
                                call.function.name,
                                e
                            );
                            ToolOutcome::failure(format!(
                                "Invalid JSON arguments for {}: {} (received: {})",
                                call.function.name, e, call.function.arguments
                            ))
                        }
                    };

                    self.observer.on_event(&RouterEvent::CapabilityFinished {
                        agent: requester.name().to_string(),
                        operation: call.function.name.clone(),
                        failed: outcome.is_failure(),
                    });

                    staged.push(Message::ToolResult {
                        sender: requester.name().to_string(),
                        turn,
                        content: outcome.to_content(),
                        is_error: outcome.is_failure(),
                        handoff: None,
                        call,
                    });
                }
                Operation::Transfer(transfer) => {
                    let target = self
                        .agents
                        .get(transfer.target())
                        .cloned()
                        .ok_or_else(|| RouterError::UnknownAgent(transfer.target_name().to_string()))?;

                    self.observer.on_event(&RouterEvent::Handoff {
                        from: active.name().to_string(),
                        to: target.name().to_string(),
                        operation: transfer.name().to_string(),
                        reason: args
                            .ok()
                            .and_then(|a| a["reason"].as_str().map(str::to_string)),
                    });

                    staged.push(Message::ToolResult {
                        sender: requester.name().to_string(),
                        turn,
                        content: json!({ "assistant": target.name() }).to_string(),
                        is_error: false,
                        handoff: Some(target.name().to_string()),
                        call,
                    });
                    active = target;
                }
            }
        }

        Ok((staged, active))
    }
}

/// Resolve every requested call against `agent` before anything runs.
fn plan_step(
    agent: &Agent,
    calls: Vec<ToolCall>,
) -> Result<Vec<(ToolCall, Operation)>, RouterError> {
    calls
        .into_iter()
        .map(|call| {
            let operation = agent
                .operation(&call.function.name)
                .cloned()
                .ok_or_else(|| RouterError::UnknownOperation {
                    agent: agent.name().to_string(),
                    operation: call.function.name.clone(),
                })?;
            Ok((call, operation))
        })
        .collect()
}

/// Run a capability, turning a panic into a failure value.
async fn invoke_capability(tool: &dyn Tool, args: Value) -> ToolOutcome {
    match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!("Operation {} panicked: {}", tool.name(), message);
            ToolOutcome::failure(format!("Operation {} panicked: {}", tool.name(), message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
