//! Deterministic backend for router tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{ChatMessage, ChatRequest, ChatResponse, ToolCall};
use super::LlmClient;

/// What the scripted backend saw on one call.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub tool_names: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

type Responder = dyn Fn(&ChatRequest<'_>, usize) -> anyhow::Result<ChatResponse> + Send + Sync;

/// Backend whose replies are computed by a closure from the request and the
/// zero-based call index.
pub(crate) struct ScriptedLlm {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlm {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest<'_>, usize) -> anyhow::Result<ChatResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order from a fixed list; calls past the end fail.
    pub fn sequence(responses: Vec<ChatResponse>) -> Self {
        Self::new(move |_, index| {
            responses
                .get(index)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("script exhausted at call {}", index))
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let index = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(RecordedRequest {
                model: request.model.to_string(),
                system_prompt: request.system_prompt().map(str::to_string),
                tool_names: request.tool_names().into_iter().map(str::to_string).collect(),
                messages: request.messages.to_vec(),
            });
            requests.len() - 1
        };
        (self.responder)(&request, index)
    }
}

/// Shorthand for a single tool call with JSON arguments.
pub(crate) fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, arguments.to_string())
}
