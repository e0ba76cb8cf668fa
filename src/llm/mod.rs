//! Backend inference interface.
//!
//! The router only sees the [`LlmClient`] trait: it hands over the active
//! agent's transcript and tool schemas and gets back either text or a list of
//! tool calls. [`OpenAiClient`] speaks the OpenAI-compatible
//! `/chat/completions` protocol.

mod openai;
#[cfg(test)]
pub(crate) mod scripted;
mod types;

pub use openai::OpenAiClient;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, FunctionCall, FunctionDefinition, Role, TokenUsage,
    ToolCall, ToolDefinition,
};

use async_trait::async_trait;

/// A chat-completions backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion over the given transcript.
    ///
    /// Errors are backend failures (network, quota, malformed payload) and
    /// abort the run that issued the request.
    async fn chat_completion(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse>;
}
