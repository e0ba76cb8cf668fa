//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{ChatRequest, ChatResponse, TokenUsage, ToolCall};
use super::LlmClient;

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("handoff-router/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let body = request_body(&request);

        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Chat completion request failed: {}", e))?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Chat completion returned HTTP {}: {}",
                status,
                truncate(&text, 500)
            ));
        }

        let parsed: CompletionResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow::anyhow!(
                "Malformed chat completion response: {}\nRaw: {}",
                e,
                truncate(&text, 500)
            )
        })?;

        into_chat_response(parsed)
    }
}

fn request_body(request: &ChatRequest<'_>) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
    });

    // parallel_tool_calls and tool_choice are rejected when no tools are sent.
    if !request.tools.is_empty() {
        body["tools"] = json!(request.tools);
        body["parallel_tool_calls"] = json!(request.parallel_tool_calls);
        if let Some(choice) = request.tool_choice {
            body["tool_choice"] = json!(choice);
        }
    }

    body
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

fn into_chat_response(parsed: CompletionResponse) -> anyhow::Result<ChatResponse> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Chat completion returned no choices"))?;

    Ok(ChatResponse {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls,
        usage: parsed.usage,
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}... [truncated]", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatMessage, ToolDefinition};

    #[test]
    fn body_omits_tool_fields_without_tools() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            tools: &[],
            tool_choice: Some("auto"),
            parallel_tool_calls: true,
        };

        let body = request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        assert!(body.get("tools").is_none());
        assert!(body.get("parallel_tool_calls").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn body_carries_tools_and_choice() {
        let messages = vec![ChatMessage::user("hi")];
        let tools = vec![ToolDefinition::function(
            "search_web",
            "Search the web",
            json!({"type": "object", "properties": {}}),
        )];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: &tools,
            tool_choice: Some("required"),
            parallel_tool_calls: false,
        };

        let body = request_body(&request);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "search_web");
        assert_eq!(body["parallel_tool_calls"], false);
        assert_eq!(body["tool_choice"], "required");
    }

    #[test]
    fn parses_tool_call_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "transfer_to_web_search_agent", "arguments": "{}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;

        let parsed: CompletionResponse = serde_json::from_str(raw).expect("parse");
        let response = into_chat_response(parsed).expect("response");
        assert!(response.content.is_none());
        assert_eq!(response.requested_calls().len(), 1);
        assert_eq!(
            response.requested_calls()[0].function.name,
            "transfer_to_web_search_agent"
        );
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).expect("parse");
        assert!(into_chat_response(parsed).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "宮崎グルメ宮崎グルメ";
        assert_eq!(truncate(s, 5), "宮崎グルメ... [truncated]");
        assert_eq!(truncate("short", 10), "short");
    }
}
