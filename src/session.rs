//! Conversation session: the ordered, append-only message log of one run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::{ChatMessage, ToolCall};

/// One entry of the conversation log.
///
/// A backend request to invoke an operation is stored inside the
/// `ToolResult` entry it produced (`call`), so every executed operation adds
/// exactly one entry. [`Session::transcript`] unfolds it again for the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        content: String,
    },
    Agent {
        sender: String,
        content: String,
        /// Set when the text accompanied operation requests of that turn.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        turn: Option<Uuid>,
    },
    ToolResult {
        sender: String,
        turn: Uuid,
        call: ToolCall,
        content: String,
        #[serde(default)]
        is_error: bool,
        /// Target agent name when the operation was a transfer.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handoff: Option<String>,
    },
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn agent(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Agent {
            sender: sender.into(),
            content: content.into(),
            turn: None,
        }
    }

    /// Text of user and agent messages.
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::User { content } | Message::Agent { content, .. } => Some(content.as_str()),
            Message::ToolResult { .. } => None,
        }
    }

    /// Agent that produced the message, if any.
    pub fn sender(&self) -> Option<&str> {
        match self {
            Message::User { .. } => None,
            Message::Agent { sender, .. } | Message::ToolResult { sender, .. } => {
                Some(sender.as_str())
            }
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Message::ToolResult { .. })
    }
}

/// Append-only message log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new(initial: Vec<Message>) -> Self {
        Self { messages: initial }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Text of the most recent agent message.
    pub fn last_agent_text(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Agent { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Chat transcript for the backend: `instructions` as system prompt, then
    /// the log with each turn's tool results regrouped under one assistant
    /// `tool_calls` message.
    pub fn transcript(&self, instructions: &str) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(ChatMessage::system(instructions));

        let mut i = 0;
        while i < self.messages.len() {
            match &self.messages[i] {
                Message::User { content } => {
                    out.push(ChatMessage::user(content.clone()));
                    i += 1;
                }
                Message::Agent { content, turn, .. } => {
                    i += 1;
                    let group = turn.map(|t| self.tool_group(i, t));
                    match group {
                        Some((calls, results, next)) if !calls.is_empty() => {
                            out.push(ChatMessage::assistant(Some(content.clone()), Some(calls)));
                            out.extend(results);
                            i = next;
                        }
                        _ => out.push(ChatMessage::assistant(Some(content.clone()), None)),
                    }
                }
                Message::ToolResult { turn, .. } => {
                    let (calls, results, next) = self.tool_group(i, *turn);
                    out.push(ChatMessage::assistant(None, Some(calls)));
                    out.extend(results);
                    i = next;
                }
            }
        }

        out
    }

    /// Consecutive tool results of `turn` starting at `start`.
    fn tool_group(&self, start: usize, turn: Uuid) -> (Vec<ToolCall>, Vec<ChatMessage>, usize) {
        let mut calls = Vec::new();
        let mut results = Vec::new();
        let mut next = start;

        while let Some(Message::ToolResult {
            turn: t,
            call,
            content,
            ..
        }) = self.messages.get(next)
        {
            if *t != turn {
                break;
            }
            calls.push(call.clone());
            results.push(ChatMessage::tool(call.id.clone(), content.clone()));
            next += 1;
        }

        (calls, results, next)
    }
}
