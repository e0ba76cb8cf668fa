//! Capability functions: operations that perform an external action.
//!
//! A capability never fails across the router boundary. [`Tool::execute`]
//! returns a [`ToolOutcome`], and implementations fold their internal errors
//! into [`ToolOutcome::Failure`] so the backend can read what went wrong and
//! decide whether to retry, apologise or hand off.

mod function;
mod video;
mod web;

pub use function::FunctionTool;
pub use video::{VideoResult, VideoSearch};
pub use web::{WebResult, WebSearch};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

/// A callable capability exposed to the backend.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name presented to the backend.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> ToolOutcome;
}

/// Result of a capability call, success or a description of the failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: Value },
    Failure { message: String },
}

impl ToolOutcome {
    pub fn success(value: Value) -> Self {
        Self::Success { value }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Fold a fallible tool body into an outcome.
    pub fn from_result(result: anyhow::Result<Value>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => Self::failure(format!("{:#}", e)),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Text placed in the tool-result message.
    pub fn to_content(&self) -> String {
        match self {
            Self::Success {
                value: Value::String(s),
            } => s.clone(),
            Self::Success { value } => value.to_string(),
            Self::Failure { message } => json!({ "error": message }).to_string(),
        }
    }
}

/// Pull a required, non-blank string argument.
pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    args[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' argument", key))
}

/// Basic HTML entity decoding.
pub(crate) fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_content_is_json_error() {
        let outcome = ToolOutcome::from_result(Err(anyhow::anyhow!("quota exceeded")));
        assert!(outcome.is_failure());
        assert_eq!(outcome.to_content(), r#"{"error":"quota exceeded"}"#);
    }

    #[test]
    fn string_success_is_passed_through() {
        let outcome = ToolOutcome::success(Value::String("plain".to_string()));
        assert_eq!(outcome.to_content(), "plain");
    }

    #[test]
    fn structured_success_is_serialized() {
        let outcome = ToolOutcome::success(json!([{"title": "a"}]));
        assert_eq!(outcome.to_content(), r#"[{"title":"a"}]"#);
    }

    #[test]
    fn required_str_rejects_blank_and_missing() {
        let args = json!({"keyword": "  ", "query": "ramen"});
        assert!(required_str(&args, "keyword").is_err());
        assert!(required_str(&args, "missing").is_err());
        assert_eq!(required_str(&args, "query").expect("query"), "ramen");
        assert!(required_str(&Value::Null, "query").is_err());
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(html_decode("Fish &amp; Chips &#x27;22"), "Fish & Chips '22");
    }
}
