//! Capability backed by an async closure.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolOutcome};

type AsyncToolFunction =
    Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync>;

/// A tool that wraps a plain async function.
///
/// Errors returned by the function become [`ToolOutcome::Failure`].
pub struct FunctionTool {
    name: String,
    description: String,
    parameters_schema: Value,
    function: AsyncToolFunction,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, function: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema: json!({ "type": "object", "properties": {} }),
            function: Box::new(move |args| -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> {
                Box::pin(function(args))
            }),
        }
    }

    /// Set the JSON schema for the function parameters.
    pub fn with_parameters_schema(mut self, schema: Value) -> Self {
        self.parameters_schema = schema;
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters_schema.clone()
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        ToolOutcome::from_result((self.function)(args).await)
    }
}
