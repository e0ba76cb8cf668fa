//! Sealed agent definitions and their operations.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::llm::ToolDefinition;
use crate::tools::Tool;

/// Position of an agent inside its [`AgentSet`](super::AgentSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named role: backend model, instructions and a fixed operation set.
///
/// Agents only exist inside a built [`AgentSet`](super::AgentSet), so their
/// operation set can no longer change once a run can see them.
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) name: String,
    pub(crate) model: String,
    pub(crate) instructions: String,
    pub(crate) operations: IndexMap<String, Operation>,
    pub(crate) tool_choice: Option<String>,
    pub(crate) parallel_tool_calls: bool,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn tool_choice(&self) -> Option<&str> {
        self.tool_choice.as_deref()
    }

    pub fn parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls
    }

    /// Operations in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Transfers this agent can perform, in declaration order.
    pub fn transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.operations.values().filter_map(|op| match op {
            Operation::Transfer(transfer) => Some(transfer),
            Operation::Capability(_) => None,
        })
    }

    /// Schemas for exactly this agent's operations.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.operations.values().map(Operation::definition).collect()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("model", &self.model)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Something the backend may invoke by name on the active agent.
#[derive(Clone)]
pub enum Operation {
    Capability(Arc<dyn Tool>),
    Transfer(Transfer),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Capability(tool) => tool.name(),
            Operation::Transfer(transfer) => &transfer.name,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            Operation::Capability(tool) => ToolDefinition::function(
                tool.name(),
                tool.description(),
                tool.parameters_schema(),
            ),
            Operation::Transfer(transfer) => transfer.definition(),
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Capability(tool) => f.debug_tuple("Capability").field(&tool.name()).finish(),
            Operation::Transfer(transfer) => f.debug_tuple("Transfer").field(transfer).finish(),
        }
    }
}

/// Handoff to a statically known agent.
///
/// Takes no input apart from an optional `reason`, which is only reported to
/// the observer. Resolution happened when the set was built, so invoking a
/// transfer cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) target: AgentId,
    pub(crate) target_name: String,
}

impl Transfer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn target(&self) -> AgentId {
        self.target
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            self.name.clone(),
            self.description.clone(),
            json!({
                "type": "object",
                "properties": {
                    "reason": {
                        "type": "string",
                        "description": "Optional note on why the conversation is handed off"
                    }
                }
            }),
        )
    }
}
