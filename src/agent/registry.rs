//! Agent declaration and the wiring pass that seals an [`AgentSet`].
//!
//! Agents reference their transfer targets by name, so an agent may point at
//! one declared after it. [`AgentSetBuilder::build`] resolves every name to an
//! [`AgentId`] and hands back a read-only set that concurrent runs can share.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use super::definition::{Agent, AgentId, Operation, Transfer};
use crate::tools::Tool;

/// Function names accepted by chat-completions backends.
const MAX_OPERATION_NAME_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentConfigError {
    #[error("Agent name must not be empty")]
    EmptyName,

    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),

    #[error("Agent {0} has no model configured")]
    MissingModel(String),

    #[error("Agent {agent} declares operation {operation} more than once")]
    DuplicateOperation { agent: String, operation: String },

    #[error("Agent {agent} has invalid operation name {operation:?}")]
    InvalidOperationName { agent: String, operation: String },

    #[error("Transfer {operation} on agent {agent} targets unknown agent {target}")]
    UnknownTransferTarget {
        agent: String,
        operation: String,
        target: String,
    },

    #[error("Agent set is empty")]
    EmptySet,

    #[error("No agent named {0} has been declared")]
    UnknownAgent(String),
}

enum PendingOperation {
    Capability(Arc<dyn Tool>),
    Transfer {
        name: String,
        target: String,
        description: Option<String>,
    },
}

impl PendingOperation {
    fn name(&self) -> &str {
        match self {
            PendingOperation::Capability(tool) => tool.name(),
            PendingOperation::Transfer { name, .. } => name,
        }
    }
}

/// Declaration of one agent, before wiring.
pub struct AgentSpec {
    name: String,
    model: String,
    instructions: String,
    operations: Vec<PendingOperation>,
    tool_choice: Option<String>,
    parallel_tool_calls: bool,
}

impl AgentSpec {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            operations: Vec::new(),
            tool_choice: None,
            parallel_tool_calls: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.add_tool(tool);
        self
    }

    /// Add a transfer named `operation` that hands off to the agent called `target`.
    pub fn with_transfer(mut self, operation: impl Into<String>, target: impl Into<String>) -> Self {
        self.add_transfer(operation, target, None);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: impl Into<String>) -> Self {
        self.tool_choice = Some(tool_choice.into());
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.operations.push(PendingOperation::Capability(tool));
    }

    pub fn add_transfer(
        &mut self,
        operation: impl Into<String>,
        target: impl Into<String>,
        description: Option<String>,
    ) {
        self.operations.push(PendingOperation::Transfer {
            name: operation.into(),
            target: target.into(),
            description,
        });
    }
}

/// Collects agent declarations and seals them into an [`AgentSet`].
#[derive(Default)]
pub struct AgentSetBuilder {
    specs: Vec<AgentSpec>,
}

impl AgentSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable form of [`add`](Self::add); name problems surface in `build`.
    pub fn agent(mut self, spec: AgentSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Add an agent, rejecting empty or already-declared names right away.
    pub fn add(&mut self, spec: AgentSpec) -> Result<(), AgentConfigError> {
        check_agent_name(&spec.name)?;
        if self.specs.iter().any(|s| s.name == spec.name) {
            return Err(AgentConfigError::DuplicateAgent(spec.name));
        }
        self.specs.push(spec);
        Ok(())
    }

    /// Declared agent, for extending its operations before sealing.
    pub fn spec_mut(&mut self, name: &str) -> Option<&mut AgentSpec> {
        self.specs.iter_mut().find(|s| s.name == name)
    }

    /// Resolve transfer targets and seal the set.
    pub fn build(self) -> Result<Arc<AgentSet>, AgentConfigError> {
        if self.specs.is_empty() {
            return Err(AgentConfigError::EmptySet);
        }

        let mut by_name = HashMap::with_capacity(self.specs.len());
        for (index, spec) in self.specs.iter().enumerate() {
            check_agent_name(&spec.name)?;
            if spec.model.trim().is_empty() {
                return Err(AgentConfigError::MissingModel(spec.name.clone()));
            }
            if by_name.insert(spec.name.clone(), AgentId(index)).is_some() {
                return Err(AgentConfigError::DuplicateAgent(spec.name.clone()));
            }
        }

        let mut agents = Vec::with_capacity(self.specs.len());
        for (index, spec) in self.specs.into_iter().enumerate() {
            let operations = wire_operations(&spec.name, spec.operations, &by_name)?;
            agents.push(Arc::new(Agent {
                id: AgentId(index),
                name: spec.name,
                model: spec.model,
                instructions: spec.instructions,
                operations,
                tool_choice: spec.tool_choice,
                parallel_tool_calls: spec.parallel_tool_calls,
            }));
        }

        tracing::debug!(
            agents = agents.len(),
            "Agent set wired: {}",
            agents
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Arc::new(AgentSet { agents, by_name }))
    }
}

fn check_agent_name(name: &str) -> Result<(), AgentConfigError> {
    if name.trim().is_empty() {
        Err(AgentConfigError::EmptyName)
    } else {
        Ok(())
    }
}

fn is_valid_operation_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_OPERATION_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn wire_operations(
    agent: &str,
    pending: Vec<PendingOperation>,
    by_name: &HashMap<String, AgentId>,
) -> Result<IndexMap<String, Operation>, AgentConfigError> {
    let mut seen = HashSet::new();
    let mut operations = IndexMap::with_capacity(pending.len());

    for op in pending {
        let name = op.name().to_string();
        if !is_valid_operation_name(&name) {
            return Err(AgentConfigError::InvalidOperationName {
                agent: agent.to_string(),
                operation: name,
            });
        }
        if !seen.insert(name.clone()) {
            return Err(AgentConfigError::DuplicateOperation {
                agent: agent.to_string(),
                operation: name,
            });
        }

        let resolved = match op {
            PendingOperation::Capability(tool) => Operation::Capability(tool),
            PendingOperation::Transfer {
                name,
                target,
                description,
            } => {
                let target_id = *by_name.get(&target).ok_or_else(|| {
                    AgentConfigError::UnknownTransferTarget {
                        agent: agent.to_string(),
                        operation: name.clone(),
                        target: target.clone(),
                    }
                })?;
                Operation::Transfer(Transfer {
                    description: description
                        .unwrap_or_else(|| format!("Hand the conversation over to {}.", target)),
                    name,
                    target: target_id,
                    target_name: target,
                })
            }
        };
        operations.insert(name, resolved);
    }

    Ok(operations)
}

/// Immutable, wired set of agents shared by every run of a router.
#[derive(Debug)]
pub struct AgentSet {
    agents: Vec<Arc<Agent>>,
    by_name: HashMap<String, AgentId>,
}

impl AgentSet {
    pub fn builder() -> AgentSetBuilder {
        AgentSetBuilder::new()
    }

    pub fn get(&self, id: AgentId) -> Option<&Arc<Agent>> {
        self.agents.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Agent>> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Agents in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FunctionTool;
    use serde_json::{json, Value};

    fn tool(name: &str) -> Arc<dyn Tool> {
        Arc::new(FunctionTool::new(name, "test tool", |_| async {
            Ok::<Value, anyhow::Error>(json!("ok"))
        }))
    }

    #[test]
    fn resolves_forward_references() {
        let set = AgentSet::builder()
            .agent(AgentSpec::new("Triage", "m", "route").with_transfer("to_web", "WebSearch"))
            .agent(
                AgentSpec::new("WebSearch", "m", "search")
                    .with_tool(tool("search_web"))
                    .with_transfer("back_to_triage", "Triage"),
            )
            .build()
            .expect("build");

        let triage = set.by_name("Triage").expect("triage");
        let web = set.by_name("WebSearch").expect("web");

        let transfer = triage.transfers().next().expect("transfer");
        assert_eq!(transfer.target(), web.id());
        assert_eq!(transfer.target_name(), "WebSearch");
        assert_eq!(
            web.operations().map(Operation::name).collect::<Vec<_>>(),
            vec!["search_web", "back_to_triage"]
        );
    }

    #[test]
    fn tool_definitions_follow_declaration_order() {
        let set = AgentSet::builder()
            .agent(
                AgentSpec::new("A", "m", "")
                    .with_transfer("to_b", "B")
                    .with_tool(tool("zeta"))
                    .with_tool(tool("alpha")),
            )
            .agent(AgentSpec::new("B", "m", ""))
            .build()
            .expect("build");

        let names: Vec<String> = set
            .by_name("A")
            .expect("a")
            .tool_definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["to_b", "zeta", "alpha"]);
        assert!(set.by_name("B").expect("b").tool_definitions().is_empty());
    }

    #[test]
    fn rejects_dangling_transfer() {
        let err = AgentSet::builder()
            .agent(AgentSpec::new("Triage", "m", "").with_transfer("to_video", "VideoSearch"))
            .build()
            .expect_err("dangling");
        assert_eq!(
            err,
            AgentConfigError::UnknownTransferTarget {
                agent: "Triage".to_string(),
                operation: "to_video".to_string(),
                target: "VideoSearch".to_string(),
            }
        );
    }

    #[test]
    fn rejects_duplicate_and_empty_names() {
        let err = AgentSet::builder()
            .agent(AgentSpec::new("A", "m", ""))
            .agent(AgentSpec::new("A", "m", ""))
            .build()
            .expect_err("duplicate");
        assert_eq!(err, AgentConfigError::DuplicateAgent("A".to_string()));

        let err = AgentSet::builder()
            .agent(AgentSpec::new("  ", "m", ""))
            .build()
            .expect_err("empty");
        assert_eq!(err, AgentConfigError::EmptyName);

        let mut builder = AgentSetBuilder::new();
        builder.add(AgentSpec::new("A", "m", "")).expect("first");
        assert_eq!(
            builder.add(AgentSpec::new("A", "m", "")),
            Err(AgentConfigError::DuplicateAgent("A".to_string()))
        );
        assert_eq!(
            builder.add(AgentSpec::new("", "m", "")),
            Err(AgentConfigError::EmptyName)
        );
    }

    #[test]
    fn rejects_duplicate_and_invalid_operations() {
        let err = AgentSet::builder()
            .agent(
                AgentSpec::new("A", "m", "")
                    .with_tool(tool("search"))
                    .with_tool(tool("search")),
            )
            .build()
            .expect_err("duplicate op");
        assert!(matches!(err, AgentConfigError::DuplicateOperation { .. }));

        let err = AgentSet::builder()
            .agent(AgentSpec::new("A", "m", "").with_transfer("transfer to b", "A"))
            .build()
            .expect_err("invalid op");
        assert!(matches!(err, AgentConfigError::InvalidOperationName { .. }));
    }

    #[test]
    fn rejects_empty_set_and_missing_model() {
        assert_eq!(
            AgentSetBuilder::new().build().expect_err("empty"),
            AgentConfigError::EmptySet
        );
        assert_eq!(
            AgentSet::builder()
                .agent(AgentSpec::new("A", "", ""))
                .build()
                .expect_err("model"),
            AgentConfigError::MissingModel("A".to_string())
        );
    }

    #[test]
    fn operations_can_be_extended_before_sealing() {
        let mut builder = AgentSetBuilder::new();
        builder
            .add(AgentSpec::new("Triage", "m", ""))
            .expect("triage");
        builder
            .add(AgentSpec::new("WebSearch", "m", "").with_tool(tool("search_web")))
            .expect("web");

        builder
            .spec_mut("Triage")
            .expect("triage spec")
            .add_transfer("transfer_to_web_search_agent", "WebSearch", None);
        builder
            .spec_mut("WebSearch")
            .expect("web spec")
            .add_transfer("transfer_back_to_triage_agent", "Triage", Some("Back".into()));

        let set = builder.build().expect("build");
        let web = set.by_name("WebSearch").expect("web");
        let back = web.transfers().next().expect("back");
        assert_eq!(back.description(), "Back");
        assert_eq!(set.by_name("Triage").expect("triage").transfers().count(), 1);
    }
}
