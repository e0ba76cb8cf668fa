//! Agents, their operations, and the wiring pass that seals them.
//!
//! An agent is a named persona bound to a backend model, an instruction
//! prompt and an ordered set of operations. Each operation is either a
//! capability (a [`Tool`](crate::tools::Tool)) or a transfer that hands the
//! conversation to another agent of the same set.

mod definition;
mod registry;

pub use definition::{Agent, AgentId, Operation, Transfer};
pub use registry::{AgentConfigError, AgentSet, AgentSetBuilder, AgentSpec};
