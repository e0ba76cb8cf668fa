//! # Handoff Router
//!
//! Routes a user's request between cooperating LLM agents.
//!
//! This library provides:
//! - Agent definitions with a fixed set of operations, sealed by a wiring pass
//! - Capability functions (web search, video search) that report failures as values
//! - A router that hands control between agents when the backend calls a transfer
//! - Integration with any OpenAI-compatible chat-completions backend
//!
//! ## Architecture
//!
//! Each agent owns capabilities and transfers. The router sends the active
//! agent's instructions and operation schemas to the backend, executes what
//! it asks for, switches agents on transfers, and stops at the first plain
//! text answer (or at the turn limit).
//!
//! ## Example
//!
//! ```rust,ignore
//! use handoff_router::{presets, Config, Message, OpenAiClient, Router};
//!
//! let config = Config::from_env()?;
//! let agents = presets::search_agents(&config)?;
//! let llm = OpenAiClient::new(config.api_key.clone(), &config.api_url, config.http_timeout)?;
//! let router = Router::new(std::sync::Arc::new(llm), agents);
//! let result = router
//!     .run(presets::TRIAGE_AGENT, vec![Message::user("Search the web for ramen")])
//!     .await?;
//! println!("{}", result.final_text().unwrap_or_default());
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod presets;
pub mod router;
pub mod session;
pub mod tools;

pub use agent::{Agent, AgentConfigError, AgentSet, AgentSpec};
pub use config::Config;
pub use llm::{LlmClient, OpenAiClient};
pub use router::{Router, RouterError, RunOptions, RunResult, Termination};
pub use session::{Message, Session};
