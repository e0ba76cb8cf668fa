//! Default agent wiring: a triage coordinator plus web and video search
//! specialists that can hand the conversation back or sideways.

use std::sync::Arc;

use crate::agent::{AgentConfigError, AgentSet, AgentSetBuilder, AgentSpec};
use crate::config::Config;
use crate::tools::{Tool, VideoSearch, WebSearch};

pub const TRIAGE_AGENT: &str = "Triage Agent";
pub const WEB_SEARCH_AGENT: &str = "Web Search Agent";
pub const VIDEO_SEARCH_AGENT: &str = "YouTube Search Agent";

pub const TRANSFER_TO_WEB_SEARCH: &str = "transfer_to_web_search_agent";
pub const TRANSFER_TO_VIDEO_SEARCH: &str = "transfer_to_youtube_search_agent";
pub const TRANSFER_BACK_TO_TRIAGE: &str = "transfer_back_to_triage_agent";

/// Prompts run by the binary when none is given.
pub const DEMO_PROMPTS: [&str; 3] = [
    "Run a web search for the keyword 'Miyazaki gourmet'.",
    "Run a YouTube search for the keyword 'Miyazaki gourmet'.",
    "What food do you recommend in Miyazaki?",
];

const TRIAGE_INSTRUCTIONS: &str = r#"
You are a triage specialist who works out what the user needs and routes the conversation accordingly.
If a YouTube search is needed, transfer the conversation to the YouTube search agent.
If a web search is needed, transfer the conversation to the web search agent.
If no transfer is needed and you can answer the question directly, answer it.
"#;

const WEB_SEARCH_INSTRUCTIONS: &str = r#"
You are a web search specialist. When the user asks for a web search with a keyword, call search_web and present the results as a numbered table with title, URL and summary.
If a web search is not needed, transfer the conversation back to the triage agent.
If a YouTube search is needed, transfer the conversation to the YouTube search agent.
"#;

const VIDEO_SEARCH_INSTRUCTIONS: &str = r#"
You are a YouTube search specialist. When the user asks for a YouTube search with a keyword, call search_youtube_videos and present the results as a numbered table with title, description, channel, publish time and URL.
If a YouTube search is not needed, transfer the conversation back to the triage agent.
If a web search is needed, transfer the conversation to the web search agent.
"#;

/// Preset agents backed by the real search capabilities.
pub fn search_agents(config: &Config) -> Result<Arc<AgentSet>, AgentConfigError> {
    let web = WebSearch::new(config.search_region.clone(), config.http_timeout);
    let video = VideoSearch::new(config.youtube_api_key.clone(), config.http_timeout);
    search_agents_with(&config.default_model, Arc::new(web), Arc::new(video))
}

/// Preset agents with caller-supplied capabilities.
pub fn search_agents_with(
    model: &str,
    web_search: Arc<dyn Tool>,
    video_search: Arc<dyn Tool>,
) -> Result<Arc<AgentSet>, AgentConfigError> {
    let mut builder = AgentSetBuilder::new();
    builder.add(AgentSpec::new(
        TRIAGE_AGENT,
        model,
        TRIAGE_INSTRUCTIONS.trim(),
    ))?;
    builder.add(
        AgentSpec::new(WEB_SEARCH_AGENT, model, WEB_SEARCH_INSTRUCTIONS.trim()).with_tool(web_search),
    )?;
    builder.add(
        AgentSpec::new(VIDEO_SEARCH_AGENT, model, VIDEO_SEARCH_INSTRUCTIONS.trim())
            .with_tool(video_search),
    )?;

    // Cross-references are added once every agent is declared.
    wire_transfers(&mut builder, &PRESET_WIRING)?;
    builder.build()
}

/// `(source agent, transfer operation, target agent)`
type Wiring = (&'static str, &'static str, &'static str);

const PRESET_WIRING: [Wiring; 6] = [
    (TRIAGE_AGENT, TRANSFER_TO_WEB_SEARCH, WEB_SEARCH_AGENT),
    (TRIAGE_AGENT, TRANSFER_TO_VIDEO_SEARCH, VIDEO_SEARCH_AGENT),
    (WEB_SEARCH_AGENT, TRANSFER_BACK_TO_TRIAGE, TRIAGE_AGENT),
    (WEB_SEARCH_AGENT, TRANSFER_TO_VIDEO_SEARCH, VIDEO_SEARCH_AGENT),
    (VIDEO_SEARCH_AGENT, TRANSFER_BACK_TO_TRIAGE, TRIAGE_AGENT),
    (VIDEO_SEARCH_AGENT, TRANSFER_TO_WEB_SEARCH, WEB_SEARCH_AGENT),
];

fn wire_transfers(
    builder: &mut AgentSetBuilder,
    wiring: &[Wiring],
) -> Result<(), AgentConfigError> {
    for &(source, operation, target) in wiring {
        let spec = builder
            .spec_mut(source)
            .ok_or_else(|| AgentConfigError::UnknownAgent(source.to_string()))?;
        spec.add_transfer(
            operation,
            target,
            Some(format!("Transfer the conversation to the {}.", target)),
        );
    }
    Ok(())
}
