//! Handoff Router - command-line entry point
//!
//! Runs the prompt given as arguments (or the demo prompts) through the
//! preset triage / web search / video search agents.

use std::sync::Arc;

use handoff_router::router::RunOptions;
use handoff_router::{presets, Config, Message, OpenAiClient, Router, Termination};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handoff_router=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, max_turns={}",
        config.default_model, config.max_turns
    );
    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; video searches will report a failure");
    }

    let agents = presets::search_agents(&config)?;
    let llm = Arc::new(OpenAiClient::new(
        config.api_key.clone(),
        &config.api_url,
        config.http_timeout,
    )?);
    let router = Router::new(llm, agents).with_max_turns(config.max_turns);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let prompts: Vec<String> = if prompt.trim().is_empty() {
        presets::DEMO_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        vec![prompt]
    };

    // The first Ctrl-C stops the current run at its next step boundary; a
    // second one exits without waiting for the in-flight request.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupt received; stopping after the current step (press Ctrl-C again to exit)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received; exiting");
                std::process::exit(130);
            }
        });
    }

    for prompt in prompts {
        info!("Running prompt: {}", prompt);
        let result = router
            .run_with(
                presets::TRIAGE_AGENT,
                vec![Message::user(prompt)],
                RunOptions::default(),
                cancel.clone(),
            )
            .await?;

        match result.termination {
            Termination::Completed => {
                println!("{}\n", result.final_text().unwrap_or_default());
            }
            Termination::Cancelled => {
                warn!("Cancelled while {} was active", result.active_agent.name());
                break;
            }
            other => {
                warn!(
                    "Run ended without an answer ({:?}) after {} turn(s) with {}",
                    other,
                    result.turns,
                    result.active_agent.name()
                );
            }
        }
    }

    Ok(())
}
