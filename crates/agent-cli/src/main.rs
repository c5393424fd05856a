//! agent-chat
//!
//! Terminal front-end: an interactive chat whose model may call the
//! built-in tools, a resume critique, and a model listing.

mod models;
mod resume;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, Responder, Session, toolkit};
use agent_runtime::{RuntimeConfig, build_provider};

#[derive(Parser)]
#[command(name = "agent-chat")]
#[command(about = "Chat with a local or hosted LLM that can call tools")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, default_value_t = false)]
    debug: bool,

    /// Model to use instead of LLM_MODEL
    #[arg(long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Critique a resume (PDF or plain text)
    Critique {
        /// Resume file
        file: PathBuf,

        /// Job role you are targeting
        #[arg(long)]
        role: Option<String>,
    },
    /// List the models the endpoint offers
    Models,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into())
    };

    // stderr keeps log lines out of the chat transcript on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment
    dotenvy::dotenv().ok();
    init_tracing(cli.debug);

    let mut config = RuntimeConfig::from_env().context("invalid configuration")?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    tracing::info!(provider = %config.provider, model = %config.model, "Configuration loaded");

    let provider = build_provider(&config).context("cannot set up the model endpoint")?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => chat(provider, &config).await,
        Commands::Critique { file, role } => {
            resume::run(provider.as_ref(), &config, &file, role.as_deref()).await
        }
        Commands::Models => models::run(provider.as_ref()).await,
    }
}

async fn chat(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> anyhow::Result<()> {
    match provider.health_check().await {
        Ok(true) => tracing::info!(provider = provider.name(), "Endpoint reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!(provider = provider.name(), "Endpoint not reachable - turns will fail");
            tracing::warn!("{}", provider.troubleshooting_hint());
        }
    }

    let tools = toolkit::default_registry()?;
    tracing::info!("Registered {} tools: {:?}", tools.len(), tools.names());

    let responder = Responder::new(provider, Arc::new(tools), config.responder_config());
    let mut session = Session::new(responder);

    let stdin = std::io::stdin();
    session.run(stdin.lock(), std::io::stdout()).await?;

    Ok(())
}
