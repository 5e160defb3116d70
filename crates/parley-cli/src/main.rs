//! `parley` binary: connects to the configured MCP servers and runs the chat REPL.

mod commands;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use parley_agent::{AgentRunner, LlmProvider, ModelConfig};
use parley_mcp::{RegistrationOutcome, RegistrationReport, ServersConfig, SessionRegistry, StdioConnector};
use repl::{ConsoleSink, Repl};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", version, about = "parley: chat with an LLM that calls MCP server tools")]
struct Cli {
    /// Path to the MCP server configuration file
    #[arg(short, long, default_value = "server_config.json")]
    config: PathBuf,

    /// Model identifier sent to the chat completions API
    #[arg(long, env = "PARLEY_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Provider preset for the default base URL (openai, openrouter, groq)
    #[arg(long, default_value = "openai", value_parser = parse_provider)]
    provider: LlmProvider,

    /// API base URL, with or without a trailing `/v1`
    #[arg(long, env = "OPENAI_BASE_URL")]
    api_base: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Completion token limit per model call
    #[arg(long, default_value_t = 2024)]
    max_tokens: u32,

    /// Model calls allowed per query before it is aborted
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    max_turns: u32,

    /// Scheme that `@topic` expands to
    #[arg(long, default_value = "papers")]
    resource_scheme: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Connect to the configured servers, list what they offer, and exit
    Servers,
}

fn parse_provider(value: &str) -> Result<LlmProvider, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("unknown provider '{value}' (expected openai, openrouter or groq)"))
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

impl Cli {
    fn model_config(&self) -> ModelConfig {
        let api_key = self.api_key.clone().unwrap_or_else(|| {
            warn!("OPENAI_API_KEY is not set, sending requests without a key");
            String::new()
        });
        let mut config = ModelConfig::new(self.provider, &self.model, api_key);
        config.api_base_url = self.api_base.clone();
        config.max_tokens = self.max_tokens;
        config.max_turns = self.max_turns;
        config
    }
}

fn print_report(report: &RegistrationReport) {
    match &report.outcome {
        RegistrationOutcome::Connected { tools, .. } => {
            println!("Connected to {} with tools: {:?}", report.server, tools);
        }
        RegistrationOutcome::Failed(e) => {
            println!("Error connecting to {}: {e}", report.server);
        }
    }
}

fn print_servers(registry: &SessionRegistry) {
    for name in registry.server_names() {
        println!("{name}");
        for tool in registry.tools_of(name).unwrap_or_default() {
            println!("  tool: {tool}");
        }
        for prompt in registry.prompts_of(name).unwrap_or_default() {
            println!("  prompt: {prompt}");
        }
        for uri in registry.resources_of(name).unwrap_or_default() {
            println!("  resource: {uri}");
        }
    }
    println!(
        "\nTotal: {} server(s), {} tool(s)",
        registry.server_count(),
        registry.catalog().tools().len()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` must be loaded before clap reads env fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let servers = ServersConfig::load(&cli.config)
        .await
        .with_context(|| format!("Error loading server config '{}'", cli.config.display()))?;
    if servers.is_empty() {
        warn!(config = %cli.config.display(), "No MCP servers configured");
    }

    let mut registry = SessionRegistry::new();
    for report in registry.connect_all(&servers, &StdioConnector).await {
        print_report(&report);
    }
    let registry = Arc::new(registry);
    info!(servers = registry.server_count(), "Startup complete");

    let result = match cli.command {
        None | Some(Commands::Chat) => {
            let runner = AgentRunner::new(cli.model_config(), Arc::clone(&registry))
                .with_events(Arc::new(ConsoleSink));
            Repl::new(runner, &cli.resource_scheme)
                .run()
                .await
                .context("Failed to read input")
        }
        Some(Commands::Servers) => {
            print_servers(&registry);
            Ok(())
        }
    };

    registry.shutdown().await;
    result
}
