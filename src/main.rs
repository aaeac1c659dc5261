use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use helix_navigator::{
    cli::{self, Commands},
    config::{Config, LogFormat},
    graph::Neo4jClient,
    llm::AnthropicClient,
    server::{AppState, McpServer},
    workflow::WorkflowAgent,
};

/// Biomedical question answering over a Neo4j knowledge graph.
#[derive(Parser, Debug)]
#[command(name = "helix-navigator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Thread earlier questions and answers into prompts
    #[arg(long, global = true)]
    memory: bool,

    /// Use the step-by-step prompt variants
    #[arg(long, global = true)]
    chain_of_thought: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    config.agent.conversation_memory |= cli.memory;
    config.agent.chain_of_thought |= cli.chain_of_thought;

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Helix Navigator starting..."
    );

    let llm = match AnthropicClient::new(&config.llm, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %c.base_url(), model = %c.model(), "Anthropic client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Anthropic client");
            return Err(e.into());
        }
    };

    let graph = match Neo4jClient::new(&config.graph, config.request.clone()) {
        Ok(c) => {
            info!(uri = %config.graph.uri, database = %config.graph.database, "Neo4j client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Neo4j client");
            return Err(e.into());
        }
    };

    let mut agent = match WorkflowAgent::new(
        Arc::new(llm),
        Arc::new(graph),
        &config.agent,
        config.graph.sample_limit,
    )
    .await
    {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "Failed to read the knowledge graph schema");
            return Err(e.into());
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let server = McpServer::new(Arc::new(AppState::new(config, agent)));

            info!("Server ready, waiting for requests on stdin...");
            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
            info!("Server shutdown complete");
            return Ok(());
        }
        Commands::Chat => {
            let stdin = BufReader::new(tokio::io::stdin());
            cli::run_chat(&mut agent, stdin, tokio::io::stdout()).await?;
            return Ok(());
        }
        Commands::Ask { question, json } => cli::execute_ask(&mut agent, &question, json).await,
        Commands::Schema => cli::execute_schema(&agent),
    };

    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
