// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use coordinator_core::{
    CoordinatorConfig, CoordinatorContext, FilesystemKnowledgeBase, ProjectStore, SecurityValidator,
};
use coordinator_mcp::{build_registry, McpServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coordinator-mcp", version, about = "Project coordinator MCP server (stdio transport)")]
struct Args {
    /// Root directory of the knowledge base
    #[arg(long, env = "COORDINATOR_KNOWLEDGE_BASE", default_value = "./KnowledgeBase")]
    knowledge_base: PathBuf,

    /// Configuration file (defaults to coordinator.toml inside the knowledge base)
    #[arg(long, env = "COORDINATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Turn off input validation regardless of the configuration file
    #[arg(long)]
    no_validation: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| CoordinatorContext::default_config_path(&args.knowledge_base));
    let mut config = CoordinatorConfig::load(&config_path)?;
    if args.no_validation {
        config.security.enable_validation = false;
    }

    // Log to stderr so stdout carries nothing but protocol frames
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("Project coordinator MCP server starting...");

    let context = CoordinatorContext::new(config, args.knowledge_base);
    tracing::info!("Knowledge base: {}", context.knowledge_base.display());
    if !context.config.security.enable_validation {
        tracing::warn!("Input validation is disabled");
    }

    let knowledge_base = Arc::new(FilesystemKnowledgeBase::new(context.knowledge_base.clone()));
    let store = ProjectStore::spawn(knowledge_base).await;
    let validator = Arc::new(SecurityValidator::new(context.config.security.clone()));

    let registry = build_registry(store, validator, context.config.tools.extended);
    tracing::info!("Registered {} tools", registry.list_schemas().len());

    let server = McpServer::new(registry);
    server.run(tokio::io::stdin(), tokio::io::stdout()).await?;

    Ok(())
}
