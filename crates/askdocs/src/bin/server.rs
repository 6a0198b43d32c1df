//! askdocs server binary
//!
//! Run with: cargo run -p askdocs --bin askdocs-server -- --config askdocs.toml

use askdocs::{config::AskDocsConfig, server::AskDocsServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "askdocs-server")]
#[command(about = "Serve grounded answers over HTTP", version)]
struct Args {
    /// Configuration file (defaults to $ASKDOCS_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "askdocs=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                         askdocs                           ║
║        Grounded answers from your document collection     ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AskDocsConfig::load(path)?,
        None => AskDocsConfig::from_env_or_default()?,
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!(
        "  - top_k: {} (max {})",
        config.retrieval.default_top_k,
        config.retrieval.max_top_k
    );
    tracing::info!("  - Max prompt chars: {}", config.prompt.max_prompt_chars);
    tracing::info!("  - Retry attempts: {}", config.retry.max_attempts);

    let server = AskDocsServer::new(config)?;
    server.check_providers().await;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/answer               - Ask a question (JSON body)");
    println!("  GET  /api/answer?question=...  - Ask a question (query string)");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
