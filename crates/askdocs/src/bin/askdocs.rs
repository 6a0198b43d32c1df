//! askdocs CLI
//!
//! ```bash
//! # Ask a question against the configured backend
//! askdocs ask "What is the refund policy?"
//!
//! # Print the full response body as JSON
//! askdocs ask --json --top-k 3 "What is the refund policy?"
//!
//! # Validate a configuration file
//! askdocs check-config --config askdocs.toml
//! ```
//!
//! The exit status identifies the failure kind (see `ErrorKind::exit_code`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use askdocs::{AnswerResponse, AskDocsConfig, ErrorKind, QueryOrchestrator, QueryRequest};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askdocs")]
#[command(about = "Grounded answers from a document collection")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $ASKDOCS_CONFIG, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask {
        /// The question
        question: String,

        /// Extra instructions for the model
        #[arg(short, long)]
        instructions: Option<String>,

        /// Number of passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the response body as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and print the effective values
    CheckConfig,
}

fn load_config(path: Option<&Path>) -> askdocs::Result<AskDocsConfig> {
    match path {
        Some(path) => AskDocsConfig::load(path),
        None => AskDocsConfig::from_env_or_default(),
    }
}

/// Mask credentials before printing the effective configuration
fn redacted(mut config: AskDocsConfig) -> AskDocsConfig {
    let mask = |token: &mut Option<String>| {
        if token.is_some() {
            *token = Some("********".to_string());
        }
    };
    mask(&mut config.http.bearer_token);
    if let Some(bedrock) = config.bedrock.as_mut() {
        mask(&mut bedrock.bearer_token);
    }
    config
}

fn exit_status(kind: ErrorKind) -> ExitCode {
    ExitCode::from(u8::try_from(kind.exit_code()).unwrap_or(1))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout carries only the answer
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askdocs=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return Ok(exit_status(e.kind()));
        }
    };

    match cli.command {
        Commands::CheckConfig => {
            println!("{}", style("Configuration is valid").green().bold());
            println!("{}", toml::to_string_pretty(&redacted(config))?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask {
            question,
            instructions,
            top_k,
            json,
        } => {
            let orchestrator = match QueryOrchestrator::from_config(Arc::new(config)) {
                Ok(orchestrator) => orchestrator,
                Err(e) => {
                    eprintln!("{} {}", style("error:").red().bold(), e);
                    return Ok(exit_status(e.kind()));
                }
            };

            let mut request = QueryRequest::new(question);
            request.instructions = instructions;
            request.top_k = top_k;

            let answer = orchestrator.handle(request.into()).await;
            let code = answer
                .error_kind()
                .map(exit_status)
                .unwrap_or(ExitCode::SUCCESS);

            let response = AnswerResponse::from(answer);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(code);
            }

            match (&response.error_kind, &response.message) {
                (Some(kind), message) => {
                    eprintln!(
                        "{} {} at stage {}: {}",
                        style("error:").red().bold(),
                        kind,
                        response
                            .failed_stage
                            .map(|s| s.to_string())
                            .unwrap_or_default(),
                        message.as_deref().unwrap_or_default()
                    );
                }
                (None, _) => {
                    println!("{}", response.answer.trim());
                    if !response.references.is_empty() {
                        println!("\n{}", style("References").bold());
                        for (i, doc) in response.references.iter().enumerate() {
                            let location = doc.doc_url.as_deref().unwrap_or(&doc.source);
                            println!(
                                "  [{}] {} {}",
                                i + 1,
                                style(&doc.display_title).cyan(),
                                style(location).dim()
                            );
                        }
                    }
                }
            }

            Ok(code)
        }
    }
}
