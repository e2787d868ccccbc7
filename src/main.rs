mod answer;
mod chain;
mod config;
mod error;
mod graph;
mod providers;
mod query;

use anyhow::Result;
use answer::AnswerSynthesizer;
use chain::{ChainOutput, VectorSearchChain};
use clap::{Parser, Subcommand};
use config::{AppConfig, ConfigManager};
use graph::GraphClient;
use graph::neo4j::Neo4jGraph;
use graph::snapshot::SnapshotGraph;
use providers::Provider;
use providers::openai::OpenAiProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEMO_QUESTION: &str = "What is related to diabetes?";

// ============================================================================
// CLI Argument Parsing
// ============================================================================

#[derive(Parser)]
#[command(name = "vecgraph", version, about = "Answer questions from a knowledge graph by vector search")]
struct Cli {
    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Query a JSON graph snapshot instead of a Neo4j server
    #[arg(long, global = true, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch graph context for a question
    Ask {
        /// The question to embed
        question: String,
        /// Also ask the chat model to answer from the context
        #[arg(long)]
        answer: bool,
    },
    /// Show system info (version, platform, etc.)
    Info,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with secrets hidden
    Show,
    /// Print the config file location
    Path,
}

/// JSON envelope for non-interactive output
fn json_output(success: bool, data: serde_json::Value, error: Option<&str>) -> String {
    serde_json::json!({
        "success": success,
        "data": data,
        "error": error,
    })
    .to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let json_mode = std::env::args().any(|arg| arg == "--json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vecgraph=info"));

    if json_mode {
        // keep stdout clean for the JSON envelope
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    } else if std::env::var("VECGRAPH_LOG_JSON").is_ok() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }

    let cli = Cli::parse();
    let app_config = ConfigManager::load()?;

    let command = cli.command.unwrap_or(Commands::Ask {
        question: DEMO_QUESTION.to_string(),
        answer: false,
    });

    run_command(command, &app_config, cli.snapshot, cli.json).await
}

// ============================================================================
// Command Runner
// ============================================================================

async fn run_command(
    command: Commands,
    app_config: &AppConfig,
    snapshot: Option<PathBuf>,
    json_mode: bool,
) -> Result<()> {
    match command {
        Commands::Ask { question, answer } => {
            match ask(app_config, snapshot, &question, answer).await {
                Ok((context, answer)) => print_answer(&context, answer.as_deref(), json_mode),
                Err(e) => {
                    if json_mode {
                        println!("{}", json_output(false, serde_json::Value::Null, Some(&e.to_string())));
                    } else {
                        eprintln!("Error: {}", e);
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::Info => {
            let version = env!("CARGO_PKG_VERSION");
            let platform = std::env::consts::OS;
            let provider = OpenAiProvider::new(&app_config.openai)?;
            let provider_info = provider.info();
            if json_mode {
                println!(
                    "{}",
                    json_output(
                        true,
                        serde_json::json!({
                            "version": version,
                            "platform": platform,
                            "name": "vecgraph",
                            "provider": provider_info.name,
                            "model": provider.default_model(),
                            "authenticated": provider.is_authenticated(),
                        }),
                        None
                    )
                );
            } else {
                println!("vecgraph v{}", version);
                println!("Platform: {}", platform);
                println!(
                    "Provider: {} (model: {}, authenticated: {})",
                    provider_info.display_name,
                    provider.default_model(),
                    if provider.is_authenticated() { "yes" } else { "no" }
                );
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let redacted = app_config.redacted();
                if json_mode {
                    println!("{}", json_output(true, serde_json::to_value(&redacted)?, None));
                } else {
                    println!("{}", toml::to_string_pretty(&redacted)?);
                }
            }
            ConfigAction::Path => {
                let path = ConfigManager::config_path()?;
                if json_mode {
                    println!("{}", json_output(true, serde_json::json!({ "path": path }), None));
                } else {
                    println!("{}", path.display());
                }
            }
        },
    }

    Ok(())
}

async fn ask(
    app_config: &AppConfig,
    snapshot: Option<PathBuf>,
    question: &str,
    answer: bool,
) -> error::Result<(ChainOutput, Option<String>)> {
    let graph: Arc<dyn GraphClient> = match snapshot {
        Some(path) => {
            let snapshot = SnapshotGraph::load(&path)?;
            info!(
                path = %path.display(),
                nodes = snapshot.node_count(),
                relationships = snapshot.relationship_count(),
                "Loaded graph snapshot"
            );
            Arc::new(snapshot)
        }
        None => Arc::new(Neo4jGraph::connect(&app_config.neo4j).await?),
    };
    let openai = Arc::new(OpenAiProvider::new(&app_config.openai)?);

    let chain = VectorSearchChain::new(graph, openai.clone()).verbose(app_config.chain.verbose);
    let context = chain.run(question).await?;

    if !answer {
        return Ok((context, None));
    }

    let model = openai.default_model().to_string();
    let mut synthesizer = AnswerSynthesizer::new(openai, model);
    if let Some(temperature) = app_config.openai.temperature {
        synthesizer = synthesizer.temperature(temperature);
    }
    let text = synthesizer.answer(question, &context).await?;
    Ok((context, Some(text)))
}

fn print_answer(context: &ChainOutput, answer: Option<&str>, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            json_output(
                true,
                serde_json::json!({
                    "result": context.rows(),
                    "answer": answer,
                }),
                None
            )
        );
        return;
    }

    if context.is_empty() {
        println!("No related facts found.");
    }
    for line in context.lines() {
        println!("{}", line);
    }
    if let Some(answer) = answer {
        println!();
        println!("{}", answer);
    }
}
