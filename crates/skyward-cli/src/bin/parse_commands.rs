//! Run the command parser over a script without a server.
//!
//! Each line is parsed against the command produced by the previous line,
//! the same way the server threads its canonical state, and the resulting
//! command is printed as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyward_cli::script_lines;
use skyward_core::models::Command;
use skyward_llm::client::{DEFAULT_CHAT_URL, DEFAULT_MODEL};
use skyward_llm::{ChatBackend, CommandParser, OfflineBackend, OllamaClient};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Script with one instruction per line
    #[arg(long)]
    file: PathBuf,

    /// Chat endpoint of the language model
    #[arg(long, default_value = DEFAULT_CHAT_URL)]
    llm_url: String,

    /// Model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Skip the model and use the rule-based parser only
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("skyward_llm=warn".parse()?))
        .init();

    let args = Args::parse();
    let contents = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let backend: Arc<dyn ChatBackend> = if args.offline {
        Arc::new(OfflineBackend)
    } else {
        Arc::new(OllamaClient::with_timeout(
            &args.llm_url,
            &args.model,
            Duration::from_secs(args.timeout_secs),
        )?)
    };
    let parser = CommandParser::new(backend);

    let mut state = Command::default();
    for line in script_lines(&contents) {
        let outcome = parser.parse_with_source(&state, line).await;
        println!("> {}", line);
        println!(
            "  [{:?}] {}",
            outcome.source,
            serde_json::to_string(&outcome.command)?
        );
        state = outcome.command;
    }

    Ok(())
}
