//! Send a command to a running Skyward server.
//!
//! Operator text goes through the server's parser; `--json` posts a canonical
//! command as-is.

use anyhow::{bail, Context};
use clap::Parser;
use std::time::Duration;

use skyward_cli::PilotClient;
use skyward_core::models::WireCommand;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Skyward server URL
    #[arg(long, default_value = "http://localhost:3100")]
    url: String,

    /// Canonical command as JSON instead of operator text
    #[arg(long)]
    json: Option<String>,

    /// Print the pilot state after this many milliseconds
    #[arg(long)]
    watch_ms: Option<u64>,

    /// Operator text, e.g. "앞으로 3 m/s로 이동"
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let client = PilotClient::new(&args.url);

    let accepted = match (&args.json, args.text.is_empty()) {
        (Some(raw), true) => {
            let wire: WireCommand =
                serde_json::from_str(raw).context("--json is not a valid command")?;
            client.send_command(&wire.into_command()).await?
        }
        (None, false) => client.send_text(&args.text.join(" ")).await?,
        (Some(_), false) => bail!("pass either operator text or --json, not both"),
        (None, true) => bail!("nothing to send"),
    };

    match accepted.action {
        Some(action) => println!("{}: {}", accepted.status, action),
        None => println!("{}", accepted.status),
    }

    if let Some(ms) = args.watch_ms {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        let state = client.state().await?;
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}
