use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use auspex::agents::{Agent, ChatSession};
use auspex::models::config::AuspexConfig;
use auspex::models::event::Event;
use auspex::{Engine, EngineError};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "auspex", about = "Event-driven decision loop for LLM trading agents")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/auspex.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one decision cycle over a JSON array of events
    Decide {
        /// Read events from a file instead of stdin
        #[arg(short, long)]
        input: Option<String>,

        /// Session identifier recorded with the cycle
        #[arg(short, long, default_value = "cli")]
        session: String,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
    /// List commands still waiting to be executed
    Pending,
    /// Trim completed and failed history to the configured limit
    Archive,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable (respects RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: AuspexConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    match cli.command {
        Command::Decide {
            input,
            session,
            pretty,
        } => decide(&config, input.as_deref(), session, pretty).await,
        Command::Pending => {
            let ledger = auspex::store::CommandLedger::from_config(&config.ledger);
            let pending = ledger
                .load_pending_commands()
                .with_context(|| format!("Failed to load {}", ledger.path().display()))?;
            print_json(&pending, true)
        }
        Command::Archive => {
            let ledger = auspex::store::CommandLedger::from_config(&config.ledger);
            let archived = ledger
                .archive_completed_commands()
                .with_context(|| format!("Failed to archive {}", ledger.path().display()))?;
            print_json(&serde_json::json!({ "archived": archived }), false)
        }
    }
}

async fn decide(
    config: &AuspexConfig,
    input: Option<&str>,
    session_id: String,
    pretty: bool,
) -> Result<()> {
    let events_json = if let Some(input_path) = input {
        std::fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input: {input_path}"))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };
    let events: Vec<Event> =
        serde_json::from_str(&events_json).context("Failed to parse events JSON")?;

    let keeper = Arc::new(auspex::build_keeper(config).context("Failed to build agent chain")?);
    keeper.start().await.context("Failed to start agent chain")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        });
    }

    let engine = Engine::from_config(config, keeper.clone(), auspex::shared_ledger(config));
    let mut session = ChatSession::new(session_id);
    let outcome = engine.step(&cancel, &mut session, &events).await;

    if let Err(e) = keeper.stop().await {
        tracing::warn!(error = %e, "Failed to stop agent chain");
    }

    let outcome = outcome.map_err(|e: EngineError| anyhow::anyhow!("Decision cycle failed: {e}"))?;
    print_json(&outcome, pretty)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
