//! dmplayer-om CLI - Open Measurement bridge toolkit
//!
//! Features:
//! - Replay recorded player event logs through the bridge
//! - Inspect the resulting measurement calls and reported errors
//! - Decode verification script payloads

use clap::{Parser, Subcommand};
use dmplayer_om::PlayerState;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

/// dmplayer-om - Open Measurement bridge toolkit
#[derive(Parser)]
#[command(name = "dmplayer-om")]
#[command(author = "Dailymotion")]
#[command(version)]
#[command(about = "Replay player ad events through the Open Measurement bridge", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event log (JSON lines or JSON array)
    Replay {
        /// Path to the event log
        events: PathBuf,

        /// Bridge configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Player state set by the host before replaying
        #[arg(short, long)]
        player_state: Option<PlayerState>,

        /// Make a measurement call fail (repeatable), e.g. `pause`
        #[arg(long)]
        fail_on: Vec<String>,

        /// Identifier of the host view
        #[arg(long, default_value = "player-webview")]
        view_id: String,

        /// OMID service script to hand to the session
        #[arg(long)]
        service_script: Option<PathBuf>,
    },

    /// Decode the verification scripts of an ad_loaded payload
    Payload {
        /// Encoded payload
        payload: String,
    },

    /// Show bridge, partner and measurement SDK versions
    Version,
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);
    dmplayer_om::init();

    match cli.command {
        Commands::Replay {
            events,
            config,
            player_state,
            fail_on,
            view_id,
            service_script,
        } => {
            let options = commands::ReplayOptions {
                events,
                config,
                player_state,
                fail_on,
                view_id,
                service_script,
            };
            commands::replay(options, &cli.format).await?;
        }
        Commands::Payload { payload } => {
            commands::parse_payload(&payload, &cli.format)?;
        }
        Commands::Version => {
            commands::version()?;
        }
    }

    Ok(())
}
