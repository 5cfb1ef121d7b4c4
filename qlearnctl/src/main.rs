// qlearnctl
// Command-line client that trains and evaluates a tabular Q-learning agent
// against a socket-driven platform game

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use qlearn_agent::RunMode;

mod commands;
mod config;

use config::{CtlConfig, Overrides};

#[derive(Parser)]
#[command(name = "qlearnctl")]
#[command(about = "Tabular Q-learning client for a socket-driven platform game", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the game and run training or evaluation episodes
    Run {
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// fresh, resume or evaluate
        #[arg(short, long)]
        mode: Option<RunMode>,

        /// Number of episodes
        #[arg(short, long)]
        episodes: Option<usize>,

        /// Q-table file
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Exploration rate
        #[arg(long)]
        epsilon: Option<f64>,

        /// Game server host
        #[arg(long)]
        host: Option<String>,

        /// Game server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Write the run summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Print a persisted Q-table state by state
    Inspect {
        /// Q-table file
        #[arg(short, long)]
        table: PathBuf,

        /// JSON config file (state layout and actions)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Repeatedly send one action and log what the game reports
    Probe {
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Action label to send
        #[arg(short, long)]
        action: Option<String>,

        /// Number of exchanges
        #[arg(short = 'n', long, default_value = "10")]
        steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            mode,
            episodes,
            table,
            seed,
            epsilon,
            host,
            port,
            summary,
        } => {
            let mut settings = CtlConfig::load(config.as_deref())?;
            settings.apply(Overrides {
                mode,
                episodes,
                table,
                seed,
                epsilon,
                host,
                port,
            });
            commands::run(settings, summary).await?;
        }

        Commands::Inspect { table, config } => {
            let settings = CtlConfig::load(config.as_deref())?;
            commands::inspect(settings, &table).await?;
        }

        Commands::Probe {
            config,
            action,
            steps,
        } => {
            let settings = CtlConfig::load(config.as_deref())?;
            commands::probe(settings, action, steps).await?;
        }
    }

    Ok(())
}
