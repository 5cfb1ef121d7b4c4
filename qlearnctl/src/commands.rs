// Command implementations for qlearnctl

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use qlearn_agent::{EpisodeDriver, QTable, RunSummary};
use qlearn_core::{ActionCatalog, Environment, StateCodec};
use qlearn_env::TcpEnvironment;

use crate::config::CtlConfig;

pub async fn run(config: CtlConfig, summary_path: Option<PathBuf>) -> Result<()> {
    config.validate()?;
    let address = config.connection.address();
    let env = TcpEnvironment::connect(config.connection.clone())
        .await
        .with_context(|| format!("Failed to connect to environment at {address}"))?;

    let mut driver = EpisodeDriver::open(env, config.run.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to prepare q-table {}",
                config.run.table_path.display()
            )
        })?;

    let outcome = driver.run().await;
    driver.close().await.context("Failed to close environment")?;
    let summary = outcome.context("Run aborted")?;

    print!("{}", render_summary(&summary));

    if let Some(path) = summary_path {
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }
    Ok(())
}

pub async fn inspect(config: CtlConfig, table_path: &Path) -> Result<()> {
    config.validate()?;
    let codec = config.run.codec()?;
    let catalog = &config.run.actions;
    let table = QTable::load(table_path, codec.num_states(), catalog.len())
        .await
        .with_context(|| format!("Failed to load q-table {}", table_path.display()))?;

    print!("{}", render_table(&table, &codec, catalog)?);
    Ok(())
}

pub async fn probe(config: CtlConfig, action: Option<String>, steps: usize) -> Result<()> {
    config.validate()?;
    let codec = config.run.codec()?;
    let action = action.unwrap_or_else(|| "jump".to_string());
    config
        .run
        .actions
        .index(&action)
        .with_context(|| format!("Action {action:?} is not in the catalog"))?;

    let address = config.connection.address();
    let mut env = TcpEnvironment::connect(config.connection.clone())
        .await
        .with_context(|| format!("Failed to connect to environment at {address}"))?;

    let outcome = observe(&mut env, &codec, &action, steps).await;
    env.close().await.context("Failed to close environment")?;
    outcome
}

async fn observe<E: Environment>(
    env: &mut E,
    codec: &StateCodec,
    action: &str,
    steps: usize,
) -> Result<()> {
    for step in 1..=steps {
        let observation = env.step(action).await.context("Exchange failed")?;
        let state = codec.decode(&observation.state)?;
        let fields = codec.fields_of(state)?;
        info!(
            step,
            state = %observation.state,
            platform = fields.platform,
            direction = fields.direction,
            reward = observation.reward.value(),
            done = observation.done,
            "observation"
        );
    }
    Ok(())
}

fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run finished ({:?})", summary.mode);
    let _ = writeln!(out, "   Episodes:       {}", summary.episodes.len());
    let _ = writeln!(out, "   Terminal:       {}", summary.terminal_count);
    let _ = writeln!(out, "   Total steps:    {}", summary.total_steps);
    let _ = writeln!(out, "   Total reward:   {:.2}", summary.total_reward);
    let _ = writeln!(out, "   Mean reward:    {:.2}", summary.mean_reward());
    if let Some(path) = &summary.saved_to {
        let _ = writeln!(out, "   Table saved to: {}", path.display());
    }
    out
}

/// One line per state: bits, sub-fields, value per action, greedy action
fn render_table(table: &QTable, codec: &StateCodec, catalog: &ActionCatalog) -> Result<String> {
    let mut out = String::new();
    let _ = write!(
        out,
        "{:>5} {:>width$} {:>8} {:>9}",
        "state",
        "bits",
        "platform",
        "direction",
        width = codec.width()
    );
    for label in catalog.labels() {
        let _ = write!(out, " {label:>12}");
    }
    let _ = writeln!(out, "  greedy");

    for state in 0..table.num_states() {
        let bits = codec.encode(state)?;
        let fields = codec.fields_of(state)?;
        let _ = write!(
            out,
            "{state:>5} {bits:>width$} {:>8} {:>9}",
            fields.platform,
            fields.direction,
            width = codec.width()
        );
        for value in table.row(state)? {
            let _ = write!(out, " {value:>12.6}");
        }
        let greedy = catalog.label(table.best_action(state)?)?;
        let _ = writeln!(out, "  {greedy}");
    }
    Ok(out)
}
