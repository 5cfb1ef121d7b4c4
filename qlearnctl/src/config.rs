// Configuration file handling for qlearnctl

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use qlearn_agent::{RunConfig, RunMode};
use qlearn_env::TcpConfig;

/// Everything a `qlearnctl` config file may contain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtlConfig {
    #[serde(flatten)]
    pub run: RunConfig,
    pub connection: TcpConfig,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<RunMode>,
    pub episodes: Option<usize>,
    pub table: Option<PathBuf>,
    pub seed: Option<u64>,
    pub epsilon: Option<f64>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl CtlConfig {
    /// Read a config file, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(mode) = overrides.mode {
            self.run.mode = mode;
        }
        if let Some(episodes) = overrides.episodes {
            self.run.num_episodes = episodes;
        }
        if let Some(table) = overrides.table {
            self.run.table_path = table;
        }
        if let Some(seed) = overrides.seed {
            self.run.seed = Some(seed);
        }
        if let Some(epsilon) = overrides.epsilon {
            self.run.epsilon = epsilon;
        }
        if let Some(host) = overrides.host {
            self.connection.host = host;
        }
        if let Some(port) = overrides.port {
            self.connection.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.run.validate().context("Invalid run configuration")?;
        self.connection
            .validate()
            .context("Invalid connection configuration")?;
        Ok(())
    }
}
