//! CLI configuration management.
//!
//! Default quorum parameters, logging and governor settings, stored as TOML.

use anyhow::Context;
use dynquorum_governance::DynamicQuorumParams;
use dynquorum_types::{Bps, U256};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Log filter directive, e.g. `info` or `dynquorum_governance=debug`
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    /// Governor supports update and objection periods
    pub dao_v3: bool,
    /// Parameters used when a command does not override them
    pub quorum: DynamicQuorumParams,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
            dao_v3: true,
            quorum: DynamicQuorumParams {
                min_quorum_votes_bps: Bps::new(1_000).unwrap_or(Bps::ZERO),
                max_quorum_votes_bps: Bps::new(4_000).unwrap_or(Bps::MAX),
                quorum_coefficient: U256::from(1_000_000u64),
            },
        }
    }
}

impl CliConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !explicit && !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading config {}", config_path.display()))?;
        let config: CliConfig = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", config_path.display()))?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    /// Get configuration file path.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".dynquorum").join("config.toml"))
    }
}
