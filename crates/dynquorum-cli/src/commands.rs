//! CLI command implementations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dynquorum_governance::{
    resolve_state, ChainView, DynamicQuorumParams, GovernanceIndexer, IndexedEvent,
    ProposalRecord, ProposalState, ProposalVoteSnapshot, QuorumParamsHistory,
};
use dynquorum_types::{Bps, U256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::output::*;

/// Main CLI.
#[derive(Parser)]
#[command(name = "dynquorum")]
#[command(about = "Dynamic quorum calculator and governance event replayer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (defaults to ~/.dynquorum/config.toml)
    #[arg(short, long, global = true, env = "DYNQUORUM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the quorum for a vote tally
    Quorum {
        /// Votes cast against the proposal
        #[arg(short, long)]
        against: U256,

        /// Token supply at the proposal's snapshot block
        #[arg(short, long)]
        supply: U256,

        /// Quorum floor in basis points
        #[arg(long)]
        min_bps: Option<u16>,

        /// Quorum ceiling in basis points
        #[arg(long)]
        max_bps: Option<u16>,

        /// Quorum coefficient, 1000000 = 1.0
        #[arg(long)]
        coefficient: Option<U256>,

        /// Print only the quorum in votes
        #[arg(long)]
        raw: bool,
    },

    /// Replay a JSON log of governor events and report proposal states
    Replay {
        /// File holding a JSON array of events
        file: PathBuf,

        /// Resolve states at this block (defaults to the last event's block)
        #[arg(long)]
        block: Option<u64>,

        /// Resolve states at this timestamp (defaults to the last event's)
        #[arg(long)]
        timestamp: Option<u64>,

        /// Show a single proposal
        #[arg(long)]
        proposal: Option<u64>,

        /// Only list proposals in this state, e.g. `active` or `objection-period`
        #[arg(long)]
        state: Option<ProposalState>,

        /// Seed the parameter history from the configured defaults
        #[arg(long)]
        seed_params: bool,

        /// Print proposals as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config commands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key: log_level, json_logs, dao_v3, min_bps, max_bps, coefficient
        key: String,
        value: String,
    },

    /// Get a configuration value
    Get {
        key: String,
    },

    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Execute a command.
pub fn execute(cmd: Commands, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = match cmd {
        Commands::Config(ConfigCommands::Init { .. }) => CliConfig::default(),
        _ => CliConfig::load(config_path)?,
    };

    match cmd {
        Commands::Quorum {
            against,
            supply,
            min_bps,
            max_bps,
            coefficient,
            raw,
        } => {
            let params = resolve_params(&config.quorum, min_bps, max_bps, coefficient)?;
            let quorum = params.quorum_votes(&ProposalVoteSnapshot::new(against, supply))?;
            debug!(%against, %supply, %quorum, "Computed dynamic quorum");

            if raw {
                println!("{}", quorum);
            } else {
                print_quorum(&params, &against, &supply, &quorum);
            }
            Ok(())
        }

        Commands::Replay {
            file,
            block,
            timestamp,
            proposal,
            state,
            seed_params,
            json,
        } => {
            let events = load_events(&file)?;
            let seed = seed_params.then_some(config.quorum);
            let indexer = replay(&events, seed)?;
            let view = chain_view(&events, block, timestamp, config.dao_v3);
            info!(
                events = indexer.events_handled(),
                proposals = indexer.proposals().len(),
                "Replay finished"
            );

            if let Some(id) = proposal {
                let record = indexer
                    .proposal(id)
                    .ok_or_else(|| anyhow::anyhow!("Proposal {} not found", id))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(record)?);
                } else {
                    print_header(&format!("Proposal {}", id));
                    println!("State:          {}", format_state(resolve_state(record, &view)));
                    println!("Proposer:       {}", record.proposer);
                    println!("Voting:         blocks {} to {}", record.start_block, record.end_block);
                    println!("For:            {}", record.for_votes);
                    println!("Against:        {}", record.against_votes);
                    println!("Abstain:        {}", record.abstain_votes);
                    println!("Quorum votes:   {}", record.quorum_votes);
                }
                return Ok(());
            }

            let records = select_proposals(&indexer, state, &view);
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                match state {
                    Some(state) => print_warning(&format!("No proposals in state {}", state)),
                    None => print_warning("No proposals in event log"),
                }
            } else {
                let shown = records.len();
                println!("{}", proposal_table(records, &view));
                print_info(&format!(
                    "{} events, {} of {} proposals",
                    indexer.events_handled(),
                    shown,
                    indexer.proposals().len()
                ));
            }
            Ok(())
        }

        Commands::Config(cmd) => execute_config(cmd, config, config_path),
    }
}

fn execute_config(
    cmd: ConfigCommands,
    mut config: CliConfig,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => CliConfig::config_path()?,
    };

    match cmd {
        ConfigCommands::Show => {
            print_header("CLI Configuration");
            println!("File:         {}", path.display());
            println!("Log level:    {}", config.log_level.bright_cyan());
            println!("JSON logs:    {}", config.json_logs);
            println!("DAO v3:       {}", config.dao_v3.to_string().bright_green());
            println!("Min quorum:   {}", config.quorum.min_quorum_votes_bps.to_string().bright_yellow());
            println!("Max quorum:   {}", config.quorum.max_quorum_votes_bps.to_string().bright_yellow());
            println!("Coefficient:  {}", config.quorum.quorum_coefficient.to_string().bright_magenta());
        }

        ConfigCommands::Set { key, value } => {
            set_config_value(&mut config, &key, &value)?;
            config.save(&path)?;
            print_success(&format!("Set {} = {}", key, value));
        }

        ConfigCommands::Get { key } => {
            let value = get_config_value(&config, &key)?;
            println!("{} = {}", key.bright_cyan(), value.bright_green());
        }

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                print_warning(&format!(
                    "{} already exists, pass --force to overwrite",
                    path.display()
                ));
                return Ok(());
            }
            CliConfig::default().save(&path)?;
            print_success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

/// Apply command-line overrides to the configured parameters.
pub fn resolve_params(
    base: &DynamicQuorumParams,
    min_bps: Option<u16>,
    max_bps: Option<u16>,
    coefficient: Option<U256>,
) -> anyhow::Result<DynamicQuorumParams> {
    let params = DynamicQuorumParams::from_raw(
        min_bps.unwrap_or_else(|| base.min_quorum_votes_bps.get()),
        max_bps.unwrap_or_else(|| base.max_quorum_votes_bps.get()),
        coefficient.unwrap_or(base.quorum_coefficient),
    )?;
    Ok(params)
}

/// Read a JSON array of indexed events.
pub fn load_events(path: &Path) -> anyhow::Result<Vec<IndexedEvent>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading event log {}", path.display()))?;
    let events = serde_json::from_str(&contents)
        .with_context(|| format!("parsing event log {}", path.display()))?;
    Ok(events)
}

/// Fold `events` into a fresh indexer, optionally seeded with `params` from
/// block zero.
pub fn replay(
    events: &[IndexedEvent],
    params: Option<DynamicQuorumParams>,
) -> anyhow::Result<GovernanceIndexer> {
    let mut indexer = match params {
        Some(params) => GovernanceIndexer::with_params(QuorumParamsHistory::with_initial(0, params)?),
        None => GovernanceIndexer::new(),
    };

    for (position, event) in events.iter().enumerate() {
        indexer
            .handle(event)
            .with_context(|| format!("event #{} at block {}", position, event.block_number))?;
    }
    Ok(indexer)
}

/// Proposals to list, optionally only those resolving to `state` at `view`.
pub fn select_proposals<'a>(
    indexer: &'a GovernanceIndexer,
    state: Option<ProposalState>,
    view: &ChainView,
) -> Vec<&'a ProposalRecord> {
    match state {
        Some(state) => indexer.proposals().in_state(state, view),
        None => indexer.proposals().iter().collect(),
    }
}

/// Chain position states are resolved at; unset values fall back to the
/// last event in the log.
pub fn chain_view(
    events: &[IndexedEvent],
    block: Option<u64>,
    timestamp: Option<u64>,
    dao_v3: bool,
) -> ChainView {
    let last = events.last();
    ChainView {
        block_number: block.or(last.map(|e| e.block_number)),
        block_timestamp: timestamp.or(last.map(|e| e.block_timestamp)),
        dao_v3,
    }
}

fn set_config_value(config: &mut CliConfig, key: &str, value: &str) -> anyhow::Result<()> {
    let mut quorum = config.quorum;
    match key {
        "log_level" => config.log_level = value.to_string(),
        "json_logs" => config.json_logs = value.parse()?,
        "dao_v3" => config.dao_v3 = value.parse()?,
        "min_bps" => quorum.min_quorum_votes_bps = Bps::new(value.parse()?)?,
        "max_bps" => quorum.max_quorum_votes_bps = Bps::new(value.parse()?)?,
        "coefficient" => quorum.quorum_coefficient = value.parse()?,
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    quorum.validate()?;
    config.quorum = quorum;
    Ok(())
}

fn get_config_value(config: &CliConfig, key: &str) -> anyhow::Result<String> {
    let value = match key {
        "log_level" => config.log_level.clone(),
        "json_logs" => config.json_logs.to_string(),
        "dao_v3" => config.dao_v3.to_string(),
        "min_bps" => config.quorum.min_quorum_votes_bps.get().to_string(),
        "max_bps" => config.quorum.max_quorum_votes_bps.get().to_string(),
        "coefficient" => config.quorum.quorum_coefficient.to_string(),
        _ => anyhow::bail!("Unknown config key: {}", key),
    };
    Ok(value)
}
