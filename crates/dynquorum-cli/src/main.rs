//! dynquorum CLI - compute dynamic governance quorums and replay governor
//! event logs.

pub mod commands;
pub mod config;
pub mod output;
pub mod telemetry;

use clap::Parser;

fn main() {
    let cli = commands::Cli::parse();

    if let Err(e) = run(cli) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: commands::Cli) -> anyhow::Result<()> {
    // Logging settings come from the file unless overridden on the command line.
    let file_config = config::CliConfig::load(cli.config.as_deref()).unwrap_or_default();
    let log_level = cli.log_level.as_deref().unwrap_or(&file_config.log_level);
    telemetry::init_telemetry(log_level, cli.json_logs || file_config.json_logs)?;

    commands::execute(cli.command, cli.config.as_deref())
}
