use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "goalsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Sync goal metrics and status from their data sources", long_about = None)]
pub struct Cli {
    /// Config file (default: ./config.toml, then the user config directory)
    pub config: Option<PathBuf>,

    /// Run as a service, syncing on the configured cron schedule
    #[arg(short, long, conflicts_with = "check")]
    pub service: bool,

    /// Validate the config file without contacting any service
    #[arg(long)]
    pub check: bool,

    /// Print the pass report as JSON
    #[arg(long, conflicts_with = "service")]
    pub json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}
