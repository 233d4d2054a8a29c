mod cli;
mod commands;
mod config;
mod signals;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::Cli;
use cronkit::Mode;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Service mode runs unattended, so it keeps timestamps and pass logs
    let default_level = if cli.service { log_level.max(log::LevelFilter::Info) } else { log_level };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            default_level
        })
        .format_timestamp(if cli.service {
            Some(env_logger::TimestampPrecision::Seconds)
        } else {
            None
        })
        .init();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "goalsync", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let config_path = config::resolve_path(cli.config.as_deref());
    log::debug!("Using config file {}", config_path.display());

    if cli.check {
        return commands::check::run(&ctx, &config_path);
    }

    let mode = if cli.service { Mode::Service } else { Mode::Standalone };
    commands::sync::run(&ctx, &config_path, mode, cli.json)
}
