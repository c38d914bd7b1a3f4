use anyhow::Context;
use clap::Parser;
use microdantic_cli::args::Cli;
use microdantic_cli::config::load_config;
use microdantic_logger::{ConsoleTarget, LogSettings, Logger};
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;
    if let Some(level) = &cli.log_level {
        config.log.level.clone_from(level);
    }

    // stdout carries frames and renderings.
    let settings = LogSettings { console: ConsoleTarget::Stderr, ..config.log.clone() };
    let _log = Logger::from_settings(env!("CARGO_BIN_NAME"), &settings)?;

    let ok = microdantic_cli::run(cli, &config)?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
