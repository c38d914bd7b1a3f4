//! # mdantic
//!
//! Host-side companion for devices that exchange microdantic frames: it checks a
//! schema document, then validates, hashes or encodes line-framed payloads against it.
//!
//! ```text
//! mdantic check garden.toml
//! mdantic validate garden.toml --input capture.ndjson
//! mdantic hash garden.toml --model Fruit < capture.ndjson
//! mdantic encode garden.toml --model Fruit --set name='"apple"' --set quantity=3
//! ```

pub mod args;
pub mod commands;
pub mod config;

use crate::args::{Cli, Command, StreamArgs};
use crate::commands::FrameAction;
use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Runs a parsed command line. `Ok(false)` means some frame was rejected.
pub fn run(cli: Cli, config: &CliConfig) -> Result<bool> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let ok = match cli.command {
        Command::Check { schema } => {
            let registry = commands::load_registry(&schema_path(schema, config)?)?;
            commands::check(&registry, &mut out)?;
            true
        },
        Command::Validate(args) => stream(args, config, FrameAction::Render, &mut out)?,
        Command::Hash(args) => stream(args, config, FrameAction::Hash, &mut out)?,
        Command::Encode { schema, model, set } => {
            let registry = commands::load_registry(&schema_path(schema, config)?)?;
            commands::encode(&registry, &model, &set, &mut out)?;
            true
        },
    };

    out.flush()?;
    Ok(ok)
}

fn stream(args: StreamArgs, config: &CliConfig, action: FrameAction, out: &mut impl Write) -> Result<bool> {
    let registry = commands::load_registry(&schema_path(args.schema, config)?)?;
    let limit = args.frame_limit.unwrap_or(config.frame_limit);
    let input = open_input(args.input.as_deref())?;

    commands::process_frames(&registry, args.model.as_deref(), limit, action, input, out, &mut io::stderr().lock())
}

fn schema_path(schema: Option<PathBuf>, config: &CliConfig) -> Result<PathBuf> {
    match schema.or_else(|| config.schema.clone()) {
        Some(path) => Ok(path),
        None => bail!("No schema document given and none configured (set `schema` in mdantic.toml)"),
    }
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(file))
        },
        None => Ok(Box::new(io::stdin().lock())),
    }
}
