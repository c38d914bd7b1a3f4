//! # CLI Argument Definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mdantic")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Check schema documents and validate, hash or encode framed payloads")]
pub struct Cli {
    /// Configuration file (defaults to `mdantic.toml` in the working directory, if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a schema document and describe its models
    Check {
        /// Schema document (TOML, or JSON with a `.json` extension)
        schema: Option<PathBuf>,
    },
    /// Decode framed payloads and print each instance
    Validate(StreamArgs),
    /// Decode framed payloads and print each content hash
    Hash(StreamArgs),
    /// Build an instance and write its framed bytes to stdout
    Encode {
        schema: Option<PathBuf>,

        /// Model to construct
        #[arg(short, long)]
        model: String,

        /// Field assignment as `name=<json>`, repeatable
        #[arg(short, long = "set", value_name = "NAME=JSON", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
}

#[derive(Debug, Args)]
pub struct StreamArgs {
    pub schema: Option<PathBuf>,

    /// Decode every frame as this model instead of discriminating
    #[arg(short, long)]
    pub model: Option<String>,

    /// Read frames from a file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Largest accepted frame in bytes
    #[arg(long)]
    pub frame_limit: Option<usize>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_owned(), value.to_owned())),
        _ => Err(format!("expected NAME=JSON, got `{raw}`")),
    }
}
