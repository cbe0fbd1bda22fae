use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cmd::Commands;

/// File-backed task tracker with a three-state workflow.
/// Data lives in ~/.cybertracker unless --data-dir or CYBERTRACKER_DIR says otherwise.
#[derive(Parser)]
#[command(name = "ct", version, about = "Team task tracker with category boards and PDF reports")]
pub struct Cli {
    /// Directory holding tasks.json, subcategories.json and config.toml.
    #[arg(long, global = true, env = "CYBERTRACKER_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
