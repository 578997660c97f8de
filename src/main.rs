//! # pom-tree CLI
//!
//! This is the binary entry point for the `pom-tree` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging from `--log-level`.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The core logic lives in the `pom_tree` library crate; the binary is a
//! thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
