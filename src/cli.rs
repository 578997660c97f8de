//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::WriteStyle;

use crate::commands;

/// pom-tree - Inspect and edit multi-module pom.xml hierarchies
#[derive(Parser, Debug)]
#[command(name = "pom-tree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize log output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display the module tree of a project
    Tree(commands::tree::TreeArgs),

    /// Print the effective model of a descriptor
    Effective(commands::effective::EffectiveArgs),

    /// Set a property in a descriptor and save it in place
    SetProperty(commands::set_property::SetPropertyArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let write_style = match self.color.as_str() {
            "always" => WriteStyle::Always,
            "never" => WriteStyle::Never,
            _ => WriteStyle::Auto,
        };
        // A second initialization (e.g. in tests) is harmless.
        let _ = env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .write_style(write_style)
            .try_init();

        match self.command {
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Effective(args) => commands::effective::execute(args),
            Commands::SetProperty(args) => commands::set_property::execute(args),
        }
    }
}
