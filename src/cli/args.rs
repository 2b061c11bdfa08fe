//! CLI argument definitions using clap
//!
//! Commands:
//! - fieldmodel validate --config <path> --model <name>
//! - fieldmodel inspect --config <path> --model <name>
//! - fieldmodel list --config <path>
//! - fieldmodel pitfall

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fieldmodel - resolve defaults, optionality and aliases for data models
#[derive(Parser, Debug)]
#[command(name = "fieldmodel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate JSON objects read line by line from stdin
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./fieldmodel.json")]
        config: PathBuf,

        /// Model to validate against
        #[arg(long)]
        model: String,

        /// Report output keys by serialization alias (overrides config)
        #[arg(long)]
        by_alias: bool,
    },

    /// Show how each field of a model resolves
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = "./fieldmodel.json")]
        config: PathBuf,

        /// Model to inspect
        #[arg(long)]
        model: String,
    },

    /// List loaded models
    List {
        /// Path to configuration file
        #[arg(long, default_value = "./fieldmodel.json")]
        config: PathBuf,
    },

    /// Demonstrate a shared explicit default next to a per-instance factory
    Pitfall,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
