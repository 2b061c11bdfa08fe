//! CLI module for fieldmodel
//!
//! Provides command-line interface for:
//! - validate: Resolve stdin JSON lines against a model
//! - inspect: Show requiredness, defaults and aliases of a model
//! - list: List loaded models
//! - pitfall: Demonstrate shared explicit defaults

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    describe_model, inspect, list, pitfall, pitfall_report, run, run_command, validate,
    validate_value, Config,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_json, write_response};
