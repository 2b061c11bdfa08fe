//! fieldmodel CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, prints errors to stderr
//! and exits non-zero on failure. All logic lives in `cli`.

use fieldmodel::cli;
use fieldmodel::observability::{log_event_with_fields, Event};

fn main() {
    if let Err(e) = cli::run() {
        log_event_with_fields(
            Event::CommandFailed,
            &[("code", e.code_str()), ("message", e.message())],
        );
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
