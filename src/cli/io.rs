//! JSON I/O handling for CLI
//!
//! - Input: one JSON object per stdin line
//! - Output: one JSON object per stdout line
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read JSON requests from stdin, one per non-empty line
pub fn read_requests() -> impl Iterator<Item = CliResult<Value>> {
    parse_lines(io::stdin().lock())
}

fn parse_lines<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<Value>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str(&line).map_err(CliError::from)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&serde_json::json!({
        "status": "ok",
        "data": data
    }))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_json(&serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    }))
}

/// Write a JSON value as one stdout line
pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
