use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use extframe_protocol::ExportKind;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod download;
pub mod serve;
pub mod upload;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the protocol over an in-memory store until Ctrl-C.
    Serve(ServeArgs),
    /// Upload one partition from a JSON rows file.
    Upload(UploadArgs),
    /// Download one partition and print its cells.
    Download(DownloadArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Upload(args) => upload::run(args, format),
        Command::Download(args) => download::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (port 0 picks a free port).
    #[arg(env = "EXTFRAME_ADDR", default_value = "127.0.0.1:54321")]
    pub addr: String,
    /// Expect two reserved bytes before each request type.
    #[arg(long)]
    pub legacy_envelope: bool,
    /// Per-connection read timeout (e.g. 30s, 500ms).
    #[arg(long)]
    pub read_timeout: Option<String>,
    /// Per-connection write timeout (e.g. 30s, 500ms).
    #[arg(long)]
    pub write_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Server address.
    #[arg(env = "EXTFRAME_ADDR")]
    pub addr: String,
    /// Target dataset name.
    #[arg(long)]
    pub dataset: String,
    /// Target partition id.
    #[arg(long)]
    pub partition: i32,
    /// JSON file: {"columns": ["num", "str", ...], "rows": [[...], ...]}.
    #[arg(long)]
    pub file: PathBuf,
    /// Send two reserved bytes before the request type.
    #[arg(long)]
    pub legacy_envelope: bool,
    /// Socket timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Server address.
    #[arg(env = "EXTFRAME_ADDR")]
    pub addr: String,
    /// Dataset name.
    #[arg(long)]
    pub dataset: String,
    /// Partition id.
    #[arg(long)]
    pub partition: i32,
    /// Payload kind of each column (comma-separated: str, int, real).
    #[arg(long, value_delimiter = ',', required = true)]
    pub columns: Vec<ExportKind>,
    /// Send two reserved bytes before the request type.
    #[arg(long)]
    pub legacy_envelope: bool,
    /// Socket timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "30s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0ms").unwrap_err().code, USAGE);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
