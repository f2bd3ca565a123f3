use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use super::periods::PeriodWindow;
use super::types::{LoadOptions, Period};

/// Stdout ceiling for spawned reporting commands (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;
const COMMAND_TIMEOUT_SECS: u64 = 120;

const CCUSAGE_SPEC: &str = "ccusage@18.0.5";
const OPENCODE_CCUSAGE_SPEC: &str = "@ccusage/opencode@18.0.5";

/// Failure modes of one external report invocation. The loader absorbs
/// these into the response's `errors` list; they never cross the HTTP
/// boundary as exceptions.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("'{command}' timed out after 120s")]
    TimedOut { command: String },
    #[error("'{command}' produced more than 10 MiB of output")]
    OutputTooLarge { command: String },
    #[error("'{command}' produced output that is not valid JSON: {source}")]
    InvalidJson {
        command: String,
        source: serde_json::Error,
    },
}

/// Build the `ccusage` invocation for a claude report.
///
/// Blocks reports take `--recent` instead of window bounds (the tool handles
/// recency itself); every optional flag is emitted only when the caller
/// supplied it.
pub fn claude_command(period: Period, window: &PeriodWindow, options: &LoadOptions) -> Vec<String> {
    let mut args: Vec<String> = ["bunx", CCUSAGE_SPEC, period.as_str(), "--json", "--offline"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if period == Period::Blocks {
        args.push("--recent".to_string());
        return args;
    }

    args.push("--since".to_string());
    args.push(window.since.clone());
    args.push("--until".to_string());
    args.push(window.until.clone());

    if let Some(mode) = options.mode {
        args.push("--mode".to_string());
        args.push(mode.as_str().to_string());
    }
    if let Some(timezone) = &options.timezone {
        args.push("--timezone".to_string());
        args.push(timezone.clone());
    }
    if let Some(start_of_week) = &options.start_of_week {
        if period == Period::Weekly {
            args.push("--start-of-week".to_string());
            args.push(start_of_week.clone());
        }
    }
    if options.breakdown {
        args.push("--breakdown".to_string());
    }

    args
}

/// Build the `@ccusage/opencode` invocation. The opencode CLI takes no date
/// bounds; filtering happens in-process afterwards.
pub fn opencode_command(period: Period) -> Vec<String> {
    ["bunx", OPENCODE_CCUSAGE_SPEC, period.as_str(), "--json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Spawn a reporting command and parse its stdout as JSON.
///
/// `extra_env` is layered on top of `LOG_LEVEL=0`, which is always set so
/// upstream CLIs keep their progress chatter off stdout.
pub async fn run_json_command(
    args: &[String],
    extra_env: &[(&str, &str)],
) -> Result<Value, InvocationError> {
    let command_line = args.join(" ");
    let (program, rest) = args.split_first().ok_or_else(|| InvocationError::Spawn {
        command: command_line.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;

    let mut command = Command::new(program);
    command
        .args(rest)
        .env("LOG_LEVEL", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in extra_env {
        command.env(key, value);
    }

    let output = tokio::time::timeout(
        Duration::from_secs(COMMAND_TIMEOUT_SECS),
        command.output(),
    )
    .await
    .map_err(|_| InvocationError::TimedOut {
        command: command_line.clone(),
    })?
    .map_err(|source| InvocationError::Spawn {
        command: command_line.clone(),
        source,
    })?;

    if output.stdout.len() > MAX_OUTPUT_BYTES {
        return Err(InvocationError::OutputTooLarge {
            command: command_line,
        });
    }
    if !output.status.success() {
        return Err(InvocationError::CommandFailed {
            command: command_line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_json_stdout(&command_line, &String::from_utf8_lossy(&output.stdout))
}

/// Parse command stdout, tolerating leading non-JSON noise: parsing starts at
/// the first line that opens a JSON object, falling back to treating the whole
/// stream as one blob when no such line exists.
pub fn parse_json_stdout(command: &str, stdout: &str) -> Result<Value, InvocationError> {
    let mut offset = 0;
    for line in stdout.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            return serde_json::from_str(&stdout[offset..]).map_err(|source| {
                InvocationError::InvalidJson {
                    command: command.to_string(),
                    source,
                }
            });
        }
        offset += line.len();
    }

    serde_json::from_str(stdout).map_err(|source| InvocationError::InvalidJson {
        command: command.to_string(),
        source,
    })
}
