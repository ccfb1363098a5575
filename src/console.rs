//! Operator console
//!
//! Reads administrative commands from standard input, one per line:
//!
//! - `t` logs the current timestamp
//! - `l <level>` changes the log level (name or 0-8)
//! - `d <channel>` dumps a channel's members
//! - `q` or `e` shuts the server down
//!
//! The console only touches logging and process lifetime; it reads the
//! registry but never changes it.

use log::{LevelFilter, debug, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::channel::ChannelRegistry;
use crate::config::SharedRuntimeConfig;
use crate::utils::logging::{parse_level, set_level};

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Timestamp,
    /// `None` when the requested level is not recognized.
    SetLogLevel(Option<LevelFilter>),
    /// `None` when the channel argument is missing or not a number.
    Dump(Option<usize>),
    Quit,
    Invalid(String),
}

/// Why the console stopped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    InputClosed,
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_console_command(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let arg = parts.next();

    let command = match cmd {
        "t" => ConsoleCommand::Timestamp,
        "l" => ConsoleCommand::SetLogLevel(arg.and_then(parse_level)),
        "d" => ConsoleCommand::Dump(arg.and_then(|a| a.parse().ok())),
        "q" | "e" => ConsoleCommand::Quit,
        other => ConsoleCommand::Invalid(other.to_string()),
    };
    Some(command)
}

/// Runs the console until a quit command or the end of input.
///
/// An invalid log level resets verbosity to `default_level`.
pub async fn run_console<R>(
    input: R,
    registry: Arc<ChannelRegistry>,
    runtime: SharedRuntimeConfig,
    default_level: LevelFilter,
) -> ConsoleExit
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        debug!("Waiting for command...");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Console input closed");
                return ConsoleExit::InputClosed;
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                return ConsoleExit::InputClosed;
            }
        };

        let Some(command) = parse_console_command(&line) else {
            continue;
        };

        match command {
            ConsoleCommand::Timestamp => {
                info!(
                    "Timestamp: {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                );
            }
            ConsoleCommand::SetLogLevel(level) => {
                let level = level.unwrap_or_else(|| {
                    warn!("Invalid log level!");
                    default_level
                });
                set_level(level);
                runtime.write().await.log_level = level.to_string().to_lowercase();
                info!("Log level changed to {}", level);
            }
            ConsoleCommand::Dump(Some(channel)) => {
                // Out-of-range channels are reported by the registry.
                let _ = registry.dump(channel).await;
            }
            ConsoleCommand::Dump(None) => warn!("Invalid channel to dump"),
            ConsoleCommand::Quit => {
                info!("Shutting down!");
                return ConsoleExit::Quit;
            }
            ConsoleCommand::Invalid(cmd) => warn!("Invalid command: {}", cmd),
        }
    }
}
