use crate::{AppError, AppResult};

use set_sleuth_core::ListenMode;

use std::{panic::Location, str::FromStr};

use error_location::ErrorLocation;

/// Commands read from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start a cycle; `None` uses the configured mode.
    Begin(Option<ListenMode>),
    /// Finish the current recording early.
    Stop,
    /// Abandon the current cycle.
    Cancel,
    /// Start again after a result or failure.
    Retry,
    /// Close the continuous session.
    End,
    /// Print the current snapshot.
    Status,
    /// Tear down and exit.
    Quit,
}

impl FromStr for AppCommand {
    type Err = AppError;

    #[track_caller]
    fn from_str(line: &str) -> AppResult<Self> {
        let words: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        let command = match words.as_slice() {
            ["begin"] | ["listen"] => AppCommand::Begin(None),
            ["begin", "single"] | ["begin", "once"] => {
                AppCommand::Begin(Some(ListenMode::SingleShot))
            }
            ["begin", "continuous"] | ["begin", "loop"] => {
                AppCommand::Begin(Some(ListenMode::Continuous))
            }
            ["stop"] => AppCommand::Stop,
            ["cancel"] | ["close"] => AppCommand::Cancel,
            ["retry"] => AppCommand::Retry,
            ["end"] => AppCommand::End,
            ["status"] => AppCommand::Status,
            ["quit"] | ["exit"] => AppCommand::Quit,
            _ => {
                return Err(AppError::UnknownCommand {
                    input: line.trim().to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        Ok(command)
    }
}
