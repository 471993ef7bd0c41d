//! Terminal command parsing.
//!
//! Each stdin line is one command:
//!
//! - a JSON `BotEvent`, e.g. `{"offline":"dropped"}` or `"relogin"`;
//! - `captcha <path>` to raise a picture challenge with the image at `path`;
//! - `answer <text>` to answer the pending challenge;
//! - `logs` to print the log buffer;
//! - `quit` to end the session.

use bot_console_core::BotEvent;
use std::path::PathBuf;
use thiserror::Error;

/// A parsed terminal command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Feed a lifecycle event to the session.
    Event(BotEvent),
    /// Raise a picture captcha from an image file.
    Captcha(PathBuf),
    /// Answer the pending captcha.
    Answer(String),
    /// Print the log buffer.
    Logs,
    /// End the session.
    Quit,
    /// Blank line.
    Empty,
}

/// Errors of command parsing
#[derive(Debug, Error)]
pub enum CommandError {
    /// The line looked like JSON but is not a valid event.
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),
    /// A command was given without its required argument.
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    /// Nothing matched.
    #[error("unknown command: {0}")]
    Unknown(String),
}

/// Parse one stdin line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if line.starts_with('{') || line.starts_with('"') {
        return Ok(Command::Event(serde_json::from_str(line)?));
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    match word {
        "captcha" if rest.is_empty() => Err(CommandError::MissingArgument("captcha")),
        "captcha" => Ok(Command::Captcha(PathBuf::from(rest))),
        "answer" if rest.is_empty() => Err(CommandError::MissingArgument("answer")),
        "answer" => Ok(Command::Answer(rest.to_string())),
        "logs" => Ok(Command::Logs),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}
