//! Terminal command parsing

use shared::{ClientMessage, CHOICES_PER_QUESTION};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  1-4            answer the current question
  s, stop        stop and keep your prize
  c, chat <text> send a chat message
  h, help        show this help
  q, quit        leave the game";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Zero-based choice index
    Answer(u8),
    Stop,
    Chat(String),
    Help,
    Quit,
}

impl Command {
    /// Message to send to the server, if the command has one
    pub fn into_message(self) -> Option<ClientMessage> {
        match self {
            Command::Answer(choice) => Some(ClientMessage::Answer { choice }),
            Command::Stop => Some(ClientMessage::Stop),
            Command::Chat(text) => Some(ClientMessage::Chat { text }),
            Command::Help | Command::Quit => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("answers go from 1 to {}", CHOICES_PER_QUESTION)]
    ChoiceOutOfRange,
    #[error("nothing to say")]
    EmptyChat,
    #[error("unknown command '{0}', type 'h' for help")]
    Unknown(String),
}

/// Parses one line typed by the player. Answers are typed 1-based.
pub fn parse_command(line: &str) -> Result<Command, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(InputError::Empty);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "s" | "stop" => Ok(Command::Stop),
        "h" | "help" => Ok(Command::Help),
        "q" | "quit" => Ok(Command::Quit),
        "c" | "chat" if rest.is_empty() => Err(InputError::EmptyChat),
        "c" | "chat" => Ok(Command::Chat(rest.to_string())),
        other => match other.parse::<usize>() {
            Ok(_) if !rest.is_empty() => Err(InputError::Unknown(line.to_string())),
            Ok(n) if (1..=CHOICES_PER_QUESTION).contains(&n) => Ok(Command::Answer((n - 1) as u8)),
            Ok(_) => Err(InputError::ChoiceOutOfRange),
            Err(_) => Err(InputError::Unknown(word.to_string())),
        },
    }
}
