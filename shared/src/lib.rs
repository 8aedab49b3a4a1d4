use serde::{Deserialize, Serialize};

pub mod codec;

pub const MAX_LEVEL: u8 = 15;
pub const CHOICES_PER_QUESTION: usize = 4;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_NAME_LEN: usize = 24;
pub const MAX_CHAT_LEN: usize = 280;

/// Requests sent by a client over its connection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Connect { name: String },
    Answer { choice: u8 },
    Stop,
    Chat { text: String },
}

/// Responses and pushes sent by the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Connected {
        welcome: String,
    },
    Error {
        reason: String,
    },
    GameStarted,
    Question {
        prompt: String,
        choices: [String; CHOICES_PER_QUESTION],
        level: u8,
        prize: u64,
    },
    Result {
        outcome: ResultKind,
        prize: u64,
        level: u8,
    },
    Standings {
        players: Vec<Standing>,
    },
    GameOver {
        winner: Option<String>,
        prize: u64,
    },
    Chat {
        sender: String,
        text: String,
    },
}

impl ServerMessage {
    pub fn error(reason: impl Into<String>) -> Self {
        ServerMessage::Error {
            reason: reason.into(),
        }
    }
}

/// Outcome reported in a `Result` message
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Correct,
    Incorrect,
    Stopped,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Active,
    Eliminated,
    Stopped,
}

impl PlayerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PlayerStatus::Active => "ACTIVE",
            PlayerStatus::Eliminated => "ELIMINATED",
            PlayerStatus::Stopped => "STOPPED",
        }
    }
}

/// One row of a standings snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub level: u8,
    pub prize: u64,
    pub status: PlayerStatus,
}
