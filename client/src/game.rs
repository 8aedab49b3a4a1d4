//! Client-side view of the game, rebuilt from server pushes
//!
//! The server is authoritative; this state only mirrors what it has been
//! told so the terminal and the bots know what to show and whether the
//! player can still act.

use shared::{PlayerStatus, ResultKind, ServerMessage, Standing, CHOICES_PER_QUESTION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub prompt: String,
    pub choices: [String; CHOICES_PER_QUESTION],
    pub level: u8,
    pub prize: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalResult {
    pub winner: Option<String>,
    pub prize: u64,
}

#[derive(Debug, Clone)]
pub struct ClientGameState {
    name: String,
    pub connected: bool,
    pub started: bool,
    pub question: Option<CurrentQuestion>,
    /// Highest level answered correctly
    pub level: u8,
    pub prize: u64,
    pub status: PlayerStatus,
    pub standings: Vec<Standing>,
    pub final_result: Option<FinalResult>,
}

impl ClientGameState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            connected: false,
            started: false,
            question: None,
            level: 0,
            prize: 0,
            status: PlayerStatus::Active,
            standings: Vec::new(),
            final_result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Connected { .. } => self.connected = true,
            ServerMessage::GameStarted => self.started = true,
            ServerMessage::Question {
                prompt,
                choices,
                level,
                prize,
            } => {
                // A late joiner never sees GameStarted
                self.started = true;
                self.question = Some(CurrentQuestion {
                    prompt: prompt.clone(),
                    choices: choices.clone(),
                    level: *level,
                    prize: *prize,
                });
            }
            ServerMessage::Result {
                outcome,
                prize,
                level,
            } => {
                self.question = None;
                self.level = *level;
                self.prize = *prize;
                self.status = match outcome {
                    ResultKind::Correct => PlayerStatus::Active,
                    ResultKind::Incorrect => PlayerStatus::Eliminated,
                    ResultKind::Stopped => PlayerStatus::Stopped,
                };
            }
            ServerMessage::Standings { players } => self.standings = players.clone(),
            ServerMessage::GameOver { winner, prize } => {
                self.question = None;
                self.final_result = Some(FinalResult {
                    winner: winner.clone(),
                    prize: *prize,
                });
            }
            ServerMessage::Error { .. } | ServerMessage::Chat { .. } => {}
        }
    }

    pub fn is_finished(&self) -> bool {
        self.final_result.is_some()
    }

    /// True once this player can no longer act: out of play or game over
    pub fn is_out(&self) -> bool {
        self.is_finished() || self.status != PlayerStatus::Active
    }

    pub fn is_winner(&self) -> bool {
        matches!(
            &self.final_result,
            Some(FinalResult { winner: Some(winner), .. }) if *winner == self.name
        )
    }
}
