//! Authoritative game state for the elimination ladder
//!
//! `GameState` is a plain struct with no locking of its own. The network layer
//! keeps exactly one instance behind a single mutex, so every method here runs
//! atomically with respect to every other connection.

use crate::questions::{Question, QuestionProvider};
use log::{debug, info, warn};
use shared::{PlayerStatus, Standing, CHOICES_PER_QUESTION, MAX_LEVEL, MAX_NAME_LEN, MIN_PLAYERS};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub type PlayerId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Highest level answered correctly, 0 before the first answer
    pub level: u8,
    /// Banked prize
    pub prize: u64,
    pub eliminated: bool,
    pub stopped: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            level: 0,
            prize: 0,
            eliminated: false,
            stopped: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.eliminated && !self.stopped
    }

    pub fn status(&self) -> PlayerStatus {
        if self.eliminated {
            PlayerStatus::Eliminated
        } else if self.stopped {
            PlayerStatus::Stopped
        } else {
            PlayerStatus::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub name: String,
    pub prize: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GamePhase {
    NotStarted,
    InProgress,
    Finished { winner: Option<Winner> },
}

/// Returned by the operation that finished the game, and only by that one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    pub winner: Option<Winner>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("the name '{0}' is already taken")]
    AlreadyRegistered(String),
    #[error("names must be between 1 and {} characters", MAX_NAME_LEN)]
    InvalidName,
    #[error("unknown player")]
    PlayerNotFound,
    #[error("there is no question waiting for your answer")]
    NoPendingQuestion,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("the game is already over")]
    GameFinished,
    #[error("choice {0} is not one of the {} alternatives", CHOICES_PER_QUESTION)]
    InvalidChoice(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: PlayerId,
    /// First question for a player joining a game already in progress
    pub question: Option<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub level: u8,
    pub prize: u64,
    pub game_over: Option<GameOver>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub level: u8,
    pub prize: u64,
    pub game_over: Option<GameOver>,
}

pub struct GameState {
    /// Registered players in registration order
    players: Vec<Player>,
    pending: HashMap<PlayerId, Question>,
    phase: GamePhase,
    provider: Arc<dyn QuestionProvider>,
    next_player_id: PlayerId,
}

impl GameState {
    pub fn new(provider: Arc<dyn QuestionProvider>) -> Self {
        Self {
            players: Vec::new(),
            pending: HashMap::new(),
            phase: GamePhase::NotStarted,
            provider,
            next_player_id: 1,
        }
    }

    /// Adds a player at level 0 with nothing banked.
    ///
    /// A player joining while the game is in progress is handed a level-1
    /// question straight away.
    pub fn register(&mut self, name: &str) -> Result<Registration, GameError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(GameError::InvalidName);
        }
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(GameError::AlreadyRegistered(name.to_string()));
        }

        let id = self.next_player_id;
        self.next_player_id += 1;
        self.players.push(Player::new(id, name.to_string()));
        info!(
            "Registered player {} as '{}' ({} registered)",
            id,
            name,
            self.players.len()
        );

        let question = if self.phase == GamePhase::InProgress {
            self.assign_next_question(id)?
        } else {
            None
        };

        Ok(Registration { id, question })
    }

    /// Removes a player and any question they were holding.
    ///
    /// Does not re-evaluate the end of the game and never touches a winner
    /// that was already recorded.
    pub fn unregister(&mut self, id: PlayerId) -> Option<Player> {
        self.pending.remove(&id);
        let index = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(index);
        info!(
            "Unregistered player {} '{}' ({} registered)",
            id,
            player.name,
            self.players.len()
        );
        Some(player)
    }

    /// Starts the game once enough players are registered.
    ///
    /// Returns the opening question of every player, or `None` when the game
    /// already started or the lobby is still too small.
    pub fn maybe_start(&mut self) -> Option<Vec<(PlayerId, Question)>> {
        if self.phase != GamePhase::NotStarted || self.players.len() < MIN_PLAYERS {
            return None;
        }

        self.phase = GamePhase::InProgress;
        info!("Game started with {} players", self.players.len());

        let ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        let mut questions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(question) = self.draw_question(id, 1) {
                questions.push((id, question));
            }
        }
        Some(questions)
    }

    /// Records and returns the question for the player's next level.
    ///
    /// `Ok(None)` means the player has already climbed the whole ladder.
    pub fn assign_next_question(&mut self, id: PlayerId) -> Result<Option<Question>, GameError> {
        let index = self.ensure_in_play(id)?;
        let next_level = self.players[index].level + 1;
        if next_level > MAX_LEVEL {
            return Ok(None);
        }
        Ok(self.draw_question(id, next_level))
    }

    pub fn apply_answer(&mut self, id: PlayerId, choice: u8) -> Result<AnswerOutcome, GameError> {
        if choice as usize >= CHOICES_PER_QUESTION {
            return Err(GameError::InvalidChoice(choice));
        }
        let index = self.ensure_in_play(id)?;
        let question = self
            .pending
            .remove(&id)
            .ok_or(GameError::NoPendingQuestion)?;

        let correct = question.is_correct(choice);
        let player = &mut self.players[index];
        if correct {
            player.level += 1;
            player.prize = question.prize;
            debug!(
                "Player '{}' answered level {} correctly",
                player.name, player.level
            );
        } else {
            player.eliminated = true;
            player.prize = 0;
            info!(
                "Player '{}' eliminated at level {}",
                player.name,
                player.level + 1
            );
        }

        let (level, prize) = (player.level, player.prize);
        let game_over = if correct && level >= MAX_LEVEL {
            let winner = Winner {
                name: player.name.clone(),
                prize,
            };
            Some(self.finish(Some(winner)))
        } else {
            self.evaluate_end()
        };

        Ok(AnswerOutcome {
            correct,
            level,
            prize,
            game_over,
        })
    }

    /// Takes the player out of play with their banked prize.
    pub fn apply_stop(&mut self, id: PlayerId) -> Result<StopOutcome, GameError> {
        let index = self.ensure_in_play(id)?;
        self.pending.remove(&id);

        let player = &mut self.players[index];
        player.stopped = true;
        info!(
            "Player '{}' stopped at level {} with {}",
            player.name, player.level, player.prize
        );

        let (level, prize) = (player.level, player.prize);
        let game_over = self.evaluate_end();

        Ok(StopOutcome {
            level,
            prize,
            game_over,
        })
    }

    pub fn snapshot_standings(&self) -> Vec<Standing> {
        self.players
            .iter()
            .map(|p| Standing {
                name: p.name.clone(),
                level: p.level,
                prize: p.prize,
                status: p.status(),
            })
            .collect()
    }

    pub fn phase(&self) -> &GamePhase {
        &self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != GamePhase::NotStarted
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    pub fn winner(&self) -> Option<&Winner> {
        match &self.phase {
            GamePhase::Finished { winner } => winner.as_ref(),
            _ => None,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active()).count()
    }

    pub fn pending_question(&self, id: PlayerId) -> Option<&Question> {
        self.pending.get(&id)
    }

    /// Checks the preconditions shared by answer, stop and question
    /// assignment, returning the player's index.
    fn ensure_in_play(&self, id: PlayerId) -> Result<usize, GameError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound)?;

        if self.phase == GamePhase::NotStarted {
            return Err(GameError::InvalidState("the game has not started yet"));
        }
        if !self.players[index].is_active() {
            return Err(GameError::InvalidState("you are no longer in play"));
        }
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        Ok(index)
    }

    fn draw_question(&mut self, id: PlayerId, level: u8) -> Option<Question> {
        match self.provider.question_for_level(level) {
            Some(question) => {
                self.pending.insert(id, question.clone());
                Some(question)
            }
            None => {
                warn!("Question provider has nothing for level {}", level);
                None
            }
        }
    }

    /// Zero active players ends the game without a winner, exactly one
    /// active player ends it with that player as winner.
    fn evaluate_end(&mut self) -> Option<GameOver> {
        if self.is_finished() {
            return None;
        }

        let mut active = self.players.iter().filter(|p| p.is_active());
        let winner = match (active.next(), active.next()) {
            (None, _) => Some(None),
            (Some(last), None) => Some(Some(Winner {
                name: last.name.clone(),
                prize: last.prize,
            })),
            _ => None,
        };
        winner.map(|winner| self.finish(winner))
    }

    fn finish(&mut self, winner: Option<Winner>) -> GameOver {
        match &winner {
            Some(w) => info!("Game finished: '{}' wins with {}", w.name, w.prize),
            None => info!("Game finished without a winner"),
        }
        self.pending.clear();
        self.phase = GamePhase::Finished {
            winner: winner.clone(),
        };
        GameOver { winner }
    }
}
