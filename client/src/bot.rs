//! Automated players
//!
//! A bot plays through the same protocol as a person at the terminal. For
//! every question it waits a random "thinking" delay, then either stops or
//! picks a uniformly random answer depending on its strategy and the level.

use crate::game::ClientGameState;
use crate::network::Connection;
use clap::ValueEnum;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::codec::CodecError;
use shared::{ClientMessage, PlayerStatus, ServerMessage, CHOICES_PER_QUESTION};
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Occasionally stops once past level 3
    Random,
    /// Likely to stop past level 5, very likely past level 7
    Conservative,
    /// Only considers stopping past level 10
    Aggressive,
}

impl Strategy {
    /// Whether to stop instead of answering the question for `level`
    pub fn should_stop<R: Rng>(&self, level: u8, rng: &mut R) -> bool {
        match self {
            Strategy::Conservative => {
                (level > 5 && rng.gen_bool(0.7)) || (level > 7 && rng.gen_bool(0.9))
            }
            Strategy::Aggressive => level > 10 && rng.gen_bool(0.3),
            Strategy::Random => level > 3 && rng.gen_bool(0.1),
        }
    }

    pub fn decide<R: Rng>(&self, level: u8, rng: &mut R) -> ClientMessage {
        if self.should_stop(level, rng) {
            ClientMessage::Stop
        } else {
            ClientMessage::Answer {
                choice: rng.gen_range(0..CHOICES_PER_QUESTION as u8),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("server rejected the bot: {0}")]
    Rejected(String),
    #[error("server closed the connection")]
    Closed,
}

/// Where a bot ended up when it left the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReport {
    pub name: String,
    pub level: u8,
    pub prize: u64,
    pub status: PlayerStatus,
    pub won: bool,
}

pub struct Bot {
    strategy: Strategy,
    state: ClientGameState,
    think_time: (Duration, Duration),
    rng: StdRng,
}

impl Bot {
    pub fn new(name: &str, strategy: Strategy) -> Self {
        Self {
            strategy,
            state: ClientGameState::new(name),
            think_time: (Duration::from_secs(1), Duration::from_secs(3)),
            rng: StdRng::from_entropy(),
        }
    }

    /// Overrides the thinking delay range
    pub fn with_think_time(mut self, min: Duration, max: Duration) -> Self {
        self.think_time = (min, max);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn think_delay(&mut self) -> Duration {
        let (min, max) = self.think_time;
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Plays until the bot is eliminated, stops or the game ends.
    pub async fn run(mut self, server_addr: &str) -> Result<BotReport, BotError> {
        let name = self.state.name().to_string();
        let mut connection = Connection::connect(server_addr).await?;
        connection
            .send(&ClientMessage::Connect { name: name.clone() })
            .await?;

        while let Some(message) = connection.recv().await? {
            self.state.apply(&message);

            match &message {
                ServerMessage::Error { reason } if !self.state.connected => {
                    return Err(BotError::Rejected(reason.clone()));
                }
                ServerMessage::Error { reason } => warn!("[{}] {}", name, reason),
                ServerMessage::Question { level, prize, .. } => {
                    info!("[{}] Level {} for {}", name, level, prize);
                    tokio::time::sleep(self.think_delay()).await;

                    let reply = self.strategy.decide(*level, &mut self.rng);
                    match &reply {
                        ClientMessage::Stop => info!("[{}] Stopping with {}", name, self.state.prize),
                        ClientMessage::Answer { choice } => info!("[{}] Answering {}", name, choice + 1),
                        _ => {}
                    }
                    connection.send(&reply).await?;
                }
                _ => {}
            }

            if self.state.is_out() {
                let report = BotReport {
                    name,
                    level: self.state.level,
                    prize: self.state.prize,
                    status: self.state.status,
                    won: self.state.is_winner(),
                };
                info!(
                    "[{}] Done: level {} with {} ({})",
                    report.name,
                    report.level,
                    report.prize,
                    report.status.label()
                );
                return Ok(report);
            }
        }

        Err(BotError::Closed)
    }
}
