//! Applies decoded client requests to the game and fans out the results
//!
//! A `Lobby` pairs the game state with the session registry so that one lock
//! covers both. Every method runs to completion without awaiting, which keeps
//! network I/O out of the critical section: outbound messages are only queued
//! on the per-session channels.

use crate::client_manager::ClientManager;
use crate::game::{GameError, GameOver, GameState, PlayerId};
use crate::questions::QuestionProvider;
use log::{debug, info};
use shared::{ClientMessage, ResultKind, ServerMessage, MAX_CHAT_LEN};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
enum RequestError {
    #[error("not connected")]
    NotConnected,
    #[error("already connected as '{0}'")]
    AlreadyConnected(String),
    #[error("chat messages cannot be empty")]
    EmptyChat,
    #[error(transparent)]
    Game(#[from] GameError),
}

pub struct Lobby {
    game: GameState,
    clients: ClientManager,
}

impl Lobby {
    pub fn new(provider: Arc<dyn QuestionProvider>, max_clients: usize) -> Self {
        Self {
            game: GameState::new(provider),
            clients: ClientManager::new(max_clients),
        }
    }

    /// Registers a fresh connection. Returns `None` when the server is full.
    pub fn open_session(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Option<u32> {
        self.clients.add_client(addr, sender)
    }

    /// Handles one request from `client_id`.
    ///
    /// Rejected requests are answered with an `Error` sent to that client
    /// only; nothing else changes.
    pub fn handle(&mut self, client_id: u32, message: ClientMessage) {
        let result = match message {
            ClientMessage::Connect { name } => self.connect(client_id, &name),
            ClientMessage::Answer { choice } => self.answer(client_id, choice),
            ClientMessage::Stop => self.stop(client_id),
            ClientMessage::Chat { text } => self.chat(client_id, &text),
        };

        if let Err(e) = result {
            debug!("Rejected request from client {}: {}", client_id, e);
            self.clients
                .send_to(client_id, ServerMessage::error(e.to_string()));
        }
    }

    pub fn reject_malformed(&self, client_id: u32, reason: &str) {
        debug!("Malformed message from client {}: {}", client_id, reason);
        self.clients.send_to(
            client_id,
            ServerMessage::error(format!("malformed message: {}", reason)),
        );
    }

    /// Tears down a connection and unregisters its player.
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub fn disconnect(&mut self, client_id: u32) {
        let Some(session) = self.clients.remove_client(client_id) else {
            return;
        };

        if let Some(player_id) = session.player_id() {
            if self.game.unregister(player_id).is_some() {
                self.broadcast_standings();
            }
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    fn connect(&mut self, client_id: u32, name: &str) -> Result<(), RequestError> {
        let session = self
            .clients
            .get(client_id)
            .ok_or(RequestError::NotConnected)?;
        if let Some(existing) = session.player_name() {
            return Err(RequestError::AlreadyConnected(existing.to_string()));
        }

        let registration = self.game.register(name)?;
        let name = name.trim();
        self.clients.bind_player(client_id, registration.id, name);

        let welcome = if self.game.is_started() {
            format!("Welcome, {}! A game is in progress, you start at level 1.", name)
        } else {
            format!("Welcome, {}! Waiting for more players to join.", name)
        };
        self.clients
            .send_to(client_id, ServerMessage::Connected { welcome });

        if let Some(question) = registration.question {
            self.clients.send_to(client_id, question.to_message());
        }
        self.broadcast_standings();

        if let Some(opening) = self.game.maybe_start() {
            self.clients.broadcast(&ServerMessage::GameStarted);
            for (player_id, question) in opening {
                self.clients
                    .send_to_player(player_id, question.to_message());
            }
            self.broadcast_standings();
        }
        Ok(())
    }

    fn answer(&mut self, client_id: u32, choice: u8) -> Result<(), RequestError> {
        let player_id = self.player_of(client_id)?;
        let outcome = self.game.apply_answer(player_id, choice)?;

        let kind = if outcome.correct {
            ResultKind::Correct
        } else {
            ResultKind::Incorrect
        };
        self.clients.send_to(
            client_id,
            ServerMessage::Result {
                outcome: kind,
                prize: outcome.prize,
                level: outcome.level,
            },
        );
        self.broadcast_standings();

        match outcome.game_over {
            Some(game_over) => self.announce_game_over(game_over),
            None if outcome.correct => {
                if let Some(question) = self.game.assign_next_question(player_id)? {
                    self.clients.send_to(client_id, question.to_message());
                }
            }
            None => {}
        }
        Ok(())
    }

    fn stop(&mut self, client_id: u32) -> Result<(), RequestError> {
        let player_id = self.player_of(client_id)?;
        let outcome = self.game.apply_stop(player_id)?;

        self.clients.send_to(
            client_id,
            ServerMessage::Result {
                outcome: ResultKind::Stopped,
                prize: outcome.prize,
                level: outcome.level,
            },
        );
        self.broadcast_standings();

        if let Some(game_over) = outcome.game_over {
            self.announce_game_over(game_over);
        }
        Ok(())
    }

    fn chat(&mut self, client_id: u32, text: &str) -> Result<(), RequestError> {
        let sender = self
            .clients
            .get(client_id)
            .and_then(|session| session.player_name())
            .ok_or(RequestError::NotConnected)?
            .to_string();

        let text = text.trim();
        if text.is_empty() {
            return Err(RequestError::EmptyChat);
        }
        let text: String = text.chars().take(MAX_CHAT_LEN).collect();

        self.clients.broadcast(&ServerMessage::Chat { sender, text });
        Ok(())
    }

    fn player_of(&self, client_id: u32) -> Result<PlayerId, RequestError> {
        self.clients
            .get(client_id)
            .and_then(|session| session.player_id())
            .ok_or(RequestError::NotConnected)
    }

    fn broadcast_standings(&self) {
        let players = self.game.snapshot_standings();
        self.clients.broadcast(&ServerMessage::Standings { players });
    }

    fn announce_game_over(&self, game_over: GameOver) {
        let (winner, prize) = match game_over.winner {
            Some(winner) => (Some(winner.name), winner.prize),
            None => (None, 0),
        };
        info!("Announcing game over to {} sessions", self.clients.len());
        self.clients
            .broadcast(&ServerMessage::GameOver { winner, prize });
    }
}
