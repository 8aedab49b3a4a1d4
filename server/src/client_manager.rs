//! Session registry and outbound delivery for connected clients
//!
//! This module tracks every open connection, whether or not it has
//! registered a player yet:
//! - Connection lifecycle (add on accept, remove when the worker exits)
//! - Capacity enforcement for the listener
//! - The binding between a connection and the player it registered
//! - Best-effort delivery to one session or to all of them
//!
//! Each session owns the sending half of an unbounded channel that is drained
//! by the connection's writer task. Delivery therefore never blocks and never
//! performs network I/O, so it is safe to call while the game lock is held.

use crate::game::PlayerId;
use log::{debug, info};
use shared::ServerMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// A single open connection
#[derive(Debug)]
pub struct Session {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Peer address, kept for logging
    pub addr: SocketAddr,
    /// Player registered through this connection, if any
    pub player: Option<(PlayerId, String)>,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Session {
    pub fn new(id: u32, addr: SocketAddr, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            addr,
            player: None,
            sender,
        }
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player.as_ref().map(|(id, _)| *id)
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player.as_ref().map(|(_, name)| name.as_str())
    }

    /// Queues a message for the writer task. Returns false once the writer
    /// is gone.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Registry of all open sessions
pub struct ClientManager {
    clients: HashMap<u32, Session>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns `None` when the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Session::new(client_id, addr, sender));
        Some(client_id)
    }

    /// Removes a connection, dropping the registry's handle on its writer.
    pub fn remove_client(&mut self, client_id: u32) -> Option<Session> {
        let session = self.clients.remove(&client_id)?;
        info!("Client {} disconnected", session.id);
        Some(session)
    }

    pub fn get(&self, client_id: u32) -> Option<&Session> {
        self.clients.get(&client_id)
    }

    /// Records the player registered through `client_id`
    pub fn bind_player(&mut self, client_id: u32, player_id: PlayerId, name: &str) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(session) => {
                session.player = Some((player_id, name.to_string()));
                true
            }
            None => false,
        }
    }

    pub fn client_for_player(&self, player_id: PlayerId) -> Option<u32> {
        self.clients
            .values()
            .find(|session| session.player_id() == Some(player_id))
            .map(|session| session.id)
    }

    pub fn send_to(&self, client_id: u32, message: ServerMessage) -> bool {
        match self.clients.get(&client_id) {
            Some(session) => {
                let delivered = session.send(message);
                if !delivered {
                    debug!("Dropped message for client {}: writer closed", client_id);
                }
                delivered
            }
            None => false,
        }
    }

    pub fn send_to_player(&self, player_id: PlayerId, message: ServerMessage) -> bool {
        match self.client_for_player(player_id) {
            Some(client_id) => self.send_to(client_id, message),
            None => false,
        }
    }

    /// Sends `message` to every session and returns how many accepted it.
    ///
    /// A session whose writer has gone away is skipped; its own worker
    /// notices the closed writer and unregisters it.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        for session in self.clients.values() {
            if session.send(message.clone()) {
                delivered += 1;
            } else {
                debug!("Skipped broadcast to client {}: writer closed", session.id);
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
