//! # Quiz Ladder Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! elimination quiz. Players climb a fifteen-level ladder of questions, each
//! level worth a larger prize. A wrong answer eliminates the player and wipes
//! their prize, a stop banks whatever they have, and the game ends when at
//! most one player is left in play or somebody clears the final level.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Game State
//! All decisions about levels, prizes, eliminations and the winner are made
//! here. Clients only ever see what the server pushes to them.
//!
//! ### Session Management
//! Handles the lifecycle of every connection:
//! - Capacity checks on accept
//! - Binding a connection to the player it registers
//! - Unregistering the player when the connection closes for any reason
//!
//! ### Notification
//! Targeted messages (questions, results, errors) go to a single connection.
//! Standings, chat and game-over announcements go to every connection.
//!
//! ## Architecture Design
//!
//! ### One Task Per Connection
//! Each connection is served by its own reader task and writer task. Requests
//! from one connection are handled strictly in arrival order; requests from
//! different connections interleave freely.
//!
//! ### Single Coarse Lock
//! The game state and the session registry live together in one
//! [`lobby::Lobby`] behind a single `tokio::sync::Mutex`. Each request is
//! applied atomically, and standings snapshots are taken under the same lock
//! so they never observe a half-applied update. No socket I/O happens while
//! the lock is held; outbound messages are queued on per-session channels.
//!
//! ### Length-Prefixed Framing
//! Messages travel over TCP as bincode payloads behind a 4-byte length
//! header (see [`shared::codec`]). A frame that fails to decode is answered
//! with an error and the connection stays open.
//!
//! ## Module Organization
//!
//! ### Questions Module (`questions`)
//! The prize ladder and the question provider: bundled trivia pool, text file
//! loader and random selection per level.
//!
//! ### Game Module (`game`)
//! The game coordinator: registration, start, question assignment, answers,
//! stops, end-of-game detection and standings snapshots.
//!
//! ### Client Manager Module (`client_manager`)
//! Registry of open connections and best-effort delivery to one or all of
//! them.
//!
//! ### Lobby Module (`lobby`)
//! Routes each decoded request to the coordinator and turns the outcome into
//! the messages each connection should receive.
//!
//! ### Network Module (`network`)
//! TCP accept loop, per-connection workers and graceful shutdown.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::questions::QuestionBank;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Accept up to 32 connections using the bundled question pool
//!     let server = Server::bind("127.0.0.1:12345", 32, Arc::new(QuestionBank::builtin())).await?;
//!
//!     // Serve until Ctrl+C, then close every connection
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod lobby;
pub mod network;
pub mod questions;
