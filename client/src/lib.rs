//! # Quiz Ladder Client Library
//!
//! This library provides the terminal client and the automated bots for the
//! multiplayer elimination quiz. Both speak the same length-prefixed bincode
//! protocol defined in the `shared` crate and mirror the server's pushes into
//! a local view of the game.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client never decides anything about
//! levels or prizes; it only sends requests (connect, answer, stop, chat) and
//! renders whatever the server pushes back.
//!
//! ### Interactive Play
//! Server pushes are read on their own task and forwarded over a channel, so
//! the main loop can wait on stdin and on the server at the same time without
//! ever abandoning a frame halfway through.
//!
//! ### Bots
//! A bot is a scripted player: for each question it waits a short random
//! delay, then stops or answers at random depending on its strategy. Many bots
//! can run from one process to fill a lobby.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Client-side view of the game rebuilt from server pushes:
//! - Current question and own level, prize and status
//! - Latest standings snapshot
//! - Final result once the game is over
//!
//! ### Input Module (`input`)
//! Parses terminal commands into protocol requests. Answers are typed 1-4
//! and sent as 0-3.
//!
//! ### Network Module (`network`)
//! Connection handling over TCP:
//! - Framed send and receive halves
//! - The interactive terminal loop
//!
//! ### Rendering Module (`rendering`)
//! Plain-text output: money with thousands separators, numbered choices and
//! an aligned standings table.
//!
//! ### Bot Module (`bot`)
//! Stop/answer strategies and the bot play loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::bot::{Bot, Strategy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A single conservative bot against a local server
//!     let report = Bot::new("bot_1", Strategy::Conservative)
//!         .run("127.0.0.1:12345")
//!         .await?;
//!
//!     println!("{} finished at level {} with {}", report.name, report.level, report.prize);
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
