//! Server network layer: TCP accept loop, per-connection workers and shutdown
//!
//! Every accepted connection gets one worker task that reads frames in order
//! and applies them to the shared [`Lobby`] under a single mutex, plus one
//! writer task that drains the session's outbound queue onto the socket.
//! The lock is never held across socket I/O.

use crate::lobby::Lobby;
use crate::questions::QuestionProvider;
use log::{debug, error, info, warn};
use shared::codec::{read_message, write_message, Inbound};
use shared::{ClientMessage, ServerMessage};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;

/// How long a closing connection may spend flushing queued messages
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Main server owning the listening socket and the shared lobby
pub struct Server {
    listener: TcpListener,
    lobby: Arc<Mutex<Lobby>>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        max_clients: usize,
        provider: Arc<dyn QuestionProvider>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            lobby: Arc::new(Mutex::new(Lobby::new(provider, max_clients))),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lobby(&self) -> Arc<Mutex<Lobby>> {
        Arc::clone(&self.lobby)
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// On shutdown the listener stops accepting, every open connection is
    /// closed (which runs each worker's own unregister path) and the
    /// listening socket is released once all workers have exited.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let mut workers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let lobby = Arc::clone(&self.lobby);
                        let shutdown_rx = shutdown_tx.subscribe();
                        workers.spawn(handle_connection(stream, addr, lobby, shutdown_rx));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection worker failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutting down, closing {} connections", workers.len());
                    break;
                }
            }
        }

        let _ = shutdown_tx.send(());
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Connection worker failed during shutdown: {}", e);
            }
        }

        drop(self.listener);
        info!("Server stopped");
    }
}

/// Drives one connection from accept to unregister
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    lobby: Arc<Mutex<Lobby>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();

    let client_id = lobby.lock().await.open_session(addr, tx);
    let Some(client_id) = client_id else {
        warn!("Rejecting connection from {}: server full", addr);
        if let Err(e) = write_message(&mut writer, &ServerMessage::error("Server full")).await {
            debug!("Failed to notify {} that the server is full: {}", addr, e);
        }
        let _ = writer.shutdown().await;
        return;
    };

    let mut writer_task = tokio::spawn(write_loop(writer, rx, client_id));
    let mut writer_done = false;

    loop {
        tokio::select! {
            inbound = read_message::<_, ClientMessage>(&mut reader) => match inbound {
                Ok(Inbound::Message(message)) => {
                    lobby.lock().await.handle(client_id, message);
                }
                Ok(Inbound::Malformed(reason)) => {
                    lobby.lock().await.reject_malformed(client_id, &reason);
                }
                Ok(Inbound::Closed) => {
                    debug!("Client {} closed the connection", client_id);
                    break;
                }
                Err(e) => {
                    debug!("Connection error from client {}: {}", client_id, e);
                    break;
                }
            },
            _ = &mut writer_task => {
                writer_done = true;
                debug!("Writer for client {} ended", client_id);
                break;
            }
            _ = shutdown.recv() => {
                debug!("Closing client {} for shutdown", client_id);
                break;
            }
        }
    }

    // Dropping the session closes the outbound queue, which ends the writer
    lobby.lock().await.disconnect(client_id);

    if !writer_done
        && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task)
            .await
            .is_err()
    {
        warn!("Writer for client {} did not drain in time", client_id);
        writer_task.abort();
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    client_id: u32,
) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = write_message(&mut writer, &message).await {
            debug!("Failed to write to client {}: {}", client_id, e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}
