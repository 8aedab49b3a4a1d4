use crate::game::ClientGameState;
use crate::input::{self, Command, InputError};
use crate::rendering;
use log::{debug, info, warn};
use shared::codec::{read_message, write_message, CodecError, Inbound};
use shared::{ClientMessage, ServerMessage};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Receiving half of a server connection
pub struct MessageReader<R = OwnedReadHalf> {
    inner: R,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next message from the server, or `None` once the server closed the
    /// connection. Frames that fail to decode are logged and skipped.
    pub async fn recv(&mut self) -> io::Result<Option<ServerMessage>> {
        loop {
            match read_message(&mut self.inner).await? {
                Inbound::Message(message) => return Ok(Some(message)),
                Inbound::Malformed(reason) => warn!("Ignoring malformed message: {}", reason),
                Inbound::Closed => return Ok(None),
            }
        }
    }
}

/// Sending half of a server connection
pub struct MessageWriter<W = OwnedWriteHalf> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), CodecError> {
        write_message(&mut self.inner, message).await
    }
}

pub struct Connection {
    reader: MessageReader,
    writer: MessageWriter,
}

impl Connection {
    pub async fn connect(server_addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(server_addr).await?;
        debug!("Connected to {}", server_addr);
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: MessageReader::new(reader),
            writer: MessageWriter::new(writer),
        })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), CodecError> {
        self.writer.send(message).await
    }

    pub async fn recv(&mut self) -> io::Result<Option<ServerMessage>> {
        self.reader.recv().await
    }

    pub fn into_split(self) -> (MessageReader, MessageWriter) {
        (self.reader, self.writer)
    }
}

/// Interactive terminal client
pub struct Client {
    connection: Connection,
    state: ClientGameState,
}

impl Client {
    pub async fn new(server_addr: &str, name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let connection = Connection::connect(server_addr).await?;
        Ok(Client {
            connection,
            state: ClientGameState::new(name),
        })
    }

    /// Runs until the user quits or the server goes away.
    ///
    /// Server pushes are read by a separate task and forwarded over a
    /// channel, so a stdin line arriving mid-frame never cuts a read short.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let Client {
            connection,
            mut state,
        } = self;
        let (mut reader, mut writer) = connection.into_split();

        let (inbox_tx, mut inbox) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(async move {
            loop {
                match reader.recv().await {
                    Ok(Some(message)) => {
                        if inbox_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Connection error: {}", e);
                        break;
                    }
                }
            }
        });

        writer
            .send(&ClientMessage::Connect {
                name: state.name().to_string(),
            })
            .await?;
        println!("{}", input::HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let result = loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(message) => {
                        state.apply(&message);
                        for line in rendering::render_message(&message, &state) {
                            println!("{}", line);
                        }
                    }
                    None if state.is_finished() => {
                        info!("Server closed the connection after the game ended");
                        break Ok(());
                    }
                    None => break Err("connection closed by the server".into()),
                },
                line = lines.next_line() => match line? {
                    Some(line) => match input::parse_command(&line) {
                        Ok(Command::Quit) => break Ok(()),
                        Ok(Command::Help) => println!("{}", input::HELP),
                        Ok(command) => {
                            if let Some(message) = command.into_message() {
                                writer.send(&message).await?;
                            }
                        }
                        Err(InputError::Empty) => {}
                        Err(e) => println!("{}", e),
                    },
                    None => break Ok(()),
                },
            }
        };

        reader_task.abort();
        result
    }
}
