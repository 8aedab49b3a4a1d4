//! Integration tests for the quiz server and client
//!
//! These tests run a real server on a loopback port and drive it through the
//! client crate's connection type, so every message crosses the wire.

use client::bot::{Bot, BotError, Strategy};
use client::network::Connection;
use server::lobby::Lobby;
use server::network::Server;
use server::questions::{Question, QuestionBank};
use shared::codec::{encode, read_message, write_message, Inbound, MAX_FRAME_LEN};
use shared::{ClientMessage, PlayerStatus, ResultKind, ServerMessage, Standing, MAX_LEVEL};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

const RIGHT: u8 = 0;
const WRONG: u8 = 3;
const WAIT: Duration = Duration::from_secs(3);

/// Every question's correct answer is the first choice
fn test_bank() -> Arc<QuestionBank> {
    let questions = (1..=MAX_LEVEL)
        .map(|level| {
            Question::new(
                level,
                &format!("Level {} question", level),
                ["right", "wrong", "wrong", "wrong"],
                RIGHT,
            )
        })
        .collect();
    Arc::new(QuestionBank::from_questions(questions).unwrap())
}

struct TestServer {
    addr: SocketAddr,
    lobby: Arc<Mutex<Lobby>>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(max_clients: usize) -> Self {
        let server = Server::bind("127.0.0.1:0", max_clients, test_bank())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let lobby = server.lobby();
        let (stop, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async {
            let _ = stop_rx.await;
        }));
        TestServer {
            addr,
            lobby,
            stop,
            handle,
        }
    }

    async fn player_count(&self) -> usize {
        self.lobby.lock().await.game().player_count()
    }

    /// Polls until the registered player count reaches `expected`
    async fn wait_for_players(&self, expected: usize) {
        for _ in 0..100 {
            if self.player_count().await == expected {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "Expected {} players, found {}",
            expected,
            self.player_count().await
        );
    }

    async fn shutdown(self) {
        let _ = self.stop.send(());
        timeout(WAIT, self.handle).await.unwrap().unwrap();
    }
}

struct TestClient {
    name: String,
    connection: Connection,
}

impl TestClient {
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut connection = Connection::connect(&addr.to_string()).await.unwrap();
        connection
            .send(&ClientMessage::Connect {
                name: name.to_string(),
            })
            .await
            .unwrap();
        let mut client = TestClient {
            name: name.to_string(),
            connection,
        };
        // Broadcasts reach a session before it registers, so skip them
        client
            .expect("welcome", |m| matches!(m, ServerMessage::Connected { .. }))
            .await;
        client
    }

    async fn send(&mut self, message: ClientMessage) {
        self.connection.send(&message).await.unwrap();
    }

    async fn next(&mut self) -> ServerMessage {
        match timeout(WAIT, self.connection.recv()).await {
            Ok(Ok(Some(message))) => message,
            Ok(Ok(None)) => panic!("{}: server closed the connection", self.name),
            Ok(Err(e)) => panic!("{}: connection error {}", self.name, e),
            Err(_) => panic!("{}: timed out waiting for the server", self.name),
        }
    }

    /// Skips messages until one matches
    async fn expect<F>(&mut self, what: &str, matches: F) -> ServerMessage
    where
        F: Fn(&ServerMessage) -> bool,
    {
        loop {
            let message = self.next().await;
            if matches(&message) {
                return message;
            }
            if let ServerMessage::Error { reason } = &message {
                panic!("{} got an error while waiting for {}: {}", self.name, what, reason);
            }
        }
    }

    async fn expect_question(&mut self, level: u8) {
        self.expect("question", |m| {
            matches!(m, ServerMessage::Question { level: l, .. } if *l == level)
        })
        .await;
    }

    async fn expect_result(&mut self) -> (ResultKind, u64, u8) {
        match self
            .expect("result", |m| matches!(m, ServerMessage::Result { .. }))
            .await
        {
            ServerMessage::Result {
                outcome,
                prize,
                level,
            } => (outcome, prize, level),
            _ => unreachable!(),
        }
    }

    async fn expect_standings(&mut self) -> Vec<Standing> {
        match self
            .expect("standings", |m| matches!(m, ServerMessage::Standings { .. }))
            .await
        {
            ServerMessage::Standings { players } => players,
            _ => unreachable!(),
        }
    }

    async fn expect_game_over(&mut self) -> (Option<String>, u64) {
        match self
            .expect("game over", |m| matches!(m, ServerMessage::GameOver { .. }))
            .await
        {
            ServerMessage::GameOver { winner, prize } => (winner, prize),
            _ => unreachable!(),
        }
    }

    /// Answers correctly from the current level up to `level`
    async fn climb_to(&mut self, from: u8, level: u8) {
        for next in from..=level {
            self.expect_question(next).await;
            self.send(ClientMessage::Answer { choice: RIGHT }).await;
            let (outcome, _, reached) = self.expect_result().await;
            assert_eq!(outcome, ResultKind::Correct);
            assert_eq!(reached, next);
        }
    }
}

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// A question pushed by the server decodes with the prompt, choices,
    /// level and prize that were assigned
    #[tokio::test]
    async fn question_survives_the_wire() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let _bruno = TestClient::join(server.addr, "bruno").await;

        let message = ana
            .expect("question", |m| matches!(m, ServerMessage::Question { .. }))
            .await;
        assert_eq!(
            message,
            ServerMessage::Question {
                prompt: "Level 1 question".to_string(),
                choices: ["right", "wrong", "wrong", "wrong"].map(str::to_string),
                level: 1,
                prize: 1_000,
            }
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_message_kind_is_answered_with_error() {
        let server = TestServer::start(8).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        let payload = bincode::serialize(&(42u32, "surprise")).unwrap();
        let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
        frame.extend(payload);
        stream.write_all(&frame).await.unwrap();

        match timeout(WAIT, read_message::<_, ServerMessage>(&mut stream))
            .await
            .unwrap()
            .unwrap()
        {
            Inbound::Message(ServerMessage::Error { reason }) => {
                assert!(reason.contains("malformed"))
            }
            other => panic!("Expected an error reply, got {:?}", other),
        }

        // Still usable afterwards
        write_message(
            &mut stream,
            &ClientMessage::Connect {
                name: "ana".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            timeout(WAIT, read_message::<_, ServerMessage>(&mut stream))
                .await
                .unwrap()
                .unwrap(),
            Inbound::Message(ServerMessage::Connected { .. })
        ));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn oversized_frame_is_skipped() {
        let server = TestServer::start(8).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();

        let len = MAX_FRAME_LEN + 10;
        let mut frame = (len as u32).to_be_bytes().to_vec();
        frame.extend(vec![0u8; len]);
        frame.extend(encode(&ClientMessage::Connect { name: "ana".to_string() }).unwrap());
        stream.write_all(&frame).await.unwrap();

        let first = timeout(WAIT, read_message::<_, ServerMessage>(&mut stream))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, Inbound::Message(ServerMessage::Error { .. })));
        let second = timeout(WAIT, read_message::<_, ServerMessage>(&mut stream))
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(second, Inbound::Message(ServerMessage::Connected { .. })));

        server.shutdown().await;
    }
}

/// GAME FLOW TESTS
mod game_flow_tests {
    use super::*;

    /// A answers right, B answers wrong: B is out with nothing and A wins
    /// with the level-1 prize
    #[tokio::test]
    async fn two_player_elimination() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let mut bruno = TestClient::join(server.addr, "bruno").await;

        ana.expect("start", |m| *m == ServerMessage::GameStarted).await;
        ana.expect_question(1).await;
        bruno.expect_question(1).await;

        ana.send(ClientMessage::Answer { choice: RIGHT }).await;
        assert_eq!(ana.expect_result().await, (ResultKind::Correct, 1_000, 1));

        bruno.send(ClientMessage::Answer { choice: WRONG }).await;
        assert_eq!(bruno.expect_result().await, (ResultKind::Incorrect, 0, 0));

        let standings = bruno.expect_standings().await;
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].name, "ana");
        assert_eq!(standings[0].level, 1);
        assert_eq!(standings[0].status, PlayerStatus::Active);
        assert_eq!(standings[1].name, "bruno");
        assert_eq!(standings[1].prize, 0);
        assert_eq!(standings[1].status, PlayerStatus::Eliminated);

        assert_eq!(
            bruno.expect_game_over().await,
            (Some("ana".to_string()), 1_000)
        );
        assert_eq!(ana.expect_game_over().await, (Some("ana".to_string()), 1_000));

        let lobby = server.lobby.lock().await;
        assert!(lobby.game().is_finished());
        assert_eq!(lobby.game().winner().map(|w| w.prize), Some(1_000));
        drop(lobby);

        server.shutdown().await;
    }

    /// A stop at level 6 banks that level's prize and later answers are
    /// refused without touching it
    #[tokio::test]
    async fn stop_banks_prize_and_blocks_answers() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let _bruno = TestClient::join(server.addr, "bruno").await;
        let _carla = TestClient::join(server.addr, "carla").await;

        ana.climb_to(1, 6).await;
        ana.expect_question(7).await;
        ana.send(ClientMessage::Stop).await;
        assert_eq!(ana.expect_result().await, (ResultKind::Stopped, 100_000, 6));

        let standings = ana.expect_standings().await;
        let own = standings.iter().find(|s| s.name == "ana").unwrap();
        assert_eq!(own.status, PlayerStatus::Stopped);
        assert_eq!(own.prize, 100_000);

        ana.send(ClientMessage::Answer { choice: RIGHT }).await;
        match ana.next().await {
            ServerMessage::Error { reason } => assert!(reason.contains("no longer in play")),
            other => panic!("Expected a rejection, got {:?}", other),
        }

        let lobby = server.lobby.lock().await;
        let standings = lobby.game().snapshot_standings();
        assert_eq!(standings[0].prize, 100_000);
        assert_eq!(standings[0].level, 6);
        assert!(!lobby.game().is_finished());
        drop(lobby);

        server.shutdown().await;
    }

    /// Clearing level 15 ends the game even with other players still active
    #[tokio::test]
    async fn final_level_wins_immediately() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let mut bruno = TestClient::join(server.addr, "bruno").await;
        let _carla = TestClient::join(server.addr, "carla").await;

        ana.climb_to(1, MAX_LEVEL).await;

        assert_eq!(
            ana.expect_game_over().await,
            (Some("ana".to_string()), 20_000_000)
        );
        assert_eq!(
            bruno.expect_game_over().await,
            (Some("ana".to_string()), 20_000_000)
        );

        bruno.send(ClientMessage::Answer { choice: RIGHT }).await;
        match bruno.next().await {
            ServerMessage::Error { reason } => assert!(reason.contains("over")),
            other => panic!("Expected a rejection, got {:?}", other),
        }

        server.shutdown().await;
    }

    /// Everybody out in the same window: the game ends with no winner
    #[tokio::test]
    async fn last_elimination_without_survivor_has_no_winner() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let bruno = TestClient::join(server.addr, "bruno").await;
        let mut carla = TestClient::join(server.addr, "carla").await;

        carla.expect_question(1).await;
        carla.send(ClientMessage::Stop).await;
        assert_eq!(carla.expect_result().await, (ResultKind::Stopped, 0, 0));

        // Bruno leaves while still active; leaving never decides the game
        drop(bruno);
        server.wait_for_players(2).await;
        assert!(!server.lobby.lock().await.game().is_finished());

        ana.expect_question(1).await;
        ana.send(ClientMessage::Answer { choice: WRONG }).await;
        assert_eq!(ana.expect_result().await, (ResultKind::Incorrect, 0, 0));
        assert_eq!(ana.expect_game_over().await, (None, 0));
        assert_eq!(carla.expect_game_over().await, (None, 0));

        let mut latecomer = Connection::connect(&server.addr.to_string()).await.unwrap();
        latecomer
            .send(&ClientMessage::Connect {
                name: "bruno".to_string(),
            })
            .await
            .unwrap();
        match timeout(WAIT, latecomer.recv()).await.unwrap().unwrap() {
            Some(ServerMessage::Error { reason }) => assert!(reason.contains("over")),
            other => panic!("Expected a rejection, got {:?}", other),
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn chat_is_relayed_to_everyone() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let mut bruno = TestClient::join(server.addr, "bruno").await;

        ana.send(ClientMessage::Chat {
            text: "good luck".to_string(),
        })
        .await;

        let expected = ServerMessage::Chat {
            sender: "ana".to_string(),
            text: "good luck".to_string(),
        };
        assert_eq!(
            bruno.expect("chat", |m| matches!(m, ServerMessage::Chat { .. })).await,
            expected
        );
        assert_eq!(
            ana.expect("chat", |m| matches!(m, ServerMessage::Chat { .. })).await,
            expected
        );

        server.shutdown().await;
    }
}

/// CONCURRENCY TESTS
mod concurrency_tests {
    use super::*;

    /// The registered count always equals registrations minus departures,
    /// however the connections interleave
    #[tokio::test]
    async fn concurrent_register_and_unregister() {
        let server = TestServer::start(64).await;

        let mut tasks = Vec::new();
        for i in 0..24 {
            let addr = server.addr;
            tasks.push(tokio::spawn(async move {
                let client = TestClient::join(addr, &format!("player_{}", i)).await;
                if i % 3 == 0 {
                    drop(client);
                    None
                } else {
                    Some(client)
                }
            }));
        }

        let mut kept = Vec::new();
        for task in tasks {
            if let Some(client) = task.await.unwrap() {
                kept.push(client);
            }
        }

        assert_eq!(kept.len(), 16);
        server.wait_for_players(16).await;

        let lobby = server.lobby.lock().await;
        assert_eq!(lobby.game().snapshot_standings().len(), 16);
        assert_eq!(lobby.clients().len(), 16);
        drop(lobby);

        drop(kept);
        server.wait_for_players(0).await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn duplicate_names_rejected_across_connections() {
        let server = TestServer::start(8).await;
        let _ana = TestClient::join(server.addr, "ana").await;

        let mut impostor = Connection::connect(&server.addr.to_string()).await.unwrap();
        impostor
            .send(&ClientMessage::Connect {
                name: "ana".to_string(),
            })
            .await
            .unwrap();
        match timeout(WAIT, impostor.recv()).await.unwrap().unwrap() {
            Some(ServerMessage::Error { reason }) => assert!(reason.contains("already taken")),
            other => panic!("Expected a rejection, got {:?}", other),
        }
        assert_eq!(server.player_count().await, 1);

        server.shutdown().await;
    }

    /// Shutdown closes every open connection and unregisters every player
    #[tokio::test]
    async fn shutdown_closes_all_sessions() {
        let server = TestServer::start(8).await;
        let mut ana = TestClient::join(server.addr, "ana").await;
        let mut bruno = TestClient::join(server.addr, "bruno").await;
        let lobby = Arc::clone(&server.lobby);

        server.shutdown().await;

        for client in [&mut ana, &mut bruno] {
            loop {
                match timeout(WAIT, client.connection.recv()).await.unwrap() {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => break,
                }
            }
        }

        let lobby = lobby.lock().await;
        assert_eq!(lobby.game().player_count(), 0);
        assert!(lobby.clients().is_empty());
    }
}

/// BOT TESTS
mod bot_tests {
    use super::*;

    #[tokio::test]
    async fn two_bots_play_to_the_end() {
        let server = TestServer::start(8).await;
        let addr = server.addr.to_string();

        let first = {
            let addr = addr.clone();
            tokio::spawn(async move {
                Bot::new("bot_1", Strategy::Random)
                    .with_think_time(Duration::ZERO, Duration::ZERO)
                    .with_seed(1)
                    .run(&addr)
                    .await
            })
        };
        server.wait_for_players(1).await;
        let second = tokio::spawn(async move {
            Bot::new("bot_2", Strategy::Aggressive)
                .with_think_time(Duration::ZERO, Duration::ZERO)
                .with_seed(2)
                .run(&addr)
                .await
        });

        let first = timeout(Duration::from_secs(10), first)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let second = timeout(Duration::from_secs(10), second)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(server.lobby.lock().await.game().is_finished());
        assert!(!(first.won && second.won));
        for report in [&first, &second] {
            if report.status == PlayerStatus::Eliminated {
                assert_eq!(report.prize, 0);
            }
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn bot_with_taken_name_is_rejected() {
        let server = TestServer::start(8).await;
        let _ana = TestClient::join(server.addr, "ana").await;

        let result = Bot::new("ana", Strategy::Conservative)
            .with_think_time(Duration::ZERO, Duration::ZERO)
            .run(&server.addr.to_string())
            .await;
        assert!(matches!(result, Err(BotError::Rejected(_))));

        server.shutdown().await;
    }
}
