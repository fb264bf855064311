//! End-to-end tests: a real server on a random port, driven by
//! `tokio-tungstenite` clients speaking the JSON envelope protocol.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use multiroom::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    addr: String,
    loader: Arc<MemorySpaceLoader>,
    coordinator: CoordinatorHandle,
}

async fn start_server() -> TestServer {
    start_server_with(ServerConfig::default()).await
}

async fn start_server_with(config: ServerConfig) -> TestServer {
    let loader = Arc::new(MemorySpaceLoader::new(["ArenaSpace", "DungeonSpace"]));
    let server = MultiroomServer::builder()
        .config(config)
        .bind("127.0.0.1:0")
        .build(Arc::clone(&loader), LogPlacement)
        .await
        .expect("server should build");

    let addr = server.local_addr().expect("should have addr").to_string();
    let coordinator = server.coordinator();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    TestServer {
        addr,
        loader,
        coordinator,
    }
}

/// A connected client with its own outbound sequence counter.
struct Client {
    ws: ClientWs,
    seq: u64,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("should connect");
        Self { ws, seq: 0 }
    }

    async fn send(&mut self, payload: ClientMessage) {
        self.seq += 1;
        let env = Envelope {
            seq: self.seq,
            payload,
        };
        let text = serde_json::to_string(&env).unwrap();
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    /// Next server envelope, skipping pongs.
    async fn recv(&mut self) -> Envelope<ServerMessage> {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), self.ws.next())
                .await
                .expect("timed out waiting for server message")
                .expect("stream ended")
                .expect("websocket error");
            if msg.is_ping() || msg.is_pong() {
                continue;
            }
            return serde_json::from_slice(&msg.into_data()).expect("server sent invalid JSON");
        }
    }

    /// Returns `true` if nothing arrives within `wait`.
    async fn is_silent(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.ws.next()).await.is_err()
    }

    async fn list(&mut self) -> RoomListResponse {
        self.send(ClientMessage::RoomListRequest).await;
        match self.recv().await.payload {
            ServerMessage::RoomListResponse(resp) => resp,
            other => panic!("expected RoomListResponse, got {other:?}"),
        }
    }

    async fn create(&mut self, name: &str, space_id: &str, max: usize) {
        self.send(ClientMessage::CreateRoom(CreateRoomMessage {
            room_name: name.into(),
            room_data: format!("{name} data"),
            space_identifier: space_id.into(),
            max_players: max,
        }))
        .await;
    }

    async fn join(&mut self, name: &str) {
        self.send(ClientMessage::JoinRoom(JoinRoomMessage {
            room_name: name.into(),
        }))
        .await;
    }

    async fn expect_transition(&mut self, space_id: &str) {
        let env = self.recv().await;
        assert_eq!(
            env.payload,
            ServerMessage::SpaceTransition(SpaceTransitionNotification::load_additive(space_id))
        );
    }
}

// =========================================================================
// Listing
// =========================================================================

#[tokio::test]
async fn test_list_on_empty_server() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    let resp = client.list().await;

    assert!(resp.is_empty());
}

#[tokio::test]
async fn test_server_envelopes_are_sequenced() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.send(ClientMessage::RoomListRequest).await;
    client.send(ClientMessage::RoomListRequest).await;

    assert_eq!(client.recv().await.seq, 1);
    assert_eq!(client.recv().await.seq, 2);
}

// =========================================================================
// Create and join
// =========================================================================

#[tokio::test]
async fn test_create_room_then_listed() {
    let server = start_server().await;
    let mut creator = Client::connect(&server.addr).await;
    let mut browser = Client::connect(&server.addr).await;

    creator.create("Arena", "ArenaSpace", 4).await;
    creator.expect_transition("ArenaSpace").await;

    let resp = browser.list().await;
    assert_eq!(resp.room_names, vec!["Arena"]);
    assert_eq!(resp.room_data, vec!["Arena data"]);
    assert_eq!(resp.space_identifiers, vec!["ArenaSpace"]);
    assert_eq!(resp.current_counts, vec![1]);
    assert_eq!(resp.max_counts, vec![4]);
    assert_eq!(server.loader.loaded().await.len(), 1);
}

#[tokio::test]
async fn test_arena_capacity_two() {
    let server = start_server().await;
    let mut a = Client::connect(&server.addr).await;
    let mut b = Client::connect(&server.addr).await;
    let mut c = Client::connect(&server.addr).await;

    a.create("Arena", "ArenaSpace", 2).await;
    a.expect_transition("ArenaSpace").await;
    b.join("Arena").await;
    b.expect_transition("ArenaSpace").await;

    c.join("Arena").await;

    assert!(c.is_silent(Duration::from_millis(200)).await, "full room sends nothing");
    let resp = c.list().await;
    assert_eq!(resp.current_counts, vec![2]);
}

#[tokio::test]
async fn test_same_name_race_over_the_wire() {
    let server = start_server().await;
    let mut a = Client::connect(&server.addr).await;
    let mut b = Client::connect(&server.addr).await;

    a.create("Arena", "ArenaSpace", 4).await;
    b.create("Arena", "DungeonSpace", 4).await;

    // Exactly one of them gets a transition.
    let a_won = !a.is_silent(Duration::from_millis(300)).await;
    let b_won = !b.is_silent(Duration::from_millis(300)).await;
    assert!(a_won ^ b_won, "exactly one creator should win");

    let rooms = server.coordinator.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].name, "Arena");
}

#[tokio::test]
async fn test_unknown_space_reports_create_failed() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.create("Arena", "Nowhere", 2).await;

    match client.recv().await.payload {
        ServerMessage::CreateRoomFailed(failed) => assert_eq!(failed.room_name, "Arena"),
        other => panic!("expected CreateRoomFailed, got {other:?}"),
    }
    assert!(client.list().await.is_empty());
}

#[tokio::test]
async fn test_join_missing_room_is_ignored() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client.join("Nowhere").await;

    assert!(client.is_silent(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_garbage_frame_is_ignored() {
    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;

    client
        .ws
        .send(Message::Text("not json".into()))
        .await
        .unwrap();

    // The connection survives and still answers.
    assert!(client.list().await.is_empty());
}

// =========================================================================
// Disconnects
// =========================================================================

#[tokio::test]
async fn test_last_client_leaving_removes_room_and_unloads() {
    let server = start_server().await;
    let mut creator = Client::connect(&server.addr).await;
    let mut browser = Client::connect(&server.addr).await;
    creator.create("Arena", "ArenaSpace", 2).await;
    creator.expect_transition("ArenaSpace").await;

    creator.ws.close(None).await.unwrap();
    drop(creator);

    let mut emptied = false;
    for _ in 0..50 {
        if browser.list().await.is_empty() {
            emptied = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(emptied, "room should disappear after its last member leaves");

    let mut unloaded = false;
    for _ in 0..50 {
        if server.loader.loaded().await.is_empty() {
            unloaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(unloaded, "space should be unloaded");
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let server = start_server_with(ServerConfig {
        idle_timeout: Some(Duration::from_millis(100)),
        ..ServerConfig::default()
    })
    .await;
    let mut client = Client::connect(&server.addr).await;

    let next = tokio::time::timeout(Duration::from_secs(5), client.ws.next())
        .await
        .expect("server should close the idle connection");
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
}

#[tokio::test]
async fn test_pinging_occupant_outlives_idle_timeout() {
    let server = start_server_with(ServerConfig {
        idle_timeout: Some(Duration::from_millis(300)),
        ..ServerConfig::default()
    })
    .await;
    let mut client = Client::connect(&server.addr).await;
    client.create("Arena", "ArenaSpace", 2).await;
    client.expect_transition("ArenaSpace").await;

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        client
            .ws
            .send(Message::Ping(Vec::new().into()))
            .await
            .expect("server should keep the socket open");
    }

    let rooms = server.coordinator.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].occupancy, 1);
    assert_eq!(client.list().await.current_counts, vec![1]);
}

#[tokio::test]
async fn test_quiet_occupant_keeps_room_by_default() {
    assert_eq!(ServerConfig::default().idle_timeout, None);

    let server = start_server().await;
    let mut client = Client::connect(&server.addr).await;
    client.create("Arena", "ArenaSpace", 2).await;
    client.expect_transition("ArenaSpace").await;

    assert!(client.is_silent(Duration::from_millis(500)).await);

    let rooms = server.coordinator.list_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_run_until_shutdown_unloads_spaces() {
    let loader = Arc::new(MemorySpaceLoader::new(["ArenaSpace"]));
    let server = MultiroomServer::builder()
        .bind("127.0.0.1:0")
        .build(Arc::clone(&loader), LogPlacement)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let mut client = Client::connect(&addr).await;
    client.create("Arena", "ArenaSpace", 2).await;
    client.expect_transition("ArenaSpace").await;
    assert_eq!(loader.loaded().await.len(), 1);

    stop_tx.send(()).unwrap();
    running.await.unwrap().expect("server should stop cleanly");

    assert!(loader.loaded().await.is_empty());
}
