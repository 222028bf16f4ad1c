//! End-to-end gateway flows over real sockets with the mock driver.
//!
//! Each test binds a gateway on ephemeral ports, connects real clients
//! on one or both transports, and checks the wire-visible behavior.

use futures::{SinkExt, StreamExt};
use smartgate_core::{AccessType, AdminSecret, InventorySnapshot, TagUid};
use smartgate_device::{AnyDriver, BridgeConfig, DeviceEvent, MockDriver};
use smartgate_server::{Gateway, GatewayConfig, GatewayHandle};
use smartgate_store::{AnyStore, MemoryStore};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_gateway(driver: MockDriver, store: MemoryStore) -> GatewayHandle {
    let config = GatewayConfig {
        raw_addr: "127.0.0.1:0".parse().unwrap(),
        ws_addr: "127.0.0.1:0".parse().unwrap(),
        admin_secret: AdminSecret::new("sesame"),
        bridge: BridgeConfig {
            start_program: "sleep".to_string(),
            start_args: vec!["30".to_string()],
            stop_program: "true".to_string(),
            stop_args: vec![],
        },
        ..GatewayConfig::default()
    };

    Gateway::bind(config, AnyStore::Memory(store), AnyDriver::Mock(driver))
        .await
        .unwrap()
        .spawn()
}

struct RawClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl RawClient {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> String {
        let mut line = String::new();
        timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a message")
            .unwrap();
        line.trim_end_matches('\n').to_string()
    }
}

#[tokio::test]
async fn initialization_over_raw_transport() {
    let handle = start_gateway(MockDriver::new(), MemoryStore::new()).await;
    let mut client = RawClient::connect(handle.raw_addr()).await;

    client.send("INITIALIZATION").await;
    assert_eq!(
        client.recv().await,
        "INITIALIZATION;AA770201;SMARTBOARD;1;3.58"
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn device_unavailable_family_over_raw_transport() {
    let driver = MockDriver::new();
    driver.set_candidates(vec![]);
    let handle = start_gateway(driver, MemoryStore::new()).await;
    let mut client = RawClient::connect(handle.raw_addr()).await;

    client.send("INITIALIZATION").await;
    assert_eq!(client.recv().await, "INITIALIZATION;");

    client.send("OPEN_DOOR").await;
    assert_eq!(client.recv().await, "OPEN_DOOR;");

    handle.shutdown().await;
}

#[tokio::test]
async fn unknown_code_keeps_connection_open() {
    let handle = start_gateway(MockDriver::new(), MemoryStore::new()).await;
    let mut client = RawClient::connect(handle.raw_addr()).await;

    client.send("SELF_DESTRUCT;now").await;
    // No response for the unknown code; the next command still works.
    client.send("INITIALIZATION").await;
    assert_eq!(
        client.recv().await,
        "INITIALIZATION;AA770201;SMARTBOARD;1;3.58"
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn admin_flow_over_raw_transport() {
    let store = MemoryStore::new();
    let handle = start_gateway(MockDriver::new(), store.clone()).await;
    let mut client = RawClient::connect(handle.raw_addr()).await;

    // Admin-gated command before sign-in: canned failure, no change.
    client.send("ADD_USER;alice").await;
    assert_eq!(client.recv().await, "ADD_USER;false");
    assert!(!store.has_user("alice").await);

    client.send("ADMIN_SIGN_IN;wrong").await;
    assert_eq!(client.recv().await, "ADMIN_SIGN_IN;false");

    client.send("ADMIN_SIGN_IN;sesame").await;
    assert_eq!(client.recv().await, "ADMIN_SIGN_IN;true");

    // Same command now succeeds.
    client.send("ADD_USER;alice").await;
    assert_eq!(client.recv().await, "ADD_USER;true");
    assert!(store.has_user("alice").await);

    client.send("ADMIN_SIGN_OUT").await;
    assert_eq!(client.recv().await, "ADMIN_SIGN_OUT;true");

    client.send("REMOVE_USER;alice").await;
    assert_eq!(client.recv().await, "REMOVE_USER;false");

    handle.shutdown().await;
}

#[tokio::test]
async fn websocket_transport_speaks_the_same_protocol() {
    let handle = start_gateway(MockDriver::new(), MemoryStore::new()).await;

    let (mut websocket, _) =
        tokio_tungstenite::connect_async(format!("ws://{}", handle.ws_addr()))
            .await
            .unwrap();

    websocket
        .send(Message::text("INITIALIZATION"))
        .await
        .unwrap();

    let message = timeout(RECV_TIMEOUT, websocket.next())
        .await
        .expect("timed out waiting for a message")
        .unwrap()
        .unwrap();
    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };
    assert_eq!(
        text.as_str().trim_end(),
        "INITIALIZATION;AA770201;SMARTBOARD;1;3.58"
    );

    handle.shutdown().await;
}

#[tokio::test]
async fn hardware_events_broadcast_to_both_transports() {
    let driver = MockDriver::new();
    let store = MemoryStore::new();
    let handle = start_gateway(driver.clone(), store.clone()).await;

    let mut raw_client = RawClient::connect(handle.raw_addr()).await;
    let (mut websocket, _) =
        tokio_tungstenite::connect_async(format!("ws://{}", handle.ws_addr()))
            .await
            .unwrap();

    // A request/response round-trip on each transport guarantees both
    // clients are registered before the event fires.
    raw_client.send("INITIALIZATION").await;
    raw_client.recv().await;
    websocket
        .send(Message::text("INITIALIZATION"))
        .await
        .unwrap();
    timeout(RECV_TIMEOUT, websocket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let snapshot = InventorySnapshot::new(vec![
        TagUid::new("04ABCDEF").unwrap(),
        TagUid::new("AA770201").unwrap(),
    ]);
    driver
        .emit(DeviceEvent::ScanCompleted(snapshot))
        .await
        .unwrap();

    assert_eq!(
        raw_client.recv().await,
        "SCAN_COMPLETED;2;04ABCDEF;AA770201"
    );
    let message = timeout(RECV_TIMEOUT, websocket.next())
        .await
        .expect("timed out waiting for a broadcast")
        .unwrap()
        .unwrap();
    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };
    assert_eq!(text.as_str().trim_end(), "SCAN_COMPLETED;2;04ABCDEF;AA770201");

    // Broadcast-then-persist: the snapshot was recorded too.
    assert_eq!(store.inventory_count().await, 1);

    handle.shutdown().await;
}

#[tokio::test]
async fn authentication_event_is_persisted() {
    let driver = MockDriver::new();
    let store = MemoryStore::new();
    let handle = start_gateway(driver.clone(), store.clone()).await;

    let mut client = RawClient::connect(handle.raw_addr()).await;
    client.send("INITIALIZATION").await;
    client.recv().await;

    driver
        .emit(DeviceEvent::AuthenticationSuccess {
            user: "alice".to_string(),
            access: AccessType::Badge,
        })
        .await
        .unwrap();

    assert_eq!(client.recv().await, "AUTHENTICATION_SUCCESS;alice;BADGE");
    let records = store.authentications().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user, "alice");

    handle.shutdown().await;
}
