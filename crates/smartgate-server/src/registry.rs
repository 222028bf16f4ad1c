//! Connection registries and broadcast fan-out.
//!
//! Each transport keeps its own registry of live client connections for
//! broadcast purposes. Outbound messages travel through an unbounded
//! per-connection channel drained by that connection's writer task, so
//! broadcasts are fire-and-forget with respect to the dispatch call: the
//! engine never waits for a flush, and writes to a connection that
//! closed in the meantime are dropped.

use smartgate_core::TransportKind;
use smartgate_protocol::Response;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// One client connection as seen by the dispatch engine.
///
/// Cloning shares the outbound channel; the connection is identified by
/// its remote address within its transport's registry.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    addr: SocketAddr,
    transport: TransportKind,
    outbound: mpsc::UnboundedSender<Response>,
}

impl ClientConnection {
    pub fn new(
        addr: SocketAddr,
        transport: TransportKind,
        outbound: mpsc::UnboundedSender<Response>,
    ) -> Self {
        Self {
            addr,
            transport,
            outbound,
        }
    }

    /// Remote address of the client.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport the client connected on.
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Queue a response for this client. Best-effort: a closed
    /// connection drops the message.
    pub fn send(&self, response: Response) {
        trace!(addr = %self.addr, fields = ?response.fields(), "Queueing response");
        if self.outbound.send(response).is_err() {
            debug!(addr = %self.addr, "Dropping response for closed connection");
        }
    }
}

/// Live connections of one transport.
#[derive(Debug)]
pub struct ConnectionRegistry {
    transport: TransportKind,
    clients: Mutex<HashMap<SocketAddr, ClientConnection>>,
}

impl ConnectionRegistry {
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Add a connection. Replaces any stale entry for the same address.
    pub fn register(&self, connection: ClientConnection) {
        let mut clients = self.clients.lock().expect("registry lock poisoned");
        clients.insert(connection.addr(), connection);
        debug!(
            transport = %self.transport,
            total = clients.len(),
            "Client registered"
        );
    }

    /// Remove a connection by address. Idempotent.
    pub fn unregister(&self, addr: SocketAddr) {
        let mut clients = self.clients.lock().expect("registry lock poisoned");
        if clients.remove(&addr).is_some() {
            debug!(
                transport = %self.transport,
                %addr,
                total = clients.len(),
                "Client unregistered"
            );
        }
    }

    /// Queue a response to every connection on this transport.
    pub fn broadcast(&self, response: &Response) {
        let clients = self.clients.lock().expect("registry lock poisoned");
        for connection in clients.values() {
            connection.send(response.clone());
        }
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.clients.lock().expect("registry lock poisoned").len()
    }

    /// Whether no clients are connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both transports' registries.
#[derive(Debug)]
pub struct Broadcaster {
    raw: ConnectionRegistry,
    ws: ConnectionRegistry,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            raw: ConnectionRegistry::new(TransportKind::Raw),
            ws: ConnectionRegistry::new(TransportKind::WebSocket),
        }
    }

    /// Registry for one transport.
    pub fn registry(&self, transport: TransportKind) -> &ConnectionRegistry {
        match transport {
            TransportKind::Raw => &self.raw,
            TransportKind::WebSocket => &self.ws,
        }
    }

    /// Queue a response to every connection on both transports.
    pub fn broadcast_all(&self, response: &Response) {
        self.raw.broadcast(response);
        self.ws.broadcast(response);
    }

    /// Total live connections across both transports.
    pub fn client_count(&self) -> usize {
        self.raw.len() + self.ws.len()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(port: u16, transport: TransportKind) -> (ClientConnection, mpsc::UnboundedReceiver<Response>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        (ClientConnection::new(addr, transport, tx), rx)
    }

    #[test]
    fn test_register_unregister() {
        let registry = ConnectionRegistry::new(TransportKind::Raw);
        let (conn, _rx) = connection(4000, TransportKind::Raw);

        registry.register(conn.clone());
        assert_eq!(registry.len(), 1);

        registry.unregister(conn.addr());
        assert!(registry.is_empty());

        // Idempotent
        registry.unregister(conn.addr());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_all_registered() {
        let broadcaster = Broadcaster::new();
        let (raw_conn, mut raw_rx) = connection(4000, TransportKind::Raw);
        let (ws_conn, mut ws_rx) = connection(4001, TransportKind::WebSocket);

        broadcaster.registry(TransportKind::Raw).register(raw_conn);
        broadcaster.registry(TransportKind::WebSocket).register(ws_conn);

        broadcaster.broadcast_all(&Response::new("DOOR_STATE").field("open"));

        assert_eq!(raw_rx.try_recv().unwrap().encode(), "DOOR_STATE;open\n");
        assert_eq!(ws_rx.try_recv().unwrap().encode(), "DOOR_STATE;open\n");
    }

    #[test]
    fn test_send_to_closed_connection_is_dropped() {
        let (conn, rx) = connection(4000, TransportKind::Raw);
        drop(rx);

        // Must not panic; the message is silently dropped.
        conn.send(Response::new("TEMPERATURE").field("21.5"));
    }

    #[test]
    fn test_broadcast_scoped_to_transport() {
        let broadcaster = Broadcaster::new();
        let (raw_conn, mut raw_rx) = connection(4000, TransportKind::Raw);
        let (ws_conn, mut ws_rx) = connection(4001, TransportKind::WebSocket);

        broadcaster.registry(TransportKind::Raw).register(raw_conn);
        broadcaster.registry(TransportKind::WebSocket).register(ws_conn);

        broadcaster
            .registry(TransportKind::Raw)
            .broadcast(&Response::new("SCAN_COMPLETED").field("0"));

        assert!(raw_rx.try_recv().is_ok());
        assert!(ws_rx.try_recv().is_err());
    }
}
