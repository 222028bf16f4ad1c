//! WebSocket transport.
//!
//! Accepts TCP connections and performs the WebSocket upgrade handshake
//! via tokio-tungstenite, which answers non-GET or malformed upgrade
//! requests with an HTTP error and closes. Continuation frames are
//! accumulated by the library and surfaced as one complete text message
//! only when the final frame arrives; the reassembled payload is then
//! parsed exactly like a raw-transport line, with blank messages
//! silently discarded.
//!
//! Outbound messages carry the identical encoded string as the raw
//! transport, wrapped in a single text frame.

use crate::dispatch::Dispatcher;
use futures::{SinkExt, StreamExt};
use smartgate_core::TransportKind;
use smartgate_protocol::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Accept loop. Runs until the listener task is aborted.
pub async fn run(listener: TcpListener, dispatcher: Arc<Dispatcher>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "WebSocket accept failed");
                continue;
            }
        };

        debug!(%addr, "WebSocket client connecting");
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            handle_connection(stream, addr, dispatcher).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, dispatcher: Arc<Dispatcher>) {
    // The handshake rejects malformed upgrades with an HTTP error on
    // its own; nothing to answer here.
    let websocket = match tokio_tungstenite::accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(e) => {
            warn!(%addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    debug!(%addr, "WebSocket client connected");
    let (mut sink, mut messages) = websocket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Response>();
    let connection =
        crate::registry::ClientConnection::new(addr, TransportKind::WebSocket, outbound_tx);

    let registry = dispatcher
        .context()
        .broadcaster
        .registry(TransportKind::WebSocket);
    registry.register(connection.clone());

    let writer = tokio::spawn(async move {
        while let Some(response) = outbound_rx.recv().await {
            if sink.send(Message::text(response.encode())).await.is_err() {
                break;
            }
        }
    });

    while let Some(item) = messages.next().await {
        match item {
            Ok(Message::Text(text)) => {
                // Blank messages are discarded without dispatch.
                if let Some(request) = Request::parse(text.as_str()) {
                    dispatcher.dispatch(&connection, request).await;
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(%addr, "Ignoring binary frame");
            }
            Ok(Message::Close(_)) => break,
            // Ping/pong is handled by the library during reads/writes.
            Ok(_) => {}
            Err(e) => {
                warn!(%addr, error = %e, "WebSocket error");
                break;
            }
        }
    }

    registry.unregister(addr);
    dispatcher.context().admins.purge(addr);
    writer.abort();
    debug!(%addr, "WebSocket client disconnected");
}
