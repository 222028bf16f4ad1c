//! Raw stream transport.
//!
//! Accepts TCP connections and frames them with [`LineCodec`]. Each
//! connection runs as a reader/writer task pair: the reader dispatches
//! requests in arrival order, the writer drains the connection's
//! outbound channel so broadcasts never wait on a slow peer.
//!
//! Error policy follows the protocol taxonomy: unknown codes and blank
//! frames are handled inside the codec/dispatcher with the connection
//! kept open; framing-level violations (oversized frame, invalid UTF-8)
//! terminate the connection, since the byte stream can no longer be
//! trusted.

use crate::dispatch::Dispatcher;
use futures::{SinkExt, StreamExt};
use smartgate_core::TransportKind;
use smartgate_protocol::{LineCodec, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

/// Accept loop. Runs until the listener task is aborted.
pub async fn run(listener: TcpListener, dispatcher: Arc<Dispatcher>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Raw accept failed");
                continue;
            }
        };

        debug!(%addr, "Raw client connected");
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            handle_connection(stream, addr, dispatcher).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let framed = Framed::new(stream, LineCodec::new());
    let (mut sink, mut requests) = framed.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Response>();
    let connection =
        crate::registry::ClientConnection::new(addr, TransportKind::Raw, outbound_tx);

    let registry = dispatcher.context().broadcaster.registry(TransportKind::Raw);
    registry.register(connection.clone());

    // Writer: best-effort flush of queued responses.
    let writer = tokio::spawn(async move {
        while let Some(response) = outbound_rx.recv().await {
            if sink.send(response).await.is_err() {
                break;
            }
        }
    });

    // Reader: dispatch in arrival order.
    while let Some(item) = requests.next().await {
        match item {
            Ok(request) => dispatcher.dispatch(&connection, request).await,
            Err(e) => {
                warn!(%addr, error = %e, "Framing error on raw connection");
                break;
            }
        }
    }

    registry.unregister(addr);
    dispatcher.context().admins.purge(addr);
    writer.abort();
    debug!(%addr, "Raw client disconnected");
}
