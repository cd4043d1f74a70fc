//! Per-connection client adapter.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::hub::{ConnId, HubHandle};

/// Bridges one WebSocket to the hub: an inbound loop that forwards received
/// frames to the hub's broadcast queue, and an outbound loop that drains the
/// client's queue onto the socket. Either loop exiting winds the whole
/// connection down.
pub struct ClientAdapter {
    id: ConnId,
    hub: HubHandle,
}

impl ClientAdapter {
    pub fn new(id: ConnId, hub: HubHandle) -> Self {
        Self { id, hub }
    }

    /// Run both loops to completion. The outbound queue receiver must be the
    /// counterpart of the sender registered with the hub; the hub closes it
    /// when this client leaves, which ends the outbound loop.
    pub async fn run(self, socket: WebSocket, outbound: mpsc::Receiver<Message>) {
        let (sink, stream) = socket.split();
        let write_task = tokio::spawn(write_loop(self.id, sink, outbound));

        self.read_loop(stream).await;

        // Read side is done: request removal. The hub drops the outbound
        // sender, the write loop drains and exits.
        self.hub.leave(self.id).await;
        let _ = write_task.await;
    }

    async fn read_loop(&self, mut stream: SplitStream<WebSocket>) {
        while let Some(received) = stream.next().await {
            match received {
                Ok(message @ Message::Text(_)) => self.hub.broadcast(message).await,
                Ok(Message::Binary(_)) => {
                    debug!(conn = self.id, "ignoring binary frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    debug!(conn = self.id, "client closed connection");
                    break;
                }
                Err(err) => {
                    debug!(conn = self.id, error = %err, "read failed");
                    break;
                }
            }
        }
    }
}

/// Drains the outbound queue onto the socket, one frame per message. Ends
/// when the queue is closed by the hub or a write fails.
async fn write_loop(
    id: ConnId,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        if let Err(err) = sink.send(message).await {
            debug!(conn = id, error = %err, "write failed");
            break;
        }
    }
}
