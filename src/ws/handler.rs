//! WebSocket upgrade handler for the room endpoint.

use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::info;

use crate::api::AppState;

use super::client::ClientAdapter;
use super::hub::{OUTBOUND_BUFFER_SIZE, Registration};

/// GET /room
///
/// The route sits behind the auth gate; by the time this runs the caller has
/// presented a session cookie. A failed upgrade fails this request only.
pub async fn room_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| async move {
        let id = hub.next_id();
        let (sender, outbound) = mpsc::channel(OUTBOUND_BUFFER_SIZE);
        hub.join(Registration { id, sender }).await;
        info!(conn = id, "client connected");

        ClientAdapter::new(id, hub).run(socket, outbound).await;
        info!(conn = id, "client disconnected");
    })
}
