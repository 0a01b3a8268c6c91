//! WebSocket subscriber endpoint.
//!
//! Clients connect to `GET /ws` and receive every broadcast event as a JSON
//! text frame for as long as the connection stays open. Anything the client
//! sends besides close/ping is ignored.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tracing::{debug, info};

use super::AppState;
use crate::broadcast::Hub;

pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Forward queued events to the socket until either side goes away, then
/// unregister so the hub stops queueing for this client.
async fn handle_socket(mut socket: WebSocket, hub: Hub) {
    let mut subscription = hub.subscribe().await;
    let id = subscription.id();
    info!(subscriber = %id, "WebSocket client connected");

    loop {
        tokio::select! {
            payload = subscription.recv() => {
                let Some(payload) = payload else {
                    debug!(subscriber = %id, "Subscription closed by hub");
                    break;
                };
                if socket.send(Message::Text(payload.to_string().into())).await.is_err() {
                    debug!(subscriber = %id, "WebSocket send failed");
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(subscriber = %id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    hub.unsubscribe(id).await;
    info!(subscriber = %id, "WebSocket client disconnected");
}
