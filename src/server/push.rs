use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::events::PushEvent;
use crate::server::AppState;

/// Registry of connected browser clients.
///
/// Delivery is at-most-once: each event is serialized once and pushed to
/// every client's channel, with no acknowledgement and no replay buffer.
/// Late joiners reconcile through `GET /current`.
pub struct Broadcaster {
    clients: DashMap<Uuid, flume::Sender<Message>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    /// Register a new client, returning its id and the receive side of
    /// its event channel.
    pub fn subscribe(&self) -> (Uuid, flume::Receiver<Message>) {
        let (tx, rx) = flume::unbounded();
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: &Uuid) {
        self.clients.remove(id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn broadcast(&self, event: &PushEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize push event: {}", e);
                return;
            }
        };

        debug!(
            "Broadcasting {} to {} client(s)",
            json,
            self.clients.len()
        );
        for entry in self.clients.iter() {
            let _ = entry.value().send(Message::Text(json.clone().into()));
        }
    }
}

/// Push-side WebSocket loop: server to client events only. Inbound frames
/// are ignored apart from close.
pub async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, rx) = state.broadcaster.subscribe();
    info!("Browser client connected: {}", id);

    loop {
        tokio::select! {
            Ok(msg) = rx.recv_async() => {
                if let Err(e) = socket.send(msg).await {
                    debug!("Client send error: client={} err={}", id, e);
                    break;
                }
            }
            msg = socket.recv() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!("WebSocket error: client={} err={}", id, e);
                        break;
                    }
                    None => break,
                };

                if let Message::Close(_) = msg {
                    break;
                }
            }
        }
    }

    state.broadcaster.unsubscribe(&id);
    info!("Browser client disconnected: {}", id);
}
