use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::CommandHandler;
use crate::common::types::{AnyResult, UserId};
use crate::server::AppState;

pub mod backoff;
pub mod constants;
pub mod handler;
pub mod heartbeat;
pub mod outbox;
pub mod types;

pub use outbox::Outbox;

use self::backoff::Backoff;
use self::constants::{RTM_CONNECT_URL, WRITE_TASK_SHUTDOWN_MS};
use self::types::{ConnectResponse, SessionOutcome, is_fatal_connect_error, map_boxed_err};

/// The chat-side connection: bootstraps RTM sessions, reads the event
/// stream, and keeps reconnecting until cancelled.
pub struct RtmGateway {
    commands: CommandHandler,
    http: reqwest::Client,
    token: String,
    /// Outbound frame ids, shared across reconnects.
    next_id: Arc<AtomicU64>,
    cancel_token: CancellationToken,
}

impl RtmGateway {
    pub fn new(state: Arc<AppState>, cancel_token: CancellationToken) -> Self {
        let token = state.config.chat.token.clone();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            commands: CommandHandler::new(state),
            http,
            token,
            next_id: Arc::new(AtomicU64::new(1)),
            cancel_token,
        }
    }

    pub async fn run(self) -> AnyResult<()> {
        let mut backoff = Backoff::new();

        loop {
            if self.cancel_token.is_cancelled() {
                return Ok(());
            }

            match self.connect(&mut backoff).await {
                Ok(SessionOutcome::Shutdown) => {
                    debug!("RTM gateway shutting down cleanly");
                    return Ok(());
                }
                Ok(SessionOutcome::Reconnect) => {
                    if backoff.is_exhausted() {
                        warn!("Max RTM reconnect attempts reached");
                        return Ok(());
                    }
                    let delay = backoff.next();
                    debug!("Reconnecting to RTM in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if backoff.is_exhausted() {
                        error!("RTM connection error after max attempts: {}", e);
                        return Err(e);
                    }
                    let delay = backoff.next();
                    warn!("RTM connection error: {}. Retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One full session: bootstrap, socket, read loop, teardown.
    async fn connect(&self, backoff: &mut Backoff) -> AnyResult<SessionOutcome> {
        let Some((url, self_id)) = self.bootstrap().await? else {
            return Ok(SessionOutcome::Shutdown);
        };

        debug!("Connecting to RTM socket as {}", self_id);
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(map_boxed_err)?;
        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

        // The write task lives for this connection only.
        let conn_cancel = self.cancel_token.child_token();
        let write_cancel = conn_cancel.clone();
        let write_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = write_cancel.cancelled() => break,
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break };
                        if let Err(e) = write.send(msg).await {
                            warn!("RTM write error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let outbox = Outbox::new(tx, self.next_id.clone());
        let mut state = handler::SessionState::new(&self.commands, self_id, outbox);

        let outcome = loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    break SessionOutcome::Shutdown;
                }
                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => {
                            warn!("RTM read error: {}", e);
                            break SessionOutcome::Reconnect;
                        }
                        None => {
                            debug!("RTM stream ended");
                            break SessionOutcome::Reconnect;
                        }
                    };

                    match msg {
                        Message::Text(text) => {
                            if let Some(outcome) = state.handle_text(&text) {
                                break outcome;
                            }
                        }
                        Message::Close(frame) => {
                            info!("RTM socket closed: {:?}", frame);
                            break SessionOutcome::Reconnect;
                        }
                        _ => {}
                    }
                }
            }
        };

        if state.saw_hello() {
            backoff.reset();
        }

        conn_cancel.cancel();
        let _ = tokio::time::timeout(
            Duration::from_millis(WRITE_TASK_SHUTDOWN_MS),
            write_task,
        )
        .await;

        Ok(outcome)
    }

    /// Exchange the token for a single-use WebSocket URL and our own
    /// user id. `Ok(None)` means the token will never work.
    async fn bootstrap(&self) -> AnyResult<Option<(String, UserId)>> {
        let resp = self
            .http
            .get(RTM_CONNECT_URL)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(map_boxed_err)?;

        let connect: ConnectResponse = resp.json().await.map_err(map_boxed_err)?;

        if !connect.ok {
            let reason = connect.error.unwrap_or_else(|| "unknown_error".to_string());
            if is_fatal_connect_error(&reason) {
                error!("RTM bootstrap rejected: {} (check the chat token)", reason);
                return Ok(None);
            }
            return Err(format!("rtm.connect failed: {reason}").into());
        }

        let url = connect
            .url
            .ok_or("rtm.connect response missing the socket URL")?;
        let identity = connect.identity.ok_or("rtm.connect response missing self")?;

        if let Some(name) = &identity.name {
            info!("Authenticated as {} ({})", name, identity.id);
        }
        Ok(Some((url, identity.id)))
    }
}
