use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::commands::CommandHandler;
use crate::common::types::{ChannelId, UserId};

use super::heartbeat::spawn_heartbeat;
use super::outbox::Outbox;
use super::types::{RtmEvent, SessionOutcome};

/// Per-session event state: parses inbound frames, filters the message
/// stream, and owns the heartbeat task.
pub(super) struct SessionState<'a> {
    commands: &'a CommandHandler,
    self_id: UserId,
    outbox: Outbox,
    heartbeat: Option<tokio::task::JoinHandle<()>>,
    saw_hello: bool,
}

impl<'a> SessionState<'a> {
    pub(super) fn new(commands: &'a CommandHandler, self_id: UserId, outbox: Outbox) -> Self {
        Self {
            commands,
            self_id,
            outbox,
            heartbeat: None,
            saw_hello: false,
        }
    }

    /// True once the server sent `hello` on this connection.
    pub(super) fn saw_hello(&self) -> bool {
        self.saw_hello
    }

    pub(super) fn handle_text(&mut self, text: &str) -> Option<SessionOutcome> {
        match serde_json::from_str::<RtmEvent>(text) {
            Ok(event) => self.handle_event(event),
            Err(e) => {
                // Send acks have no type field and are expected noise.
                let is_ack = serde_json::from_str::<Value>(text)
                    .ok()
                    .is_some_and(|v| v.get("reply_to").is_some());
                if is_ack {
                    trace!("RTM send ack: {}", text.trim());
                } else {
                    warn!("Failed to parse RTM event: {} - Text: {}", e, text);
                }
                None
            }
        }
    }

    fn handle_event(&mut self, event: RtmEvent) -> Option<SessionOutcome> {
        match event {
            RtmEvent::Hello => self.handle_hello(),
            RtmEvent::Message {
                channel,
                user,
                text,
                subtype,
            } => self.handle_message(channel, user, text, subtype),
            RtmEvent::Goodbye => {
                info!("RTM server said goodbye; reconnecting");
                Some(SessionOutcome::Reconnect)
            }
            RtmEvent::Pong { reply_to } => {
                debug!("RTM pong (reply_to={:?})", reply_to);
                None
            }
            RtmEvent::Unknown => None,
        }
    }

    fn handle_hello(&mut self) -> Option<SessionOutcome> {
        info!("RTM session established");
        self.saw_hello = true;

        if let Some(h) = self.heartbeat.take() {
            h.abort();
        }
        self.heartbeat = Some(spawn_heartbeat(self.outbox.clone()));
        None
    }

    fn handle_message(
        &mut self,
        channel: ChannelId,
        user: Option<UserId>,
        text: Option<String>,
        subtype: Option<String>,
    ) -> Option<SessionOutcome> {
        // Edits, joins, bot posts and the like never carry commands.
        if let Some(subtype) = subtype {
            trace!("Skipping message with subtype {}", subtype);
            return None;
        }
        // Our own replies come back on the firehose too.
        if user.as_ref() == Some(&self.self_id) {
            return None;
        }
        let Some(text) = text else { return None };

        self.commands.handle_message(&self.outbox, &channel, &text);
        None
    }
}

impl<'a> Drop for SessionState<'a> {
    fn drop(&mut self) {
        if let Some(h) = self.heartbeat.take() {
            h.abort();
        }
    }
}
