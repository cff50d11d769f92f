use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::warn;

use crate::common::types::ChannelId;

use super::types::OutgoingFrame;

/// Cloneable send handle onto an RTM session's write task.
///
/// Replies from spawned lookup tasks go through a clone of this; once the
/// session is torn down, sends become no-ops and the reply is dropped.
#[derive(Clone)]
pub struct Outbox {
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
    next_id: Arc<AtomicU64>,
}

impl Outbox {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<Message>, next_id: Arc<AtomicU64>) -> Self {
        Self { tx, next_id }
    }

    /// Queue a chat message for delivery to a channel.
    pub fn send(&self, channel: &ChannelId, text: impl Into<String>) {
        self.send_frame(&OutgoingFrame::Message {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            channel: channel.clone(),
            text: text.into(),
        });
    }

    pub(super) fn send_ping(&self, time: u64) {
        self.send_frame(&OutgoingFrame::Ping {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            time,
        });
    }

    /// True once the session's write task is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send_frame(&self, frame: &OutgoingFrame) {
        match serde_json::to_string(frame) {
            Ok(json) => {
                let _ = self.tx.send(Message::Text(json.into()));
            }
            Err(e) => warn!("Failed to serialize outbound RTM frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outbox() -> (Outbox, tokio::sync::mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Outbox::new(tx, Arc::new(AtomicU64::new(1))), rx)
    }

    #[test]
    fn test_send_assigns_monotonic_ids() {
        let (outbox, mut rx) = outbox();
        let channel = ChannelId::from("C024BE91L");

        outbox.send(&channel, "first");
        outbox.send(&channel, "second");

        let mut ids = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            let Message::Text(text) = msg else {
                panic!("expected a text frame")
            };
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["type"], "message");
            assert_eq!(value["channel"], "C024BE91L");
            ids.push(value["id"].as_u64().unwrap());
        }

        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_closed_outbox_drops_sends() {
        let (outbox, rx) = outbox();
        drop(rx);

        assert!(outbox.is_closed());
        // Must not panic.
        outbox.send(&ChannelId::from("C024BE91L"), "late reply");
    }
}
