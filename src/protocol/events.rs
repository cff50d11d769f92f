use serde::Serialize;

use crate::protocol::tracks::Track;

/// Messages pushed from the server to browser clients over the socket.
///
/// Delivery is at-most-once: there is no acknowledgement and no replay for
/// clients that connect after an event fired. Late joiners reconcile by
/// polling `GET /current` instead.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PushEvent {
    /// Resume playback of whatever the client currently has loaded.
    Play,
    /// Pause playback.
    Pause,
    /// The queue advanced; `track` is the new current track, or null when
    /// the queue ran out.
    Next { track: Option<Track> },
    /// Start streaming a track immediately (an `add` that bypassed the
    /// queue on an idle channel).
    Stream { track: Track },
}
