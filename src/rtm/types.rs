use serde::{Deserialize, Serialize};

use crate::common::types::{ChannelId, UserId};

/// Response of the `rtm.connect` bootstrap call.
#[derive(Debug, Deserialize)]
pub struct ConnectResponse {
    pub ok: bool,
    /// Single-use WebSocket URL, present when `ok` is true.
    pub url: Option<String>,
    #[serde(rename = "self")]
    pub identity: Option<ConnectSelf>,
    /// Machine-readable error code, present when `ok` is false.
    pub error: Option<String>,
}

/// The bot's own identity, echoed back by `rtm.connect`.
#[derive(Debug, Deserialize)]
pub struct ConnectSelf {
    pub id: UserId,
    pub name: Option<String>,
}

/// Inbound RTM events, tagged by `type`.
///
/// Send acknowledgements (`{ok, reply_to, ...}`) carry no `type` field and
/// intentionally fail to deserialize into this enum; the session logs them
/// at trace level instead.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RtmEvent {
    /// First event after the socket opens; the session is live.
    Hello,
    Message {
        channel: ChannelId,
        user: Option<UserId>,
        text: Option<String>,
        /// Set on edits, joins, bot messages and other non-plain messages.
        subtype: Option<String>,
    },
    /// The server is about to close the connection.
    Goodbye,
    Pong {
        reply_to: Option<u64>,
    },
    /// Everything else on the event firehose.
    #[serde(other)]
    Unknown,
}

/// Outbound RTM frames. Ids are process-monotonic so acks stay
/// attributable across reconnects.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingFrame {
    Message {
        id: u64,
        channel: ChannelId,
        text: String,
    },
    Ping {
        id: u64,
        time: u64,
    },
}

/// Outcome of a single RTM session, telling the outer loop what to do next.
pub enum SessionOutcome {
    /// Connection lost or the server said goodbye; bootstrap a fresh URL.
    Reconnect,
    /// Process shutdown, or a token the API will never accept.
    Shutdown,
}

/// Bootstrap errors that retrying cannot fix.
pub fn is_fatal_connect_error(error: &str) -> bool {
    matches!(
        error,
        "invalid_auth" | "account_inactive" | "token_revoked" | "not_authed"
    )
}

/// Converts any `Display`-able value into the crate's boxed error type.
#[inline]
pub fn map_boxed_err<E: std::fmt::Display>(e: E) -> crate::common::types::AnyError {
    e.to_string().into()
}
