/// Web API endpoint that exchanges a token for a single-use RTM
/// WebSocket URL.
pub const RTM_CONNECT_URL: &str = "https://slack.com/api/rtm.connect";

/// Interval (ms) between outbound pings on an established RTM session.
pub const HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Maximum reconnect attempts before giving up on the RTM session.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Base delay (ms) for the exponential backoff on reconnect.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Timeout (ms) allowed for the WS write task to shut down gracefully.
pub const WRITE_TASK_SHUTDOWN_MS: u64 = 500;
