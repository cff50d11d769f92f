use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use parking_lot::RwLock;

use crate::common::types::ChannelId;
use crate::config::Config;
use crate::queue::QueueState;
use crate::server::push::Broadcaster;
use crate::sources::TrackSource;

/// Top-level application state, shared by the chat gateway and the HTTP
/// server.
pub struct AppState {
    /// Per-channel queues, created lazily on first use.
    pub channels: DashMap<ChannelId, QueueState>,
    /// The channel the web player mirrors: the last one a command mutated.
    pub active_channel: RwLock<Option<ChannelId>>,
    pub broadcaster: Broadcaster,
    pub source: Arc<dyn TrackSource>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, source: Arc<dyn TrackSource>) -> Self {
        Self {
            channels: DashMap::new(),
            active_channel: RwLock::new(None),
            broadcaster: Broadcaster::new(),
            source,
            config,
        }
    }

    /// Entry guard for a channel's queue, created empty on first access.
    ///
    /// Every check-and-mutate of a queue runs while this guard is held,
    /// which serializes commands racing on the same channel.
    pub fn channel(&self, id: &ChannelId) -> RefMut<'_, ChannelId, QueueState> {
        self.channels.entry(id.clone()).or_default()
    }

    /// Record a channel as the one the web player follows.
    pub fn touch(&self, id: &ChannelId) {
        *self.active_channel.write() = Some(id.clone());
    }

    pub fn active(&self) -> Option<ChannelId> {
        self.active_channel.read().clone()
    }
}
