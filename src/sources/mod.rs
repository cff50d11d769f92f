use async_trait::async_trait;

use crate::common::errors::LookupError;
use crate::common::types::TrackId;
use crate::protocol::tracks::Track;

pub mod soundcloud;

pub use soundcloud::SoundCloudSource;

/// Trait that track lookup backends implement.
///
/// Queue entries are plain metadata records, so a backend only has to
/// answer two questions: "what matches this text" and "what is this id".
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Identifier for this backend (e.g. "soundcloud"), used in logs.
    fn name(&self) -> &str;

    /// Free-text search. At most the backend's configured result limit
    /// is returned; an empty vec means nothing matched.
    async fn search(&self, query: &str) -> Result<Vec<Track>, LookupError>;

    /// Look up a single track by its numeric id.
    ///
    /// Returns `Ok(None)` when the backend does not know the id.
    async fn track(&self, id: TrackId) -> Result<Option<Track>, LookupError>;
}
