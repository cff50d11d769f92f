use serde::{Deserialize, Serialize};

use crate::common::types::TrackId;

/// A playable SoundCloud track, in the shape the API returns it.
///
/// Field names match the API document on purpose: the same record flows
/// from the lookup response through push events and the polling endpoints
/// untouched, and the browser reads `id`, `title` and `user.username`
/// directly. Unknown response fields are dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub user: TrackUser,
}

/// The uploader, as embedded in a track record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackUser {
    pub username: String,
}

impl Track {
    /// One-line chat rendering: ``{username} — {title} `{id}` ``.
    pub fn label(&self) -> String {
        format!("{} — {} `{}`", self.user.username, self.title, self.id)
    }
}

/// Render tracks as a 1-based numbered list, one per line.
pub fn render_numbered<'a, I>(tracks: I) -> String
where
    I: IntoIterator<Item = &'a Track>,
{
    tracks
        .into_iter()
        .enumerate()
        .map(|(index, track)| format!("{}. {}", index + 1, track.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
