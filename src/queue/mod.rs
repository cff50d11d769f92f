use std::collections::VecDeque;

use crate::common::types::TrackId;
use crate::protocol::tracks::Track;

/// Playback phase of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Per-channel queue state.
///
/// Created lazily on the first dispatched command for a channel, kept for
/// the process lifetime, never persisted. Invariant: a track dequeued into
/// `current` leaves the queue; `current` is empty only when the queue was
/// empty at the last advance (or nothing was ever loaded).
#[derive(Debug, Default)]
pub struct QueueState {
    /// Insertion order is playback order.
    queue: VecDeque<Track>,
    current: Option<Track>,
    playback: Playback,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Append a track at the tail of the queue.
    pub fn enqueue(&mut self, track: Track) {
        self.queue.push_back(track);
    }

    /// Load a track directly as the current one, leaving the queue
    /// untouched. Used by the `add` bypass on an idle channel.
    pub fn load_current(&mut self, track: Track) {
        self.current = Some(track);
    }

    /// Remove the first queued track with the given id, preserving the
    /// relative order of the rest. Returns the removed track, if any.
    pub fn remove_by_id(&mut self, id: TrackId) -> Option<Track> {
        let position = self.queue.iter().position(|track| track.id == id)?;
        self.queue.remove(position)
    }

    /// Dequeue the head into `current`. An empty queue clears `current`.
    /// Returns the new current track.
    pub fn advance(&mut self) -> Option<&Track> {
        self.current = self.queue.pop_front();
        self.current.as_ref()
    }

    pub fn play(&mut self) {
        self.playback = Playback::Playing;
    }

    pub fn pause(&mut self) {
        self.playback = Playback::Paused;
    }

    pub fn stop(&mut self) {
        self.playback = Playback::Stopped;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
