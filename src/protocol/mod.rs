pub mod events;
pub mod tracks;

pub use events::PushEvent;
pub use tracks::{Track, TrackUser};
