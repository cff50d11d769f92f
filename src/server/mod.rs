pub mod app_state;
pub mod http;
pub mod push;

pub use app_state::AppState;
pub use push::Broadcaster;
