pub mod commands;
pub mod common;
pub mod config;
pub mod protocol;
pub mod queue;
pub mod rtm;
pub mod server;
pub mod sources;

pub use config::Config;
pub use server::AppState;
