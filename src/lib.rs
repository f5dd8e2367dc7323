pub mod config;
pub mod core;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::upstream::{UpstreamChannel, UpstreamConfig, UpstreamEvent};
pub use state::AppState;
