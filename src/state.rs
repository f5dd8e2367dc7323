//! Shared application state
//!
//! One `AppState` is created at startup and shared (via `Arc`) across all
//! request handlers. It is read-only for the lifetime of the process; call
//! sessions share nothing else.

use std::sync::Arc;

use crate::config::ServerConfig;

/// Application state available to every handler.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration, read-only after startup
    pub config: ServerConfig,
}

impl AppState {
    /// Wrap the configuration for sharing across handlers.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
