pub mod cli;
pub mod client;
pub mod config;
pub mod ipc;
pub mod tasks;
pub mod ui;

// Re-export auth so main.rs can use taskd::auth directly.
pub use ipc::auth;

use std::sync::Arc;

use config::TaskdConfig;
use ipc::event::EventBroadcaster;
use tasks::TaskStore;

/// Shared application state passed to every RPC handler.
///
/// The task store is owned here and injected, never process-global: tests
/// build their own contexts.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<TaskdConfig>,
    pub store: Arc<TaskStore>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub started_at: std::time::Instant,
    /// Local WebSocket auth token.  Every new connection must send a
    /// `daemon.auth` RPC with this token before any other method call.
    /// Empty string means auth is disabled (used by tests).
    pub auth_token: String,
}
