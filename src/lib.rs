// loadorder - load order and active plugin management for Bethesda games
//
// This is the library crate containing the load order model and its
// persistence layer. The binary crate (main.rs) provides a small
// command-line inspector on top of it.

pub mod error;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use models::{GameId, GameProfile, LoadOrderMethod, PluginEntry, PluginName};
pub use services::{LoadOrder, LoadOrderManager, MAX_ACTIVE_PLUGINS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
