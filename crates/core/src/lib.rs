//! R-Droid Core - Shared types for the router
//!
//! This crate provides the error taxonomy, configuration and event bus
//! shared by the intent resolver, the URI permission authority and the
//! content gateway.

pub mod config;
pub mod events;
pub mod error;

pub use config::RouterConfig;
pub use events::{Event, EventBus, EventSubscription};
pub use error::{RDroidError, Result};

/// R-Droid Router version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "R-Droid Router";
