//! R-Droid Router
//!
//! Intent resolution and URI permission core for Android component
//! communication.
//!
//! ## Architecture
//!
//! - `r-droid-core`: error taxonomy, configuration and event bus
//! - `r-droid-intent`: capability descriptors, filters, registry and resolver
//! - `r-droid-content`: URI permission authority and the content gateway
//! - `r-droid-manifest-manager`: AndroidManifest.xml import

#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use r_droid_content as content;
pub use r_droid_core as core;
pub use r_droid_intent as intent;
pub use r_droid_manifest_manager as manifest;

/// Prelude module for convenient imports
pub mod prelude {
    pub use r_droid_content::{
        ContentProvider, ContentResolver, GrantFlags, Identity, ModeFlags, UriPermissionAuthority,
    };
    pub use r_droid_core::config::RouterConfig;
    pub use r_droid_core::{RDroidError, Result};
    pub use r_droid_intent::{FilterRegistry, Intent, IntentFilter, Resolver, Uri};
    pub use r_droid_manifest_manager::ManifestParser;
}
