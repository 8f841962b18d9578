//! Android Manifest Import
//!
//! Parses AndroidManifest.xml into components, intent filters and provider
//! declarations, and installs them into the filter registry and the content
//! gateway.

pub mod parser;
pub mod manifest;
pub mod components;

pub use parser::{ManifestParser, ParseError};
pub use manifest::{AndroidManifest, ManifestApplication, ManifestMetadata, ManifestWarning};
pub use components::{ManifestComponent, Provider};
