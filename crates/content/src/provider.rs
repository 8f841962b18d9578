//! Data Access Gateway contract
//!
//! A provider owns the data behind one authority. Implementations supply
//! the required methods; the rest have defaults. Providers never see a
//! caller identity: the [`ContentResolver`](crate::ContentResolver) has
//! already checked access before any method here runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use r_droid_core::{RDroidError, Result};
use r_droid_intent::mime::{mime_type_matches, ANY_TYPE};
use r_droid_intent::{Bundle, Uri};

use crate::cursor::{AssetStream, RowStream};
use crate::grant::ModeFlags;

/// Column values for insert and update
pub type ContentValues = Bundle;

/// Metadata of an installed provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub authority: String,
    pub package: String,
    pub owner_uid: u32,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub grant_uri_permissions: bool,
}

impl ProviderInfo {
    pub fn new(authority: &str, package: &str, owner_uid: u32) -> Self {
        Self {
            authority: authority.to_string(),
            package: package.to_string(),
            owner_uid,
            class_name: None,
            exported: false,
            grant_uri_permissions: false,
        }
    }

    /// Allow the owner (and holders) to grant URI permissions
    pub fn granting(mut self) -> Self {
        self.grant_uri_permissions = true;
        self
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }
}

/// Open mode of a file descriptor request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Read,
    Write,
    WriteAppend,
    WriteTruncate,
    ReadWrite,
    ReadWriteTruncate,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Read => "r",
            FileMode::Write => "w",
            FileMode::WriteAppend => "wa",
            FileMode::WriteTruncate => "wt",
            FileMode::ReadWrite => "rw",
            FileMode::ReadWriteTruncate => "rwt",
        }
    }

    /// Access modes a caller needs for this open mode
    pub fn required_access(&self) -> ModeFlags {
        match self {
            FileMode::Read => ModeFlags::READ,
            FileMode::Write | FileMode::WriteAppend | FileMode::WriteTruncate => ModeFlags::WRITE,
            FileMode::ReadWrite | FileMode::ReadWriteTruncate => ModeFlags::READ | ModeFlags::WRITE,
        }
    }
}

impl FromStr for FileMode {
    type Err = RDroidError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(FileMode::Read),
            "w" => Ok(FileMode::Write),
            "wa" => Ok(FileMode::WriteAppend),
            "wt" => Ok(FileMode::WriteTruncate),
            "rw" => Ok(FileMode::ReadWrite),
            "rwt" => Ok(FileMode::ReadWriteTruncate),
            other => Err(RDroidError::MalformedDescriptor(format!("bad file mode {:?}", other))),
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource-owner side of the gateway
pub trait ContentProvider: Send + Sync {
    /// Called once when the provider is installed
    fn on_create(&self) -> Result<()>;

    /// MIME type of the data at `uri`
    fn get_type(&self, uri: &Uri) -> Option<String>;

    /// Rows under `uri`. `args` carries the `QUERY_ARG_*` vocabulary.
    ///
    /// Long-running implementations should poll `cancel` and stop with
    /// [`RDroidError::CancellationRequested`].
    fn query(
        &self,
        uri: &Uri,
        projection: Option<&[String]>,
        args: &Bundle,
        cancel: &CancellationToken,
    ) -> Result<RowStream>;

    /// Insert a row, returning its URI
    fn insert(&self, uri: &Uri, values: &ContentValues, extras: &Bundle) -> Result<Option<Uri>>;

    /// Number of rows changed
    fn update(&self, uri: &Uri, values: &ContentValues, args: &Bundle) -> Result<usize>;

    /// Number of rows deleted
    fn delete(&self, uri: &Uri, args: &Bundle) -> Result<usize>;

    /// Insert each row in turn, counting the ones that produced a URI
    fn bulk_insert(&self, uri: &Uri, values: &[ContentValues]) -> Result<usize> {
        let empty = Bundle::new();
        let mut inserted = 0;
        for row in values {
            if self.insert(uri, row, &empty)?.is_some() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn open_file(&self, uri: &Uri, mode: FileMode, _cancel: &CancellationToken) -> Result<AssetStream> {
        Err(RDroidError::Unsupported(format!("no files found at {} (mode {})", uri, mode)))
    }

    /// Stream types available for `uri` that match `mime_filter`
    fn get_stream_types(&self, _uri: &Uri, _mime_filter: &str) -> Vec<String> {
        Vec::new()
    }

    /// Open `uri` as a stream of a type matching `mime_filter`.
    ///
    /// The default opens the plain file when the filter is `*/*` or covers
    /// the type reported by [`ContentProvider::get_type`].
    fn open_typed_asset_file(
        &self,
        uri: &Uri,
        mime_filter: &str,
        _opts: &Bundle,
        cancel: &CancellationToken,
    ) -> Result<AssetStream> {
        if mime_filter == ANY_TYPE {
            return self.open_file(uri, FileMode::Read, cancel);
        }
        match self.get_type(uri) {
            Some(mime_type) if mime_type_matches(mime_filter, &mime_type) => {
                Ok(self.open_file(uri, FileMode::Read, cancel)?.with_mime_type(&mime_type))
            }
            _ => Err(RDroidError::NotFound(format!("can't open {} as type {}", uri, mime_filter))),
        }
    }

    /// Stable form of `uri`, if the provider has one
    fn canonicalize(&self, _uri: &Uri) -> Option<Uri> {
        None
    }

    fn uncanonicalize(&self, uri: &Uri) -> Uri {
        uri.clone()
    }

    /// Ask the provider to refresh `uri`; false when unsupported
    fn refresh(&self, _uri: &Uri, _args: &Bundle, _cancel: &CancellationToken) -> bool {
        false
    }

    /// Provider-specific method call
    fn call(&self, _method: &str, _arg: Option<&str>, _extras: &Bundle) -> Result<Option<Bundle>> {
        Ok(None)
    }

    /// Called when the provider is removed
    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_modes() {
        assert_eq!("r".parse::<FileMode>().unwrap().required_access(), ModeFlags::READ);
        assert_eq!("wa".parse::<FileMode>().unwrap().required_access(), ModeFlags::WRITE);
        assert_eq!("rwt".parse::<FileMode>().unwrap().required_access(), ModeFlags::all());
        assert!("x".parse::<FileMode>().is_err());
    }
}
