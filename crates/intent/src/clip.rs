//! Clip data
//!
//! Additional URIs (or nested descriptors) that travel with a descriptor and
//! receive the same grant flags as its data.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::uri::Uri;

/// One clip item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipItem {
    pub text: Option<String>,
    pub uri: Option<Uri>,
    pub intent: Option<Box<Intent>>,
}

impl ClipItem {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn uri(uri: Uri) -> Self {
        Self {
            uri: Some(uri),
            ..Default::default()
        }
    }

    pub fn intent(intent: Intent) -> Self {
        Self {
            intent: Some(Box::new(intent)),
            ..Default::default()
        }
    }
}

/// Payload of additional items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipData {
    pub label: Option<String>,
    pub mime_types: Vec<String>,
    pub items: Vec<ClipItem>,
}

impl ClipData {
    /// Clip holding a single URI
    pub fn new_uri(label: &str, uri: Uri) -> Self {
        Self {
            label: Some(label.to_string()),
            mime_types: Vec::new(),
            items: vec![ClipItem::uri(uri)],
        }
    }

    pub fn add_item(&mut self, item: ClipItem) {
        self.items.push(item);
    }

    /// URIs carried directly by the items (not inside nested descriptors)
    pub fn uris(&self) -> impl Iterator<Item = &Uri> {
        self.items.iter().filter_map(|item| item.uri.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uris_skips_text_items() {
        let mut clip = ClipData::new_uri("photos", Uri::parse("content://media/1").unwrap());
        clip.add_item(ClipItem::text("caption"));
        clip.add_item(ClipItem::uri(Uri::parse("content://media/2").unwrap()));

        let uris: Vec<_> = clip.uris().map(|u| u.as_str()).collect();
        assert_eq!(uris, vec!["content://media/1", "content://media/2"]);
    }
}
