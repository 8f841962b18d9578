//! MIME type handling
//!
//! Normalization and wildcard matching. Matching is case-sensitive, so
//! types coming from outside the platform should go through
//! [`normalize_mime_type`] first.

use r_droid_core::{RDroidError, Result};

/// Base type of a single provider row
pub const CURSOR_ITEM_BASE_TYPE: &str = "vnd.android.cursor.item";
/// Base type of a provider directory (multiple rows)
pub const CURSOR_DIR_BASE_TYPE: &str = "vnd.android.cursor.dir";
/// Any single-row provider type
pub const ANY_CURSOR_ITEM_TYPE: &str = "vnd.android.cursor.item/*";
/// Matches every type
pub const ANY_TYPE: &str = "*/*";

/// Lower-case, trim and strip parameters from a MIME type.
///
/// `normalize_mime_type("TEXT/Plain; charset=utf-8") == "text/plain"`, and
/// the function is idempotent.
pub fn normalize_mime_type(mime_type: &str) -> String {
    let without_params = match mime_type.find(';') {
        Some(idx) => &mime_type[..idx],
        None => mime_type,
    };
    without_params.trim().to_ascii_lowercase()
}

/// Validate `type/subtype` syntax
pub fn validate_mime_type(mime_type: &str) -> Result<()> {
    let malformed = || RDroidError::MalformedDescriptor(format!("malformed MIME type {:?}", mime_type));

    let (base, sub) = mime_type.split_once('/').ok_or_else(malformed)?;
    let token = |s: &str| {
        !s.is_empty()
            && s.chars().all(|c| {
                c.is_ascii_alphanumeric() || matches!(c, '*' | '.' | '+' | '-' | '_' | '!' | '#' | '$' | '&' | '^')
            })
    };
    if token(base) && token(sub) && !sub.contains('/') {
        Ok(())
    } else {
        Err(malformed())
    }
}

/// Split into `(base, subtype)`
pub fn split_mime_type(mime_type: &str) -> Option<(&str, &str)> {
    mime_type.split_once('/')
}

/// True when `mime_type` ends in the `/*` wildcard subtype
pub fn is_wildcard(mime_type: &str) -> bool {
    mime_type == "*" || mime_type.ends_with("/*")
}

/// Match a descriptor type against a filter type.
///
/// The filter side may be `*/*`, `base/*` or exact. A wildcard on the
/// descriptor side (`*/*` or `base/*`) matches any filter type it covers.
pub fn mime_type_matches(filter_type: &str, descriptor_type: &str) -> bool {
    if filter_type == descriptor_type || filter_type == ANY_TYPE || filter_type == "*" {
        return true;
    }
    if descriptor_type == ANY_TYPE || descriptor_type == "*" {
        return true;
    }

    let (filter_base, filter_sub) = match split_mime_type(filter_type) {
        Some(parts) => parts,
        None => return false,
    };
    let (descriptor_base, descriptor_sub) = match split_mime_type(descriptor_type) {
        Some(parts) => parts,
        None => return false,
    };

    filter_base == descriptor_base && (filter_sub == "*" || descriptor_sub == "*")
}

/// Build a provider item type, e.g. `vnd.android.cursor.item/contact`
pub fn cursor_item_type(subtype: &str) -> String {
    format!("{}/{}", CURSOR_ITEM_BASE_TYPE, subtype)
}

/// Build a provider directory type, e.g. `vnd.android.cursor.dir/contact`
pub fn cursor_dir_type(subtype: &str) -> String {
    format!("{}/{}", CURSOR_DIR_BASE_TYPE, subtype)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_mime_type("TEXT/Plain; charset=utf-8"), "text/plain");
        assert_eq!(normalize_mime_type("  image/PNG  "), "image/png");
        assert_eq!(normalize_mime_type("text/html ;q=1"), "text/html");
    }

    #[test]
    fn test_validate() {
        assert!(validate_mime_type("vnd.android.cursor.item/contact").is_ok());
        assert!(validate_mime_type("image/*").is_ok());
        assert!(validate_mime_type("*/*").is_ok());
        assert!(validate_mime_type("image").is_err());
        assert!(validate_mime_type("/png").is_err());
        assert!(validate_mime_type("a/b/c").is_err());
    }

    #[test]
    fn test_wildcards() {
        assert!(mime_type_matches("*/*", "text/plain"));
        assert!(mime_type_matches("image/*", "image/png"));
        assert!(!mime_type_matches("image/*", "video/mp4"));
        assert!(mime_type_matches("image/png", "image/*"));
        assert!(mime_type_matches("image/png", "*/*"));
        assert!(!mime_type_matches(
            &cursor_item_type("contact"),
            &cursor_dir_type("contact")
        ));
        assert!(mime_type_matches(ANY_CURSOR_ITEM_TYPE, &cursor_item_type("contact")));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(input in "[ -~]{0,40}") {
            let once = normalize_mime_type(&input);
            prop_assert_eq!(normalize_mime_type(&once), once);
        }
    }
}
