//! Resource identifiers
//!
//! Android-style `scheme:scheme-specific-part#fragment` references. A URI
//! whose scheme-specific part starts with `/` (or that has no scheme at all)
//! is hierarchical and exposes authority, path and query; anything else is
//! opaque (`mailto:someone@example.com`, `tel:123`).

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use r_droid_core::{RDroidError, Result};

/// `content:` scheme served by content providers
pub const SCHEME_CONTENT: &str = "content";
/// `file:` scheme
pub const SCHEME_FILE: &str = "file";
/// `android.resource:` scheme
pub const SCHEME_ANDROID_RESOURCE: &str = "android.resource";

/// Characters left untouched by [`Uri::encode`]
const URI_UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'!')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*');

/// Parsed resource identifier
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri {
    raw: String,
    scheme: Option<String>,
    scheme_specific_part: String,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
    opaque: bool,
}

impl Uri {
    /// Parse a URI string
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(RDroidError::MalformedDescriptor("empty URI".into()));
        }
        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(RDroidError::MalformedDescriptor(format!(
                "URI contains whitespace or control characters: {:?}",
                input
            )));
        }

        let (before_fragment, fragment) = match input.find('#') {
            Some(idx) => (&input[..idx], Some(input[idx + 1..].to_string())),
            None => (input, None),
        };

        let scheme_end = before_fragment
            .find(|c| matches!(c, ':' | '/' | '?'))
            .filter(|&idx| before_fragment.as_bytes()[idx] == b':');

        let (scheme, ssp) = match scheme_end {
            Some(idx) => {
                let scheme = &before_fragment[..idx];
                validate_scheme(scheme, input)?;
                (Some(scheme.to_string()), &before_fragment[idx + 1..])
            }
            None => (None, before_fragment),
        };

        let opaque = scheme.is_some() && !ssp.starts_with('/');
        let (authority, path, query) = if opaque {
            (None, String::new(), None)
        } else {
            split_hierarchical(ssp)
        };

        Ok(Self {
            raw: input.to_string(),
            scheme,
            scheme_specific_part: ssp.to_string(),
            authority,
            path,
            query,
            fragment,
            opaque,
        })
    }

    /// Build a hierarchical `scheme://authority/path` URI
    pub fn hierarchical(scheme: &str, authority: &str, path: &str) -> Result<Self> {
        let path = if path.is_empty() || path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self::parse(&format!("{}://{}{}", scheme, authority, path))
    }

    /// Build a `content://authority/path` URI
    pub fn content(authority: &str, path: &str) -> Result<Self> {
        Self::hierarchical(SCHEME_CONTENT, authority, path)
    }

    /// Full string form
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Scheme, exactly as written
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Everything between the scheme separator and the fragment
    pub fn scheme_specific_part(&self) -> &str {
        &self.scheme_specific_part
    }

    /// Authority (`user@host:port`) of a hierarchical URI
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Host part of the authority
    pub fn host(&self) -> Option<&str> {
        let authority = self.authority.as_deref()?;
        let host_port = authority.rsplit_once('@').map(|(_, hp)| hp).unwrap_or(authority);
        let host = if host_port.starts_with('[') {
            // IPv6 literal keeps its colons
            match host_port.find(']') {
                Some(end) => &host_port[..=end],
                None => host_port,
            }
        } else {
            host_port.split(':').next().unwrap_or(host_port)
        };
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    /// Port of the authority, when present and numeric
    pub fn port(&self) -> Option<u16> {
        let authority = self.authority.as_deref()?;
        let host_port = authority.rsplit_once('@').map(|(_, hp)| hp).unwrap_or(authority);
        let after_host = if host_port.starts_with('[') {
            host_port.find(']').map(|end| &host_port[end + 1..]).unwrap_or("")
        } else {
            host_port.find(':').map(|idx| &host_port[idx..]).unwrap_or("")
        };
        after_host.strip_prefix(':').and_then(|p| p.parse().ok())
    }

    /// Encoded path (empty for opaque URIs)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded, non-empty path segments
    pub fn path_segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect()
    }

    /// Encoded query
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Encoded fragment
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True for `scheme:ssp` URIs whose ssp does not start with `/`
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// True when the URI has authority/path structure
    pub fn is_hierarchical(&self) -> bool {
        !self.opaque
    }

    /// True when no scheme is present
    pub fn is_relative(&self) -> bool {
        self.scheme.is_none()
    }

    /// True for `content:` URIs
    pub fn is_content(&self) -> bool {
        self.scheme.as_deref() == Some(SCHEME_CONTENT)
    }

    /// Copy of this URI with a lower-cased scheme
    pub fn normalize_scheme(&self) -> Self {
        match &self.scheme {
            Some(scheme) if scheme.chars().any(|c| c.is_ascii_uppercase()) => {
                let mut normalized = self.clone();
                let lower = scheme.to_ascii_lowercase();
                normalized.raw = format!("{}{}", lower, &self.raw[scheme.len()..]);
                normalized.scheme = Some(lower);
                normalized
            }
            _ => self.clone(),
        }
    }

    /// Same scheme and authority, and `prefix`'s path segments lead `self`'s
    pub fn is_path_prefix_match(&self, prefix: &Uri) -> bool {
        if self.scheme != prefix.scheme || self.authority != prefix.authority {
            return false;
        }
        let target = self.path_segments();
        let leading = prefix.path_segments();
        leading.len() <= target.len() && leading.iter().zip(target.iter()).all(|(a, b)| a == b)
    }

    /// `content://authority` root of this URI
    pub fn authority_root(&self) -> Option<Uri> {
        let scheme = self.scheme.as_deref()?;
        let authority = self.authority.as_deref()?;
        Self::parse(&format!("{}://{}", scheme, authority)).ok()
    }

    /// Copy with one more encoded path segment appended
    pub fn with_appended_path(&self, segment: &str) -> Result<Self> {
        let mut base = match &self.scheme {
            Some(scheme) => format!("{}:", scheme),
            None => String::new(),
        };
        if let Some(authority) = &self.authority {
            base.push_str("//");
            base.push_str(authority);
        }
        base.push_str(self.path.trim_end_matches('/'));
        base.push('/');
        base.push_str(&Self::encode(segment));
        if let Some(query) = &self.query {
            base.push('?');
            base.push_str(query);
        }
        Self::parse(&base)
    }

    /// Percent-encode with the Android `Uri.encode` alphabet
    pub fn encode(value: &str) -> String {
        utf8_percent_encode(value, URI_UNRESERVED).to_string()
    }

    /// Percent-decode, failing on invalid UTF-8
    pub fn decode(value: &str) -> Result<String> {
        percent_decode_str(value)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|e| RDroidError::MalformedDescriptor(format!("invalid escape in {:?}: {}", value, e)))
    }
}

fn validate_scheme(scheme: &str, input: &str) -> Result<()> {
    let mut chars = scheme.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic()
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RDroidError::MalformedDescriptor(format!("invalid scheme in URI {:?}", input)))
    }
}

fn split_hierarchical(ssp: &str) -> (Option<String>, String, Option<String>) {
    let (before_query, query) = match ssp.find('?') {
        Some(idx) => (&ssp[..idx], Some(ssp[idx + 1..].to_string())),
        None => (ssp, None),
    };

    match before_query.strip_prefix("//") {
        Some(rest) => {
            let path_start = rest.find('/').unwrap_or(rest.len());
            (
                Some(rest[..path_start].to_string()),
                rest[path_start..].to_string(),
                query,
            )
        }
        None => (None, before_query.to_string(), query),
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({})", self.raw)
    }
}

impl FromStr for Uri {
    type Err = RDroidError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = RDroidError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_uri() {
        let uri = Uri::parse("content://contacts/people/1?limit=5#top").unwrap();
        assert_eq!(uri.scheme(), Some("content"));
        assert_eq!(uri.authority(), Some("contacts"));
        assert_eq!(uri.host(), Some("contacts"));
        assert_eq!(uri.path(), "/people/1");
        assert_eq!(uri.path_segments(), vec!["people", "1"]);
        assert_eq!(uri.query(), Some("limit=5"));
        assert_eq!(uri.fragment(), Some("top"));
        assert!(uri.is_hierarchical());
        assert!(uri.is_content());
    }

    #[test]
    fn test_parse_opaque_uri() {
        let uri = Uri::parse("mailto:someone@example.com").unwrap();
        assert!(uri.is_opaque());
        assert_eq!(uri.scheme_specific_part(), "someone@example.com");
        assert_eq!(uri.authority(), None);
        assert_eq!(uri.path(), "");
    }

    #[test]
    fn test_host_and_port() {
        let uri = Uri::parse("https://user@example.com:8443/a").unwrap();
        assert_eq!(uri.host(), Some("example.com"));
        assert_eq!(uri.port(), Some(8443));

        let v6 = Uri::parse("http://[::1]:80/").unwrap();
        assert_eq!(v6.host(), Some("[::1]"));
        assert_eq!(v6.port(), Some(80));
    }

    #[test]
    fn test_relative_uri() {
        let uri = Uri::parse("/sdcard/file.txt").unwrap();
        assert!(uri.is_relative());
        assert_eq!(uri.path(), "/sdcard/file.txt");
    }

    #[test]
    fn test_malformed_uris() {
        assert!(matches!(Uri::parse(""), Err(RDroidError::MalformedDescriptor(_))));
        assert!(matches!(Uri::parse("1http://x"), Err(RDroidError::MalformedDescriptor(_))));
        assert!(matches!(Uri::parse("content://a b/c"), Err(RDroidError::MalformedDescriptor(_))));
    }

    #[test]
    fn test_path_prefix_match_is_segment_based() {
        let prefix = Uri::parse("content://media/external/images").unwrap();
        let inside = Uri::parse("content://media/external/images/42").unwrap();
        let sibling = Uri::parse("content://media/external/images2/42").unwrap();
        let other_authority = Uri::parse("content://other/external/images/42").unwrap();

        assert!(inside.is_path_prefix_match(&prefix));
        assert!(prefix.is_path_prefix_match(&prefix));
        assert!(!sibling.is_path_prefix_match(&prefix));
        assert!(!other_authority.is_path_prefix_match(&prefix));
    }

    #[test]
    fn test_normalize_scheme() {
        let uri = Uri::parse("HTTP://Example.com/Path").unwrap();
        let normalized = uri.normalize_scheme();
        assert_eq!(normalized.as_str(), "http://Example.com/Path");
        assert_eq!(normalized.scheme(), Some("http"));
    }

    #[test]
    fn test_encode_alphabet() {
        assert_eq!(Uri::encode("a b;c=d"), "a%20b%3Bc%3Dd");
        assert_eq!(Uri::encode("keep_-!.~'()*"), "keep_-!.~'()*");
        assert_eq!(Uri::decode("a%20b").unwrap(), "a b");
    }

    #[test]
    fn test_appended_path_and_root() {
        let base = Uri::content("com.example.notes", "/notes").unwrap();
        let item = base.with_appended_path("7").unwrap();
        assert_eq!(item.as_str(), "content://com.example.notes/notes/7");
        assert_eq!(item.authority_root().unwrap().as_str(), "content://com.example.notes");
    }
}
