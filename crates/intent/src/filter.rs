//! Intent Filters
//!
//! Handles intent-filter, action, category, and data rules and matches
//! descriptors against them.

use serde::{Deserialize, Serialize};

use r_droid_core::{RDroidError, Result};

use crate::intent::{actions, categories, Intent};
use crate::mime::{mime_type_matches, validate_mime_type};
use crate::pattern::PatternMatcher;
use crate::uri::{Uri, SCHEME_CONTENT, SCHEME_FILE};

/// Quality of a successful match, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCategory {
    /// Neither filter nor descriptor carries data
    Empty,
    Scheme,
    Host,
    Port,
    Path,
    Type,
}

/// Why a filter rejected a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoMatch {
    Action,
    Category(String),
    Data,
    Type,
}

/// Intent filter for components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentFilter {
    /// Accepted actions; empty accepts any action
    #[serde(default)]
    pub actions: Vec<String>,

    /// Declared categories
    #[serde(default)]
    pub categories: Vec<String>,

    /// Data specifications
    #[serde(default)]
    pub data: Vec<IntentData>,

    /// Priority
    #[serde(default)]
    pub priority: i32,

    /// Auto verify (for App Links)
    #[serde(default)]
    pub auto_verify: bool,
}

impl IntentFilter {
    /// Create a filter accepting one action
    pub fn new(action: &str) -> Self {
        Self {
            actions: vec![action.to_string()],
            ..Default::default()
        }
    }

    /// Create a launcher intent filter (MAIN + LAUNCHER)
    pub fn launcher() -> Self {
        Self {
            actions: vec![actions::MAIN.to_string()],
            categories: vec![categories::LAUNCHER.to_string()],
            ..Default::default()
        }
    }

    /// Create a VIEW intent filter for deep links
    pub fn deep_link(scheme: &str, host: &str) -> Self {
        Self {
            actions: vec![actions::VIEW.to_string()],
            categories: vec![categories::DEFAULT.to_string(), categories::BROWSABLE.to_string()],
            data: vec![IntentData::url(scheme, host)],
            ..Default::default()
        }
    }

    /// Create an App Link intent filter (verified)
    pub fn app_link(host: &str, path_prefix: Option<&str>) -> Self {
        Self {
            actions: vec![actions::VIEW.to_string()],
            categories: vec![categories::DEFAULT.to_string(), categories::BROWSABLE.to_string()],
            data: vec![IntentData {
                scheme: Some("https".to_string()),
                host: Some(host.to_string()),
                path_prefix: path_prefix.map(|s| s.to_string()),
                ..Default::default()
            }],
            auto_verify: true,
            ..Default::default()
        }
    }

    /// Create a filter for an action on a MIME type
    pub fn mime(action: &str, mime_type: &str) -> Self {
        Self {
            actions: vec![action.to_string()],
            categories: vec![categories::DEFAULT.to_string()],
            data: vec![IntentData::mime(mime_type)],
            ..Default::default()
        }
    }

    pub fn add_action(mut self, action: &str) -> Self {
        self.actions.push(action.to_string());
        self
    }

    pub fn add_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_string());
        self
    }

    pub fn add_data(mut self, data: IntentData) -> Self {
        self.data.push(data);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check if this is a launcher intent filter
    pub fn is_launcher(&self) -> bool {
        self.has_action(actions::MAIN) && self.has_category(categories::LAUNCHER)
    }

    /// Check if this is a deep link / app link filter
    pub fn is_deep_link(&self) -> bool {
        self.has_action(actions::VIEW) && self.has_category(categories::BROWSABLE)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Reject rules that can never be evaluated consistently
    pub fn validate(&self) -> Result<()> {
        for entry in &self.data {
            entry.validate()?;
        }
        Ok(())
    }

    /// Action test: an empty action list accepts any descriptor
    pub fn match_action(&self, action: Option<&str>) -> bool {
        if self.actions.is_empty() {
            return true;
        }
        match action {
            Some(action) => self.has_action(action),
            None => false,
        }
    }

    /// Category test: returns the first descriptor category the filter lacks
    pub fn match_categories<'a, I>(&self, wanted: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a String>,
    {
        wanted
            .into_iter()
            .find(|category| !self.has_category(category))
            .map(|category| category.as_str())
    }

    /// Data test against an effective type and data reference
    pub fn match_data(&self, mime_type: Option<&str>, data: Option<&Uri>) -> std::result::Result<MatchCategory, NoMatch> {
        if self.data.is_empty() {
            return match (mime_type, data) {
                (None, None) => Ok(MatchCategory::Empty),
                (_, Some(_)) => Err(NoMatch::Data),
                (Some(_), None) => Err(NoMatch::Type),
            };
        }
        if mime_type.is_none() && data.is_none() {
            return Err(NoMatch::Data);
        }

        let mut best: Option<MatchCategory> = None;
        let mut first_failure = NoMatch::Data;
        for (idx, entry) in self.data.iter().enumerate() {
            match entry.match_entry(mime_type, data) {
                Ok(category) => best = Some(best.map_or(category, |b| b.max(category))),
                Err(reason) if idx == 0 => first_failure = reason,
                Err(_) => {}
            }
        }
        best.ok_or(first_failure)
    }

    /// Full match of a descriptor whose effective type is already known
    pub fn match_intent(
        &self,
        intent: &Intent,
        effective_type: Option<&str>,
    ) -> std::result::Result<MatchCategory, NoMatch> {
        if !self.match_action(intent.action()) {
            return Err(NoMatch::Action);
        }
        if let Some(missing) = self.match_categories(intent.categories()) {
            return Err(NoMatch::Category(missing.to_string()));
        }
        self.match_data(effective_type, intent.data())
    }
}

/// Intent data specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentData {
    /// URI scheme (http, https, content, custom)
    pub scheme: Option<String>,

    /// Host; `*` matches any, `*.example.com` matches by suffix
    pub host: Option<String>,

    /// Port
    pub port: Option<String>,

    /// Exact path
    pub path: Option<String>,

    /// Path prefix
    pub path_prefix: Option<String>,

    /// Path suffix
    pub path_suffix: Option<String>,

    /// Path pattern (with wildcards)
    pub path_pattern: Option<String>,

    /// MIME type
    pub mime_type: Option<String>,
}

impl IntentData {
    /// Create for a URL scheme
    pub fn url(scheme: &str, host: &str) -> Self {
        Self {
            scheme: Some(scheme.to_string()),
            host: Some(host.to_string()),
            ..Default::default()
        }
    }

    /// Create for HTTPS
    pub fn https(host: &str) -> Self {
        Self::url("https", host)
    }

    /// Create for a MIME type
    pub fn mime(mime_type: &str) -> Self {
        Self {
            mime_type: Some(mime_type.to_string()),
            ..Default::default()
        }
    }

    /// Create for provider content of a given type under any authority
    pub fn content(mime_type: &str) -> Self {
        Self {
            scheme: Some(SCHEME_CONTENT.to_string()),
            host: Some("*".to_string()),
            mime_type: Some(mime_type.to_string()),
            ..Default::default()
        }
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = Some(prefix.to_string());
        self
    }

    pub fn with_path_pattern(mut self, pattern: &str) -> Self {
        self.path_pattern = Some(pattern.to_string());
        self
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    fn has_path_spec(&self) -> bool {
        self.path.is_some() || self.path_prefix.is_some() || self.path_suffix.is_some() || self.path_pattern.is_some()
    }

    fn path_matchers(&self) -> Vec<PatternMatcher> {
        let mut matchers = Vec::new();
        if let Some(path) = &self.path {
            matchers.push(PatternMatcher::literal(path));
        }
        if let Some(prefix) = &self.path_prefix {
            matchers.push(PatternMatcher::prefix(prefix));
        }
        if let Some(suffix) = &self.path_suffix {
            matchers.push(PatternMatcher::suffix(suffix));
        }
        if let Some(pattern) = &self.path_pattern {
            matchers.push(PatternMatcher::glob(pattern));
        }
        matchers
    }

    /// Reject entries that can never be evaluated consistently
    pub fn validate(&self) -> Result<()> {
        if let Some(mime_type) = &self.mime_type {
            validate_mime_type(mime_type)?;
        }
        if self.scheme.is_none() {
            if self.mime_type.is_none() {
                return Err(RDroidError::MalformedDescriptor(
                    "data entry declares neither scheme nor MIME type".into(),
                ));
            }
            if self.host.is_some() || self.has_path_spec() {
                return Err(RDroidError::MalformedDescriptor(
                    "data entry declares host or path without a scheme".into(),
                ));
            }
        }
        if self.port.is_some() && self.host.is_none() {
            return Err(RDroidError::MalformedDescriptor("data entry declares port without host".into()));
        }
        if let Some(port) = &self.port {
            port.parse::<u16>()
                .map_err(|_| RDroidError::MalformedDescriptor(format!("invalid port {:?}", port)))?;
        }
        if self.path_matchers().iter().any(|m| m.is_malformed()) {
            return Err(RDroidError::MalformedDescriptor("path pattern ends in a dangling escape".into()));
        }
        Ok(())
    }

    /// Match one entry against an effective type and data reference
    pub fn match_entry(&self, mime_type: Option<&str>, data: Option<&Uri>) -> std::result::Result<MatchCategory, NoMatch> {
        let uri_category = match &self.scheme {
            Some(scheme) => {
                let data = data.ok_or(NoMatch::Data)?;
                if data.scheme() != Some(scheme.as_str()) {
                    return Err(NoMatch::Data);
                }
                self.match_authority_and_path(data)?
            }
            // Type-only entries accept no data, or local content/file data.
            None => match data.and_then(|d| d.scheme()) {
                None | Some(SCHEME_CONTENT) | Some(SCHEME_FILE) => MatchCategory::Empty,
                Some(_) => return Err(NoMatch::Data),
            },
        };

        match (&self.mime_type, mime_type) {
            (Some(filter_type), Some(wanted)) if mime_type_matches(filter_type, wanted) => Ok(MatchCategory::Type),
            (Some(_), _) => Err(NoMatch::Type),
            (None, Some(_)) => Err(NoMatch::Type),
            (None, None) => Ok(uri_category),
        }
    }

    fn match_authority_and_path(&self, data: &Uri) -> std::result::Result<MatchCategory, NoMatch> {
        let mut category = MatchCategory::Scheme;

        if let Some(host) = &self.host {
            let actual = data.host().ok_or(NoMatch::Data)?;
            let matched = match host.strip_prefix('*') {
                Some(suffix) => actual.ends_with(suffix),
                None => actual == host,
            };
            if !matched {
                return Err(NoMatch::Data);
            }
            category = MatchCategory::Host;

            if let Some(port) = &self.port {
                if data.port() != port.parse::<u16>().ok() {
                    return Err(NoMatch::Data);
                }
                category = MatchCategory::Port;
            }
        }

        if self.has_path_spec() {
            let path = data.path();
            if !self.path_matchers().iter().any(|m| m.matches(path)) {
                return Err(NoMatch::Data);
            }
            category = MatchCategory::Path;
        }

        Ok(category)
    }
}
