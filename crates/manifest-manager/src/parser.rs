//! AndroidManifest.xml Parser
//!
//! Parses Android manifest files into structured data.
//!
//! `<data>` elements inside one `<intent-filter>` are not independent rules:
//! Android collects their schemes, authorities, paths and types separately
//! and matches any combination. The parser expands that cross product into
//! one [`IntentData`] per combination. Authorities are only kept when the
//! filter declares a scheme, and paths only when it declares an authority.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use r_droid_core::RDroidError;
use r_droid_intent::{ComponentKind, IntentData, IntentFilter};

use crate::components::{ManifestComponent, Provider};
use crate::manifest::{AndroidManifest, ManifestApplication, ManifestMetadata};

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Invalid manifest structure: {0}")]
    InvalidStructure(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for RDroidError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Io(io) => RDroidError::Io(io),
            other => RDroidError::XmlParse(other.to_string()),
        }
    }
}

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file from path
    pub async fn parse_file(path: impl AsRef<Path>) -> Result<AndroidManifest, ParseError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse_string(&content)
    }

    /// Parse manifest from string
    pub fn parse_string(xml: &str) -> Result<AndroidManifest, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut state = ParseState::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => state.open(e)?,
                Ok(Event::Empty(ref e)) => {
                    state.open(e)?;
                    state.close(e.name().as_ref());
                }
                Ok(Event::End(ref e)) => state.close(e.name().as_ref()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        if !state.seen_manifest {
            return Err(ParseError::InvalidStructure("missing <manifest> root element".into()));
        }
        debug!(
            "Parsed manifest for {} with {} components",
            state.manifest.package,
            state.manifest.components().len()
        );
        Ok(state.manifest)
    }

    /// Get an android: namespaced attribute
    fn get_android_attr(e: &BytesStart, name: &str) -> Option<String> {
        let android_name = format!("android:{}", name);
        Self::get_attr(e, &android_name)
    }

    /// Get an attribute by its qualified name
    fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
        for attr in e.attributes().filter_map(|a| a.ok()) {
            let key = std::str::from_utf8(attr.key.as_ref()).ok()?;
            if key == name {
                return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
            }
        }
        None
    }

    fn get_bool(e: &BytesStart, name: &str) -> Option<bool> {
        Self::get_android_attr(e, name).map(|s| s == "true")
    }

    fn parse_component(e: &BytesStart, kind: ComponentKind) -> ManifestComponent {
        let name = Self::get_android_attr(e, "name").unwrap_or_default();
        let mut component = ManifestComponent::new(&name, kind);
        component.label = Self::get_android_attr(e, "label");
        component.exported = Self::get_bool(e, "exported");
        component.enabled = Self::get_bool(e, "enabled").unwrap_or(true);
        component.target_activity = Self::get_android_attr(e, "targetActivity");
        component
    }

    fn parse_provider(e: &BytesStart) -> Provider {
        Provider {
            name: Self::get_android_attr(e, "name").unwrap_or_default(),
            authorities: Self::get_android_attr(e, "authorities").unwrap_or_default(),
            exported: Self::get_bool(e, "exported"),
            enabled: Self::get_bool(e, "enabled").unwrap_or(true),
            grant_uri_permissions: Self::get_bool(e, "grantUriPermissions"),
            metadata: Vec::new(),
        }
    }

    fn parse_metadata(e: &BytesStart) -> Option<ManifestMetadata> {
        Some(ManifestMetadata {
            name: Self::get_android_attr(e, "name")?,
            value: Self::get_android_attr(e, "value"),
            resource: Self::get_android_attr(e, "resource"),
        })
    }
}

#[derive(Debug, Clone)]
enum PathSpec {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Pattern(String),
}

/// `<intent-filter>` under construction
#[derive(Debug, Default)]
struct FilterBuilder {
    actions: Vec<String>,
    categories: Vec<String>,
    priority: i32,
    auto_verify: bool,
    schemes: Vec<String>,
    authorities: Vec<(String, Option<String>)>,
    paths: Vec<PathSpec>,
    types: Vec<String>,
}

impl FilterBuilder {
    fn new(e: &BytesStart) -> Self {
        let priority = ManifestParser::get_android_attr(e, "priority")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        Self {
            priority,
            auto_verify: ManifestParser::get_bool(e, "autoVerify").unwrap_or(false),
            ..Default::default()
        }
    }

    fn add_data(&mut self, e: &BytesStart) {
        let attr = |name: &str| ManifestParser::get_android_attr(e, name);
        if let Some(scheme) = attr("scheme") {
            push_unique(&mut self.schemes, scheme);
        }
        if let Some(host) = attr("host") {
            let authority = (host, attr("port"));
            if !self.authorities.contains(&authority) {
                self.authorities.push(authority);
            }
        }
        if let Some(path) = attr("path") {
            self.paths.push(PathSpec::Exact(path));
        }
        if let Some(prefix) = attr("pathPrefix") {
            self.paths.push(PathSpec::Prefix(prefix));
        }
        if let Some(suffix) = attr("pathSuffix") {
            self.paths.push(PathSpec::Suffix(suffix));
        }
        if let Some(pattern) = attr("pathPattern") {
            self.paths.push(PathSpec::Pattern(pattern));
        }
        if let Some(mime_type) = attr("mimeType") {
            push_unique(&mut self.types, mime_type);
        }
    }

    fn build(self) -> IntentFilter {
        let mut data = Vec::new();
        let types: Vec<Option<&String>> = if self.types.is_empty() {
            vec![None]
        } else {
            self.types.iter().map(Some).collect()
        };

        if self.schemes.is_empty() {
            if !self.authorities.is_empty() || !self.paths.is_empty() {
                warn!("Ignoring host/path declared without a scheme");
            }
            data.extend(self.types.iter().map(|t| IntentData::mime(t)));
        } else {
            for scheme in &self.schemes {
                let authorities: Vec<Option<&(String, Option<String>)>> = if self.authorities.is_empty() {
                    vec![None]
                } else {
                    self.authorities.iter().map(Some).collect()
                };
                for authority in &authorities {
                    let paths: Vec<Option<&PathSpec>> = match authority {
                        Some(_) if !self.paths.is_empty() => self.paths.iter().map(Some).collect(),
                        _ => vec![None],
                    };
                    for path in &paths {
                        for mime_type in &types {
                            let mut entry = IntentData {
                                scheme: Some(scheme.clone()),
                                mime_type: mime_type.cloned(),
                                ..Default::default()
                            };
                            if let Some((host, port)) = authority {
                                entry.host = Some(host.clone());
                                entry.port = port.clone();
                            }
                            match path {
                                Some(PathSpec::Exact(p)) => entry.path = Some(p.clone()),
                                Some(PathSpec::Prefix(p)) => entry.path_prefix = Some(p.clone()),
                                Some(PathSpec::Suffix(p)) => entry.path_suffix = Some(p.clone()),
                                Some(PathSpec::Pattern(p)) => entry.path_pattern = Some(p.clone()),
                                None => {}
                            }
                            data.push(entry);
                        }
                    }
                }
            }
        }

        IntentFilter {
            actions: self.actions,
            categories: self.categories,
            data,
            priority: self.priority,
            auto_verify: self.auto_verify,
        }
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[derive(Default)]
struct ParseState {
    manifest: AndroidManifest,
    seen_manifest: bool,
    in_application: bool,
    component: Option<ManifestComponent>,
    provider: Option<Provider>,
    filter: Option<FilterBuilder>,
}

impl ParseState {
    fn open(&mut self, e: &BytesStart) -> Result<(), ParseError> {
        match e.name().as_ref() {
            b"manifest" => {
                self.seen_manifest = true;
                self.manifest.package = ManifestParser::get_attr(e, "package").unwrap_or_default();
                self.manifest.version_code =
                    ManifestParser::get_android_attr(e, "versionCode").and_then(|s| s.parse().ok());
                self.manifest.version_name = ManifestParser::get_android_attr(e, "versionName");
            }
            b"uses-sdk" => {
                self.manifest.min_sdk =
                    ManifestParser::get_android_attr(e, "minSdkVersion").and_then(|s| s.parse().ok());
                self.manifest.target_sdk =
                    ManifestParser::get_android_attr(e, "targetSdkVersion").and_then(|s| s.parse().ok());
            }
            b"application" => {
                if !self.seen_manifest {
                    return Err(ParseError::InvalidStructure("<application> outside <manifest>".into()));
                }
                self.in_application = true;
                self.manifest.application = Some(ManifestApplication {
                    name: ManifestParser::get_android_attr(e, "name"),
                    label: ManifestParser::get_android_attr(e, "label"),
                    ..Default::default()
                });
            }
            b"activity" | b"activity-alias" if self.in_application => {
                self.component = Some(ManifestParser::parse_component(e, ComponentKind::Activity));
            }
            b"service" if self.in_application => {
                self.component = Some(ManifestParser::parse_component(e, ComponentKind::Service));
            }
            b"receiver" if self.in_application => {
                self.component = Some(ManifestParser::parse_component(e, ComponentKind::Receiver));
            }
            b"provider" if self.in_application => {
                self.provider = Some(ManifestParser::parse_provider(e));
            }
            b"intent-filter" if self.component.is_some() => {
                self.filter = Some(FilterBuilder::new(e));
            }
            b"action" => {
                if let (Some(filter), Some(name)) = (&mut self.filter, ManifestParser::get_android_attr(e, "name")) {
                    filter.actions.push(name);
                }
            }
            b"category" => {
                if let (Some(filter), Some(name)) = (&mut self.filter, ManifestParser::get_android_attr(e, "name")) {
                    filter.categories.push(name);
                }
            }
            b"data" => {
                if let Some(filter) = &mut self.filter {
                    filter.add_data(e);
                }
            }
            b"meta-data" => {
                if let Some(meta) = ManifestParser::parse_metadata(e) {
                    if let Some(component) = &mut self.component {
                        component.metadata.push(meta);
                    } else if let Some(provider) = &mut self.provider {
                        provider.metadata.push(meta);
                    } else if let Some(app) = &mut self.manifest.application {
                        app.metadata.push(meta);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"application" => {
                self.in_application = false;
            }
            b"activity" | b"activity-alias" | b"service" | b"receiver" => {
                if let (Some(component), Some(app)) = (self.component.take(), &mut self.manifest.application) {
                    app.components.push(component);
                }
            }
            b"provider" => {
                if let (Some(provider), Some(app)) = (self.provider.take(), &mut self.manifest.application) {
                    app.providers.push(provider);
                }
            }
            b"intent-filter" => {
                if let (Some(filter), Some(component)) = (self.filter.take(), &mut self.component) {
                    component.intent_filters.push(filter.build());
                }
            }
            _ => {}
        }
    }
}
