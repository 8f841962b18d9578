//! Resolver
//!
//! Matches a descriptor against a registry snapshot. An explicit component
//! short-circuits matching entirely; otherwise every enabled handler's
//! filters are tested for action, categories, data and package, and the
//! survivors are ranked by priority, then match quality, then name.
//!
//! Ties at the top priority are not broken here: a stored preference wins,
//! and without one the caller gets [`RDroidError::AmbiguousMatch`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use r_droid_core::config::ResolverConfig;
use r_droid_core::{RDroidError, Result};

use crate::component::{ComponentKind, ComponentName};
use crate::filter::MatchCategory;
use crate::flags::IntentFlags;
use crate::intent::{categories, Intent, NoTypeResolver, TypeResolver};
use crate::mime::validate_mime_type;
use crate::registry::{FilterRegistry, RegistrySnapshot};

/// A handler that accepted the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub component: ComponentName,
    pub kind: ComponentKind,
    pub priority: i32,
    pub match_category: MatchCategory,
    /// Index of the winning filter; `None` for an explicit component
    pub filter_index: Option<usize>,
}

impl Candidate {
    fn explicit(component: &ComponentName, kind: ComponentKind) -> Self {
        Self {
            component: component.clone(),
            kind,
            priority: 0,
            match_category: MatchCategory::Empty,
            filter_index: None,
        }
    }
}

/// User-chosen defaults, keyed by descriptor filter identity
#[derive(Debug, Default)]
pub struct PreferredHandlers {
    entries: RwLock<HashMap<u64, ComponentName>>,
}

impl PreferredHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `component` as the default for descriptors filter-equal to `intent`
    pub fn set_preferred(&self, intent: &Intent, component: ComponentName) {
        self.entries.write().insert(intent.filter_hash_code(), component);
    }

    pub fn clear_preferred(&self, intent: &Intent) -> Option<ComponentName> {
        self.entries.write().remove(&intent.filter_hash_code())
    }

    pub fn preferred(&self, intent: &Intent) -> Option<ComponentName> {
        self.entries.read().get(&intent.filter_hash_code()).cloned()
    }

    /// Forget every preference pointing into `package`
    pub fn remove_package(&self, package: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, component| component.package != package);
        before - entries.len()
    }
}

/// Descriptor-to-handler matcher
pub struct Resolver {
    type_resolver: Arc<dyn TypeResolver + Send + Sync>,
    preferred: PreferredHandlers,
    default_only: bool,
    log_resolution: bool,
}

impl Resolver {
    /// Create a resolver that looks up `content:` types through `type_resolver`
    pub fn new(type_resolver: Arc<dyn TypeResolver + Send + Sync>) -> Self {
        Self {
            type_resolver,
            preferred: PreferredHandlers::new(),
            default_only: true,
            log_resolution: false,
        }
    }

    /// Resolver with no type lookup; only explicit types take part in matching
    pub fn without_type_resolver() -> Self {
        Self::new(Arc::new(NoTypeResolver))
    }

    pub fn with_config(mut self, config: &ResolverConfig) -> Self {
        self.default_only = config.default_only;
        self.log_resolution = config.log_resolution;
        self
    }

    pub fn preferred_handlers(&self) -> &PreferredHandlers {
        &self.preferred
    }

    /// Effective type: explicit type, else the `content:` lookup
    pub fn effective_type(&self, intent: &Intent) -> Result<Option<String>> {
        if let Some(mime_type) = intent.mime_type() {
            validate_mime_type(mime_type)?;
        }
        Ok(intent.resolve_type(self.type_resolver.as_ref()))
    }

    /// All matching handlers, best first
    pub fn query_intent_handlers(
        &self,
        intent: &Intent,
        snapshot: &RegistrySnapshot,
        default_only: bool,
        kind: Option<ComponentKind>,
    ) -> Result<Vec<Candidate>> {
        if let Some(component) = intent.component() {
            let kind = snapshot
                .find(component)
                .map(|handler| handler.kind)
                .or(kind)
                .unwrap_or(ComponentKind::Activity);
            return Ok(vec![Candidate::explicit(component, kind)]);
        }

        let view = intent.matching_view();
        let effective_type = self.effective_type(view)?;
        let package = intent.package().or_else(|| view.package());
        let verbose = self.log_resolution || intent.flags().contains(IntentFlags::DEBUG_LOG_RESOLUTION);

        if verbose {
            debug!(
                "Resolving action={:?} data={:?} type={:?} categories={:?} over generation {}",
                view.action(),
                view.data().map(|d| d.as_str()),
                effective_type,
                view.categories(),
                snapshot.generation()
            );
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        for handler in snapshot.handlers() {
            if !handler.enabled || kind.map_or(false, |k| k != handler.kind) {
                continue;
            }
            if package.map_or(false, |p| p != handler.package()) {
                continue;
            }

            let mut best: Option<Candidate> = None;
            for (idx, filter) in handler.filters.iter().enumerate() {
                if let Err(e) = filter.validate() {
                    warn!("Skipping malformed filter #{} of {}: {}", idx, handler.component, e);
                    continue;
                }
                if default_only && !filter.has_category(categories::DEFAULT) {
                    if verbose {
                        debug!("Filter #{} of {}: no DEFAULT category", idx, handler.component);
                    }
                    continue;
                }

                match filter.match_intent(view, effective_type.as_deref()) {
                    Ok(category) => {
                        if verbose {
                            debug!("Filter #{} of {} matched: {:?}", idx, handler.component, category);
                        }
                        let candidate = Candidate {
                            component: handler.component.clone(),
                            kind: handler.kind,
                            priority: filter.priority,
                            match_category: category,
                            filter_index: Some(idx),
                        };
                        let better = best.as_ref().map_or(true, |b| {
                            (candidate.priority, candidate.match_category) > (b.priority, b.match_category)
                        });
                        if better {
                            best = Some(candidate);
                        }
                    }
                    Err(reason) => {
                        if verbose {
                            debug!("Filter #{} of {} did not match: {:?}", idx, handler.component, reason);
                        }
                    }
                }
            }

            candidates.extend(best);
        }

        candidates.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.match_category.cmp(&a.match_category))
                .then_with(|| a.component.cmp(&b.component))
        });
        Ok(candidates)
    }

    /// Single best handler for the "resolveActivity" entry point
    pub fn resolve(&self, intent: &Intent, registry: &FilterRegistry, default_only: bool) -> Result<Candidate> {
        let snapshot = registry.snapshot();
        let mut candidates = self.query_intent_handlers(intent, &snapshot, default_only, None)?;

        if candidates.is_empty() {
            return Err(RDroidError::NoMatchingHandler(describe(intent)));
        }

        let top_priority = candidates[0].priority;
        let tied = candidates.iter().take_while(|c| c.priority == top_priority).count();
        if tied == 1 {
            return Ok(candidates.swap_remove(0));
        }

        if let Some(preferred) = self.preferred.preferred(intent) {
            if let Some(pos) = candidates[..tied].iter().position(|c| c.component == preferred) {
                debug!("Using preferred handler {} among {} candidates", preferred, tied);
                return Ok(candidates.swap_remove(pos));
            }
        }

        Err(RDroidError::AmbiguousMatch {
            candidates: candidates[..tied]
                .iter()
                .map(|c| c.component.flatten_to_short_string())
                .collect(),
        })
    }

    /// [`Resolver::resolve`] using the configured `default_only`
    pub fn resolve_activity(&self, intent: &Intent, registry: &FilterRegistry) -> Result<Candidate> {
        self.resolve(intent, registry, self.default_only)
    }
}

fn describe(intent: &Intent) -> String {
    let view = intent.matching_view();
    let mut parts = Vec::new();
    if let Some(action) = view.action() {
        parts.push(format!("act={}", action));
    }
    if !view.categories().is_empty() {
        let cats: Vec<&str> = view.categories().iter().map(String::as_str).collect();
        parts.push(format!("cat=[{}]", cats.join(",")));
    }
    if let Some(data) = view.data() {
        parts.push(format!("dat={}", data));
    }
    if let Some(mime_type) = view.mime_type() {
        parts.push(format!("typ={}", mime_type));
    }
    if let Some(package) = intent.package() {
        parts.push(format!("pkg={}", package));
    }
    format!("{{ {} }}", parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{IntentData, IntentFilter};
    use crate::intent::actions;
    use crate::registry::HandlerInfo;
    use crate::uri::Uri;

    fn share_filter() -> IntentFilter {
        IntentFilter::mime(actions::SEND, "text/plain")
    }

    fn registry_with(handlers: Vec<(&str, HandlerInfo)>) -> FilterRegistry {
        let registry = FilterRegistry::new();
        let mut by_package: HashMap<String, Vec<HandlerInfo>> = HashMap::new();
        for (package, handler) in handlers {
            by_package.entry(package.to_string()).or_default().push(handler);
        }
        for (package, handlers) in by_package {
            registry.install_package(&package, handlers).unwrap();
        }
        registry
    }

    fn send_text() -> Intent {
        let mut intent = Intent::new(actions::SEND);
        intent.set_type(Some("text/plain"));
        intent
    }

    #[test]
    fn test_component_short_circuit_on_empty_registry() {
        let registry = FilterRegistry::new();
        let resolver = Resolver::without_type_resolver();
        let target = ComponentName::new("com.example", ".Target");

        let winner = resolver.resolve(&Intent::explicit(target.clone()), &registry, true).unwrap();
        assert_eq!(winner.component, target);
        assert_eq!(winner.filter_index, None);
    }

    #[test]
    fn test_no_match() {
        let registry = FilterRegistry::new();
        let resolver = Resolver::without_type_resolver();
        let err = resolver.resolve(&send_text(), &registry, true).unwrap_err();
        assert!(matches!(err, RDroidError::NoMatchingHandler(_)));
    }

    #[test]
    fn test_priority_wins() {
        let registry = registry_with(vec![
            ("com.low", HandlerInfo::activity("com.low", ".Share").with_filter(share_filter())),
            (
                "com.high",
                HandlerInfo::activity("com.high", ".Share").with_filter(share_filter().with_priority(10)),
            ),
        ]);
        let resolver = Resolver::without_type_resolver();

        let winner = resolver.resolve(&send_text(), &registry, true).unwrap();
        assert_eq!(winner.component.package, "com.high");
        assert_eq!(winner.priority, 10);
    }

    #[test]
    fn test_tie_is_ambiguous_until_preferred() {
        let registry = registry_with(vec![
            ("com.a", HandlerInfo::activity("com.a", ".Share").with_filter(share_filter())),
            ("com.b", HandlerInfo::activity("com.b", ".Share").with_filter(share_filter())),
        ]);
        let resolver = Resolver::without_type_resolver();
        let intent = send_text();

        match resolver.resolve(&intent, &registry, true) {
            Err(RDroidError::AmbiguousMatch { candidates }) => {
                assert_eq!(candidates, vec!["com.a/.Share", "com.b/.Share"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }

        resolver
            .preferred_handlers()
            .set_preferred(&intent, ComponentName::new("com.b", ".Share"));
        let winner = resolver.resolve(&intent, &registry, true).unwrap();
        assert_eq!(winner.component.package, "com.b");
    }

    #[test]
    fn test_default_only_requires_default_category() {
        let no_default = IntentFilter::new(actions::SEND).add_data(IntentData::mime("text/plain"));
        let registry = registry_with(vec![(
            "com.a",
            HandlerInfo::activity("com.a", ".Share").with_filter(no_default),
        )]);
        let resolver = Resolver::without_type_resolver();
        let snapshot = registry.snapshot();

        assert!(resolver.query_intent_handlers(&send_text(), &snapshot, true, None).unwrap().is_empty());
        assert_eq!(resolver.query_intent_handlers(&send_text(), &snapshot, false, None).unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_handlers_skipped() {
        let registry = registry_with(vec![(
            "com.a",
            HandlerInfo::activity("com.a", ".Share").with_filter(share_filter()),
        )]);
        registry
            .set_component_enabled(&ComponentName::new("com.a", ".Share"), false)
            .unwrap();

        let resolver = Resolver::without_type_resolver();
        let found = resolver.query_intent_handlers(&send_text(), &registry.snapshot(), true, None).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_package_narrows() {
        let registry = registry_with(vec![
            ("com.a", HandlerInfo::activity("com.a", ".Share").with_filter(share_filter())),
            ("com.b", HandlerInfo::activity("com.b", ".Share").with_filter(share_filter())),
        ]);
        let resolver = Resolver::without_type_resolver();
        let mut intent = send_text();
        intent.set_package(Some("com.b")).unwrap();

        let winner = resolver.resolve(&intent, &registry, true).unwrap();
        assert_eq!(winner.component.package, "com.b");
    }

    #[test]
    fn test_selector_used_for_matching() {
        let registry = registry_with(vec![(
            "com.a",
            HandlerInfo::activity("com.a", ".Share").with_filter(share_filter()),
        )]);
        let resolver = Resolver::without_type_resolver();

        let mut outer = Intent::new(actions::MAIN);
        outer.set_selector(Some(send_text())).unwrap();
        let winner = resolver.resolve(&outer, &registry, true).unwrap();
        assert_eq!(winner.component.package, "com.a");
    }

    #[test]
    fn test_malformed_filter_skipped_not_fatal() {
        let broken = IntentFilter::new(actions::SEND)
            .add_category(categories::DEFAULT)
            .add_data(IntentData::mime("not-a-type"));
        let registry = registry_with(vec![
            ("com.a", HandlerInfo::activity("com.a", ".Broken").with_filter(broken)),
            ("com.b", HandlerInfo::activity("com.b", ".Share").with_filter(share_filter())),
        ]);
        let resolver = Resolver::without_type_resolver();

        let winner = resolver.resolve(&send_text(), &registry, true).unwrap();
        assert_eq!(winner.component.package, "com.b");
    }

    #[test]
    fn test_malformed_descriptor_type_rejected() {
        let registry = FilterRegistry::new();
        let resolver = Resolver::without_type_resolver();
        let mut intent = Intent::new(actions::SEND);
        intent.set_type(Some("garbage"));

        let err = resolver.resolve(&intent, &registry, true).unwrap_err();
        assert!(matches!(err, RDroidError::MalformedDescriptor(_)));
    }

    #[test]
    fn test_one_candidate_per_component() {
        let handler = HandlerInfo::activity("com.a", ".Viewer")
            .with_filter(IntentFilter::deep_link("https", "example.com"))
            .with_filter(
                IntentFilter::deep_link("https", "example.com")
                    .with_priority(5),
            );
        let registry = registry_with(vec![("com.a", handler)]);
        let resolver = Resolver::without_type_resolver();

        let intent = Intent::with_data(actions::VIEW, Uri::parse("https://example.com/x").unwrap());
        let found = resolver.query_intent_handlers(&intent, &registry.snapshot(), false, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filter_index, Some(1));
    }

    #[test]
    fn test_kind_filter() {
        let mut service = HandlerInfo::activity("com.a", ".Sync").with_filter(share_filter());
        service.kind = ComponentKind::Service;
        let registry = registry_with(vec![("com.a", service)]);
        let resolver = Resolver::without_type_resolver();
        let snapshot = registry.snapshot();

        let activities = resolver
            .query_intent_handlers(&send_text(), &snapshot, true, Some(ComponentKind::Activity))
            .unwrap();
        assert!(activities.is_empty());
        let services = resolver
            .query_intent_handlers(&send_text(), &snapshot, true, Some(ComponentKind::Service))
            .unwrap();
        assert_eq!(services.len(), 1);
    }
}
