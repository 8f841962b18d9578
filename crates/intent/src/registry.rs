//! Filter Registry
//!
//! Installed handlers and their filters. Readers take an `Arc` snapshot and
//! keep resolving against it while installs swap in a new generation.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use r_droid_core::{Event, EventBus, RDroidError, Result};

use crate::component::{ComponentKind, ComponentName};
use crate::filter::IntentFilter;

/// A handler component and the filters it declares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerInfo {
    pub component: ComponentName,
    pub kind: ComponentKind,
    #[serde(default)]
    pub filters: Vec<IntentFilter>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub exported: bool,
}

fn default_true() -> bool {
    true
}

impl HandlerInfo {
    pub fn new(component: ComponentName, kind: ComponentKind) -> Self {
        Self {
            component,
            kind,
            filters: Vec::new(),
            enabled: true,
            exported: true,
        }
    }

    pub fn activity(package: &str, class: &str) -> Self {
        Self::new(ComponentName::new(package, class), ComponentKind::Activity)
    }

    pub fn with_filter(mut self, filter: IntentFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn package(&self) -> &str {
        &self.component.package
    }
}

/// Immutable view of the registry at one generation
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    packages: BTreeMap<String, Vec<HandlerInfo>>,
}

impl RegistrySnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Every installed handler, in package order
    pub fn handlers(&self) -> impl Iterator<Item = &HandlerInfo> {
        self.packages.values().flatten()
    }

    pub fn package_handlers(&self, package: &str) -> Option<&[HandlerInfo]> {
        self.packages.get(package).map(Vec::as_slice)
    }

    pub fn find(&self, component: &ComponentName) -> Option<&HandlerInfo> {
        self.packages
            .get(&component.package)?
            .iter()
            .find(|handler| &handler.component == component)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn handler_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Registry of installed handlers
pub struct FilterRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    event_bus: Option<Arc<EventBus>>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistrySnapshot::default())),
            event_bus: None,
        }
    }

    /// Registry that publishes install/remove/enable events on `bus`
    pub fn with_event_bus(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// Consistent read view; never blocks on other readers
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }

    /// Install or replace every handler of `package`
    pub fn install_package(&self, package: &str, handlers: Vec<HandlerInfo>) -> Result<()> {
        if let Some(stray) = handlers.iter().find(|h| h.component.package != package) {
            return Err(RDroidError::InvalidState(format!(
                "handler {} does not belong to package {}",
                stray.component, package
            )));
        }

        let count = handlers.len();
        self.update(|snapshot| {
            snapshot.packages.insert(package.to_string(), handlers);
        });

        info!("Installed package {} with {} handlers", package, count);
        self.emit(Event::PackageInstalled {
            package: package.to_string(),
            handlers: count,
        });
        Ok(())
    }

    /// Remove a package; returns false when it was not installed
    pub fn uninstall_package(&self, package: &str) -> bool {
        let mut removed = false;
        self.update(|snapshot| {
            removed = snapshot.packages.remove(package).is_some();
        });

        if removed {
            info!("Removed package {}", package);
            self.emit(Event::PackageRemoved {
                package: package.to_string(),
            });
        }
        removed
    }

    /// Enable or disable one component
    pub fn set_component_enabled(&self, component: &ComponentName, enabled: bool) -> Result<()> {
        let mut current = self.current.write();
        let mut next = RegistrySnapshot::clone(&current);

        let handler = next
            .packages
            .get_mut(&component.package)
            .and_then(|handlers| handlers.iter_mut().find(|h| &h.component == component))
            .ok_or_else(|| RDroidError::NotFound(format!("component {}", component)))?;

        if handler.enabled == enabled {
            return Ok(());
        }
        handler.enabled = enabled;
        next.generation += 1;
        *current = Arc::new(next);
        drop(current);

        debug!("Component {} enabled={}", component, enabled);
        self.emit(Event::ComponentEnabledChanged {
            component: component.flatten_to_string(),
            enabled,
        });
        Ok(())
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut RegistrySnapshot),
    {
        let mut current = self.current.write();
        let mut next = RegistrySnapshot::clone(&current);
        mutate(&mut next);
        next.generation += 1;
        *current = Arc::new(next);
    }

    fn emit(&self, event: Event) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
