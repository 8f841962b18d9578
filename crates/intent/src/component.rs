//! Component names
//!
//! `(package, class)` identifiers of concrete handlers.

use std::fmt;

use serde::{Deserialize, Serialize};

use r_droid_core::{RDroidError, Result};

/// Kind of component a handler is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Activity,
    Service,
    Receiver,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Activity => "activity",
            ComponentKind::Service => "service",
            ComponentKind::Receiver => "receiver",
        }
    }
}

/// Fully qualified component identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentName {
    pub package: String,
    pub class: String,
}

impl ComponentName {
    /// Create a component name, expanding `.Relative` class names
    pub fn new(package: &str, class: &str) -> Self {
        Self {
            package: package.to_string(),
            class: Self::full_class_name(package, class),
        }
    }

    /// Expand a manifest-style class name against its package
    pub fn full_class_name(package: &str, class: &str) -> String {
        if class.starts_with('.') {
            format!("{}{}", package, class)
        } else if class.contains('.') {
            class.to_string()
        } else {
            format!("{}.{}", package, class)
        }
    }

    /// `package/class`
    pub fn flatten_to_string(&self) -> String {
        format!("{}/{}", self.package, self.class)
    }

    /// `package/.Class` when the class lives inside the package
    pub fn flatten_to_short_string(&self) -> String {
        match self.class.strip_prefix(self.package.as_str()) {
            Some(rest) if rest.starts_with('.') => format!("{}/{}", self.package, rest),
            _ => self.flatten_to_string(),
        }
    }

    /// Parse the output of either flatten method
    pub fn unflatten_from_string(s: &str) -> Result<Self> {
        let (package, class) = s.split_once('/').ok_or_else(|| {
            RDroidError::MalformedDescriptor(format!("component {:?} is missing '/'", s))
        })?;
        if package.is_empty() || class.is_empty() {
            return Err(RDroidError::MalformedDescriptor(format!("incomplete component {:?}", s)));
        }
        Ok(Self::new(package, class))
    }

    /// Class name without the package qualifier
    pub fn short_class_name(&self) -> &str {
        self.class.rsplit('.').next().unwrap_or(&self.class)
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten_to_short_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expansion() {
        assert_eq!(ComponentName::new("com.example", ".MainActivity").class, "com.example.MainActivity");
        assert_eq!(ComponentName::new("com.example", "MainActivity").class, "com.example.MainActivity");
        assert_eq!(ComponentName::new("com.example", "org.other.Viewer").class, "org.other.Viewer");
    }

    #[test]
    fn test_flatten_roundtrip() {
        let name = ComponentName::new("com.example", ".ui.ViewerActivity");
        assert_eq!(name.flatten_to_short_string(), "com.example/.ui.ViewerActivity");
        assert_eq!(name.flatten_to_string(), "com.example/com.example.ui.ViewerActivity");
        assert_eq!(ComponentName::unflatten_from_string(&name.flatten_to_short_string()).unwrap(), name);
        assert_eq!(name.short_class_name(), "ViewerActivity");
    }

    #[test]
    fn test_unflatten_rejects_garbage() {
        assert!(ComponentName::unflatten_from_string("no-slash").is_err());
        assert!(ComponentName::unflatten_from_string("/Cls").is_err());
    }
}
