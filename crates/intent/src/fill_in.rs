//! Descriptor merge
//!
//! Completes a partially specified descriptor from a template. A field is
//! copied when the base leaves it unset, or when the caller explicitly allows
//! the override. Component and selector are only ever copied on explicit
//! request, and package/selector stay mutually exclusive.

use crate::flags::FillInFlags;
use crate::intent::Intent;

impl Intent {
    /// Merge `template` into `self`, returning the fields actually changed
    pub fn fill_in(&mut self, template: &Intent, allow: FillInFlags) -> FillInFlags {
        let mut changed = FillInFlags::empty();

        if template.action.is_some() && (self.action.is_none() || allow.contains(FillInFlags::ACTION)) {
            self.action = template.action.clone();
            changed |= FillInFlags::ACTION;
        }

        let template_has_data = template.data.is_some() || template.mime_type.is_some();
        let base_has_data = self.data.is_some() || self.mime_type.is_some();
        if template_has_data && (!base_has_data || allow.contains(FillInFlags::DATA)) {
            self.data = template.data.clone();
            self.mime_type = template.mime_type.clone();
            changed |= FillInFlags::DATA;
        }

        if template.identifier.is_some()
            && (self.identifier.is_none() || allow.contains(FillInFlags::IDENTIFIER))
        {
            self.identifier = template.identifier.clone();
            changed |= FillInFlags::IDENTIFIER;
        }

        if !template.categories.is_empty()
            && (self.categories.is_empty() || allow.contains(FillInFlags::CATEGORIES))
        {
            self.categories = template.categories.clone();
            changed |= FillInFlags::CATEGORIES;
        }

        if template.package.is_some()
            && (self.package.is_none() || allow.contains(FillInFlags::PACKAGE))
            && self.selector.is_none()
        {
            self.package = template.package.clone();
            changed |= FillInFlags::PACKAGE;
        }

        if template.selector.is_some() && allow.contains(FillInFlags::SELECTOR) && self.package.is_none() {
            self.selector = template.selector.clone();
            changed |= FillInFlags::SELECTOR;
        }

        if template.clip_data.is_some()
            && (self.clip_data.is_none() || allow.contains(FillInFlags::CLIP_DATA))
        {
            self.clip_data = template.clip_data.clone();
            changed |= FillInFlags::CLIP_DATA;
        }

        if template.component.is_some() && allow.contains(FillInFlags::COMPONENT) {
            self.component = template.component.clone();
            changed |= FillInFlags::COMPONENT;
        }

        // Flags accumulate; they are not a defined field.
        self.flags |= template.flags;

        if template.source_bounds.is_some()
            && (self.source_bounds.is_none() || allow.contains(FillInFlags::SOURCE_BOUNDS))
        {
            self.source_bounds = template.source_bounds;
            changed |= FillInFlags::SOURCE_BOUNDS;
        }

        self.extras.fill_missing_from(&template.extras);

        changed
    }
}

/// Free-function form of [`Intent::fill_in`]
pub fn fill_in(base: &mut Intent, template: &Intent, allow: FillInFlags) -> FillInFlags {
    base.fill_in(template, allow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipData;
    use crate::component::ComponentName;
    use crate::intent::{actions, Rect};
    use crate::uri::Uri;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn test_defined_action_is_kept() {
        let mut base = Intent::new(actions::VIEW);
        let template = Intent::new(actions::EDIT);

        let changed = base.fill_in(&template, FillInFlags::empty());
        assert_eq!(base.action(), Some(actions::VIEW));
        assert!(!changed.contains(FillInFlags::ACTION));
    }

    #[test]
    fn test_override_action() {
        let mut base = Intent::new(actions::VIEW);
        let template = Intent::new(actions::EDIT);

        let changed = base.fill_in(&template, FillInFlags::ACTION);
        assert_eq!(base.action(), Some(actions::EDIT));
        assert_eq!(changed, FillInFlags::ACTION);
    }

    #[test]
    fn test_documented_example() {
        // A = {data="foo", categories="bar"}
        // B = {action="gotit", type="some/thing", categories="one","two"}
        let mut a = Intent::default();
        a.set_data(Some(uri("foo")));
        a.add_category("bar");

        let mut b = Intent::new("gotit");
        b.set_type(Some("some/thing"));
        b.add_category("one").add_category("two");

        let changed = a.fill_in(&b, FillInFlags::DATA);
        assert_eq!(a.action(), Some("gotit"));
        assert_eq!(a.data(), None);
        assert_eq!(a.mime_type(), Some("some/thing"));
        assert_eq!(a.categories().iter().collect::<Vec<_>>(), vec!["bar"]);
        assert_eq!(changed, FillInFlags::ACTION | FillInFlags::DATA);
    }

    #[test]
    fn test_component_requires_explicit_flag() {
        let mut base = Intent::new(actions::VIEW);
        let template = Intent::explicit(ComponentName::new("com.evil", ".Hijack"));

        assert!(base.fill_in(&template, FillInFlags::empty()).is_empty());
        assert!(base.component().is_none());

        let changed = base.fill_in(&template, FillInFlags::COMPONENT);
        assert_eq!(changed, FillInFlags::COMPONENT);
        assert_eq!(base.component().unwrap().package, "com.evil");
    }

    #[test]
    fn test_package_and_selector_stay_exclusive() {
        let mut base = Intent::new(actions::MAIN);
        base.set_selector(Some(Intent::new(actions::VIEW))).unwrap();

        let mut template = Intent::default();
        template.set_package(Some("com.example")).unwrap();

        assert!(base.fill_in(&template, FillInFlags::PACKAGE).is_empty());
        assert_eq!(base.package(), None);

        let mut with_package = Intent::default();
        with_package.set_package(Some("com.example")).unwrap();
        let mut selector_template = Intent::default();
        selector_template.set_selector(Some(Intent::new(actions::VIEW))).unwrap();
        assert!(with_package.fill_in(&selector_template, FillInFlags::SELECTOR).is_empty());
        assert!(with_package.selector().is_none());
    }

    #[test]
    fn test_extras_never_overwritten() {
        let mut base = Intent::new(actions::SEND);
        base.put_extra("subject", "mine");

        let mut template = Intent::new(actions::SEND);
        template.put_extra("subject", "theirs");
        template.put_extra("body", "text");

        base.fill_in(&template, FillInFlags::all());
        assert_eq!(base.extras().get_str("subject"), Some("mine"));
        assert_eq!(base.extras().get_str("body"), Some("text"));
    }

    #[test]
    fn test_clip_and_bounds() {
        let mut base = Intent::new(actions::SEND);
        let mut template = Intent::new(actions::SEND);
        template.set_clip_data(Some(ClipData::new_uri("x", uri("content://a/1"))));
        template.set_source_bounds(Some(Rect::new(0, 0, 10, 10)));

        let changed = base.fill_in(&template, FillInFlags::empty());
        assert_eq!(changed, FillInFlags::CLIP_DATA | FillInFlags::SOURCE_BOUNDS);
        assert!(base.clip_data().is_some());
    }

    #[test]
    fn test_changed_subset_of_allowed_or_unset() {
        let mut base = Intent::new(actions::VIEW);
        base.add_category("keep");
        let mut template = Intent::new(actions::EDIT);
        template.add_category("replace");
        template.set_identifier(Some("id"));

        let changed = fill_in(&mut base, &template, FillInFlags::CATEGORIES);
        assert_eq!(changed, FillInFlags::CATEGORIES | FillInFlags::IDENTIFIER);
        assert!(base.has_category("replace"));
        assert!(!base.has_category("keep"));
    }
}
