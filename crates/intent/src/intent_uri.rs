//! Textual descriptor form
//!
//! `<data>#Intent;key=value;...;end`, plus the `intent:` and `android-app:`
//! schemes used in hyperlinks. Values are percent-encoded; only scalar
//! extras survive the trip.

use tracing::debug;

use r_droid_core::{RDroidError, Result};

use crate::bundle::Value;
use crate::component::ComponentName;
use crate::flags::{IntentFlags, UriFlags};
use crate::intent::{actions, Intent, Rect};
use crate::uri::Uri;

const FRAGMENT_START: &str = "#Intent;";
const FRAGMENT_END: &str = "end";
const INTENT_SCHEME_PREFIX: &str = "intent:";
const ANDROID_APP_SCHEME_PREFIX: &str = "android-app:";

fn malformed(message: impl Into<String>) -> RDroidError {
    RDroidError::MalformedDescriptor(message.into())
}

impl Intent {
    /// Serialize to the textual form selected by `flags`
    pub fn to_uri(&self, flags: UriFlags) -> Result<String> {
        if flags.contains(UriFlags::ANDROID_APP_SCHEME) {
            return self.to_android_app_uri();
        }

        let mut out = String::new();
        let mut scheme = None;
        match &self.data {
            Some(data) if flags.contains(UriFlags::INTENT_SCHEME) => {
                out.push_str(INTENT_SCHEME_PREFIX);
                match data.scheme() {
                    Some(data_scheme) => {
                        scheme = Some(data_scheme);
                        out.push_str(&data.as_str()[data_scheme.len() + 1..]);
                    }
                    None => out.push_str(data.as_str()),
                }
            }
            Some(data) => out.push_str(data.as_str()),
            None if flags.contains(UriFlags::INTENT_SCHEME) => out.push_str(INTENT_SCHEME_PREFIX),
            None => {}
        }

        self.append_fragment(&mut out, scheme, Some(actions::VIEW), None);
        Ok(out)
    }

    fn to_android_app_uri(&self) -> Result<String> {
        let package = self
            .package
            .as_deref()
            .ok_or_else(|| RDroidError::InvalidState("android-app: form requires a package".into()))?;

        let mut out = format!("{}//{}", ANDROID_APP_SCHEME_PREFIX, package);
        if let Some(data) = &self.data {
            if let Some(scheme) = data.scheme() {
                out.push('/');
                out.push_str(scheme);
                if let Some(authority) = data.authority() {
                    out.push('/');
                    out.push_str(authority);
                    out.push_str(data.path());
                    if let Some(query) = data.query() {
                        out.push('?');
                        out.push_str(query);
                    }
                }
            }
        }

        let default_action = if self.data.is_some() { actions::VIEW } else { actions::MAIN };
        self.append_fragment(&mut out, None, Some(default_action), Some(package));
        Ok(out)
    }

    fn append_fragment(
        &self,
        out: &mut String,
        scheme: Option<&str>,
        default_action: Option<&str>,
        default_package: Option<&str>,
    ) {
        let mut body = String::new();
        self.write_fragment_keys(&mut body, scheme, default_action, default_package);
        if let Some(selector) = &self.selector {
            body.push_str("SEL;");
            selector.write_fragment_keys(&mut body, selector.scheme(), None, None);
        }

        // A bare descriptor still needs a fragment, or it would read back as data.
        if !body.is_empty() || out.is_empty() || out == INTENT_SCHEME_PREFIX {
            out.push_str(FRAGMENT_START);
            out.push_str(&body);
            out.push_str(FRAGMENT_END);
        }
    }

    fn write_fragment_keys(
        &self,
        body: &mut String,
        scheme: Option<&str>,
        default_action: Option<&str>,
        default_package: Option<&str>,
    ) {
        let mut entry = |key: &str, value: &str| {
            body.push_str(key);
            body.push('=');
            body.push_str(&Uri::encode(value));
            body.push(';');
        };

        if let Some(scheme) = scheme {
            entry("scheme", scheme);
        }
        // An empty action tells the parser not to apply its default.
        match self.action.as_deref() {
            Some(action) if Some(action) != default_action => entry("action", action),
            None if default_action.is_some() => entry("action", ""),
            _ => {}
        }
        for category in &self.categories {
            entry("category", category);
        }
        if let Some(mime_type) = &self.mime_type {
            entry("type", mime_type);
        }
        if let Some(identifier) = &self.identifier {
            entry("identifier", identifier);
        }
        if !self.flags.is_empty() {
            // Hex digits need no escaping.
            entry("launchFlags", &format!("0x{:x}", self.flags.bits()));
        }
        if let Some(package) = self.package.as_deref().filter(|p| Some(*p) != default_package) {
            entry("package", package);
        }
        if let Some(component) = &self.component {
            let short = component.flatten_to_short_string();
            let (package, class) = short.split_once('/').unwrap_or((short.as_str(), ""));
            body.push_str(&format!("component={}/{};", Uri::encode(package), Uri::encode(class)));
        }
        if let Some(bounds) = &self.source_bounds {
            body.push_str(&format!("sourceBounds={};", Uri::encode(&bounds.flatten_to_string())));
        }

        for (key, value) in self.extras.iter() {
            let (tag, text) = match value {
                Value::Str(v) => ('S', v.clone()),
                Value::Bool(v) => ('B', v.to_string()),
                Value::Byte(v) => ('b', v.to_string()),
                Value::Char(v) => ('c', v.to_string()),
                Value::Double(v) => ('d', v.to_string()),
                Value::Float(v) => ('f', v.to_string()),
                Value::Int(v) => ('i', v.to_string()),
                Value::Long(v) => ('l', v.to_string()),
                Value::Short(v) => ('s', v.to_string()),
                other => {
                    debug!("Dropping {} extra {:?} from textual form", other.type_name(), key);
                    continue;
                }
            };
            body.push_str(&format!("{}.{}={};", tag, Uri::encode(key), Uri::encode(&text)));
        }
    }

    /// Parse any of the textual forms.
    ///
    /// Grant flags in `launchFlags` are dropped unless `flags` contains
    /// [`UriFlags::ALLOW_UNSAFE`].
    pub fn parse_uri(text: &str, flags: UriFlags) -> Result<Intent> {
        if text.is_empty() {
            return Err(malformed("empty intent URI"));
        }
        if text.starts_with(ANDROID_APP_SCHEME_PREFIX) {
            return parse_android_app(text, flags);
        }

        let (data_part, body) = match text.rfind('#') {
            Some(idx) => match text[idx..].strip_prefix(FRAGMENT_START) {
                Some(body) => (&text[..idx], Some(body)),
                None => (text, None),
            },
            None => (text, None),
        };

        let body = match body {
            Some(body) => body,
            None => return Ok(Intent::with_data(actions::VIEW, Uri::parse(text)?)),
        };

        let parsed = parse_fragment(body, Intent::new(actions::VIEW))?;
        let data = match data_part.strip_prefix(INTENT_SCHEME_PREFIX) {
            Some("") => None,
            Some(rest) => match &parsed.scheme {
                Some(scheme) => Some(format!("{}:{}", scheme, rest)),
                None => Some(rest.to_string()),
            },
            None if data_part.is_empty() => None,
            None => Some(data_part.to_string()),
        };

        let mut intent = parsed.finish(flags);
        if let Some(data) = data {
            intent.data = Some(Uri::parse(&data)?);
        }
        Ok(intent)
    }
}

struct ParsedFragment {
    intent: Intent,
    selector: Option<Intent>,
    scheme: Option<String>,
}

impl ParsedFragment {
    fn finish(self, flags: UriFlags) -> Intent {
        let ParsedFragment { mut intent, selector, .. } = self;
        if let Some(mut selector) = selector {
            if intent.package.is_none() {
                if !flags.contains(UriFlags::ALLOW_UNSAFE) {
                    selector.flags.remove(IntentFlags::URI_GRANT_MASK);
                }
                intent.selector = Some(Box::new(selector));
            }
        }
        if !flags.contains(UriFlags::ALLOW_UNSAFE) {
            intent.flags.remove(IntentFlags::URI_GRANT_MASK);
        }
        intent
    }
}

fn parse_fragment(body: &str, base: Intent) -> Result<ParsedFragment> {
    let mut parsed = ParsedFragment {
        intent: base,
        selector: None,
        scheme: None,
    };

    let mut tokens = body.split(';');
    let mut terminated = false;
    for token in tokens.by_ref() {
        if token == FRAGMENT_END {
            terminated = true;
            break;
        }
        if token == "SEL" {
            parsed.selector = Some(Intent::default());
            continue;
        }

        let (key, raw_value) = token
            .split_once('=')
            .ok_or_else(|| malformed(format!("fragment entry {:?} has no value", token)))?;
        let value = Uri::decode(raw_value)?;
        let in_selector = parsed.selector.is_some();
        let target = match parsed.selector.as_mut() {
            Some(selector) => selector,
            None => &mut parsed.intent,
        };

        match key {
            "action" => target.action = Some(value).filter(|action| !action.is_empty()),
            "category" => {
                target.categories.insert(value);
            }
            "type" => target.mime_type = Some(value),
            "identifier" => target.identifier = Some(value),
            "launchFlags" => target.flags = IntentFlags::from_bits_retain(parse_launch_flags(&value)?),
            "package" => target.package = Some(value),
            "component" => target.component = Some(ComponentName::unflatten_from_string(&value)?),
            "sourceBounds" => target.source_bounds = Some(Rect::unflatten_from_string(&value)?),
            "scheme" if in_selector => target.data = Some(Uri::parse(&format!("{}:", value))?),
            "scheme" => parsed.scheme = Some(value),
            typed if typed.len() > 2 && typed.as_bytes()[1] == b'.' => {
                let extra_key = Uri::decode(&typed[2..])?;
                let extra = parse_typed_extra(typed.as_bytes()[0], &value)?;
                target.extras.put(extra_key, extra);
            }
            unknown => return Err(malformed(format!("unknown fragment key {:?}", unknown))),
        }
    }

    if !terminated {
        return Err(malformed("fragment is missing its end marker"));
    }
    if tokens.any(|rest| !rest.is_empty()) {
        return Err(malformed("trailing data after fragment end"));
    }
    Ok(parsed)
}

fn parse_launch_flags(value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse::<i64>().ok().and_then(|v| u32::try_from(v).ok()),
    };
    parsed.ok_or_else(|| malformed(format!("invalid launchFlags {:?}", value)))
}

fn parse_typed_extra(tag: u8, value: &str) -> Result<Value> {
    let bad = || malformed(format!("invalid {} extra value {:?}", tag as char, value));
    let parsed = match tag {
        b'S' => Value::Str(value.to_string()),
        b'B' => match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(bad()),
        },
        b'b' => Value::Byte(value.parse().map_err(|_| bad())?),
        b'c' => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(bad()),
            }
        }
        b'd' => Value::Double(value.parse().map_err(|_| bad())?),
        b'f' => Value::Float(value.parse().map_err(|_| bad())?),
        b'i' => Value::Int(value.parse().map_err(|_| bad())?),
        b'l' => Value::Long(value.parse().map_err(|_| bad())?),
        b's' => Value::Short(value.parse().map_err(|_| bad())?),
        other => return Err(malformed(format!("unknown extra type {:?}", other as char))),
    };
    Ok(parsed)
}

fn parse_android_app(text: &str, flags: UriFlags) -> Result<Intent> {
    let (head, body) = match text.rfind(FRAGMENT_START) {
        Some(idx) => (&text[..idx], Some(&text[idx + FRAGMENT_START.len()..])),
        None => (text, None),
    };

    let app = Uri::parse(head)?;
    let package = app
        .authority()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| malformed(format!("android-app URI {:?} has no package", text)))?
        .to_string();

    let mut segments = app.path().trim_start_matches('/').splitn(3, '/');
    let data = match segments.next().filter(|s| !s.is_empty()) {
        Some(scheme) => match segments.next().filter(|s| !s.is_empty()) {
            Some(host) => {
                let mut data = format!("{}://{}", scheme, host);
                if let Some(path) = segments.next() {
                    data.push('/');
                    data.push_str(path);
                }
                if let Some(query) = app.query() {
                    data.push('?');
                    data.push_str(query);
                }
                Some(Uri::parse(&data)?)
            }
            None => Some(Uri::parse(&format!("{}:", scheme))?),
        },
        None => None,
    };

    let default_action = if data.is_some() { actions::VIEW } else { actions::MAIN };
    let mut intent = match body {
        Some(body) => parse_fragment(body, Intent::new(default_action))?.finish(flags),
        None => Intent::new(default_action),
    };
    intent.data = data;
    if intent.package.is_none() && intent.selector.is_none() {
        intent.package = Some(package);
    }
    Ok(intent)
}
