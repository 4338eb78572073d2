//! Typed reads of the page-embedded `data-*` annotations
//!
//! The collector is configured by attributes on its own script tag. Absent
//! or empty values fall back to a default; malformed structured values read
//! as "no value" instead of failing.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

pub const ATTR_PROVIDER: &str = "provider";
pub const ATTR_SERVICE: &str = "service";
pub const ATTR_CUSTOM_PROPERTIES: &str = "customproperties";
pub const ATTR_ALLOW_IFRAME: &str = "allowIframe";
pub const ATTR_MEASURE_PREFIXES: &str = "customMeasuresPrefixes";
pub const ATTR_MARK_PREFIXES: &str = "customMarksPrefixes";

/// Marker attribute selecting the element whose render time is tracked
pub const ELEMENT_MARKER_SELECTOR: &str = "[data-bilmur-mie]";
/// Opt-in attribute the tracked element must also carry
pub const ELEMENT_TIMING_ATTRIBUTE: &str = "elementtiming";

/// Anything that can answer `dataset[name]`
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Source with no attributes at all (script loaded without a tag)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAttributes;

impl AttributeSource for NoAttributes {
    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Read a string attribute; empty counts as absent
pub fn read_string(source: &dyn AttributeSource, name: &str, default: Option<&str>) -> Option<String> {
    source
        .attribute(name)
        .filter(|v| !v.is_empty())
        .or_else(|| default.map(str::to_string))
}

/// Read a boolean attribute; only the literal `"true"` is true
pub fn read_flag(source: &dyn AttributeSource, name: &str) -> bool {
    source.attribute(name).as_deref() == Some("true")
}

/// Read a comma-separated list, dropping blank items
pub fn read_list(source: &dyn AttributeSource, name: &str) -> Vec<String> {
    read_string(source, name, None)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the custom-properties annotation
///
/// Keeps only string-valued keys and re-serializes them. Returns `None` for
/// invalid JSON, non-object JSON, or when nothing survives the filter.
pub fn parse_custom_properties(raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|r| !r.is_empty())?;
    let parsed: Value = serde_json::from_str(raw).ok()?;
    let object = parsed.as_object()?;

    let strings: Map<String, Value> = object
        .iter()
        .filter(|(_, v)| v.is_string())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if strings.is_empty() {
        return None;
    }
    serde_json::to_string(&strings).ok()
}
