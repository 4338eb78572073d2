//! Conversions from raw timeline objects into `rum_core` entries
//!
//! Everything is read through `Reflect`, so a property the browser does not
//! implement simply comes back as `None`.

use js_sys::{Array, Reflect};
use rum_core::entry::{
    Checkpoint, ConnectionInfo, ElementTiming, LargestContentfulPaint, LayoutShift, LegacyTiming,
    NavigationEntry, PaintTiming, ResourceTiming, UserTiming,
};
use rum_core::{PerformanceEntry, SignalKind};
use wasm_bindgen::{JsCast, JsValue};

/// A DOM node compared by identity
#[derive(Debug, Clone)]
pub struct DomNode(pub web_sys::Element);

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        js_sys::Object::is(self.0.as_ref(), other.0.as_ref())
    }
}

pub(crate) fn property(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

pub(crate) fn number(target: &JsValue, key: &str) -> Option<f64> {
    property(target, key).and_then(|v| v.as_f64())
}

pub(crate) fn string(target: &JsValue, key: &str) -> Option<String> {
    property(target, key).and_then(|v| v.as_string())
}

fn boolean(target: &JsValue, key: &str) -> bool {
    property(target, key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Convert one observer entry; `None` if it lacks the fields its kind needs
pub fn observed_entry(kind: SignalKind, raw: &JsValue) -> Option<PerformanceEntry<DomNode>> {
    let entry = match kind {
        SignalKind::LayoutShift => PerformanceEntry::LayoutShift(LayoutShift {
            value: number(raw, "value")?,
            had_recent_input: boolean(raw, "hadRecentInput"),
        }),
        SignalKind::LargestContentfulPaint => {
            PerformanceEntry::LargestContentfulPaint(LargestContentfulPaint {
                start_time: number(raw, "startTime")?,
            })
        }
        SignalKind::Element => PerformanceEntry::Element(ElementTiming {
            render_time: number(raw, "renderTime").unwrap_or(0.0),
            element: property(raw, "element")
                .and_then(|v| v.dyn_into::<web_sys::Element>().ok())
                .map(DomNode),
        }),
        SignalKind::Mark => PerformanceEntry::UserTiming(UserTiming::mark(
            string(raw, "name")?,
            number(raw, "startTime").unwrap_or(f64::NAN),
        )),
        SignalKind::Measure => PerformanceEntry::UserTiming(UserTiming::measure(
            string(raw, "name")?,
            number(raw, "startTime").unwrap_or(f64::NAN),
            number(raw, "duration").unwrap_or(f64::NAN),
        )),
    };
    Some(entry)
}

/// Convert every entry of an observer batch, dropping malformed ones
pub fn observed_entries(kind: SignalKind, batch: &Array) -> Vec<PerformanceEntry<DomNode>> {
    batch
        .iter()
        .filter_map(|raw| observed_entry(kind, &raw))
        .collect()
}

pub fn resource_timing(raw: &JsValue) -> ResourceTiming {
    ResourceTiming {
        initiator_type: string(raw, "initiatorType").unwrap_or_default(),
        render_blocking_status: string(raw, "renderBlockingStatus"),
        delivery_type: string(raw, "deliveryType"),
        duration: number(raw, "duration").unwrap_or(f64::NAN),
        response_end: number(raw, "responseEnd").unwrap_or(0.0),
        transfer_size: number(raw, "transferSize"),
        encoded_body_size: number(raw, "encodedBodySize"),
        decoded_body_size: number(raw, "decodedBodySize"),
    }
}

pub fn paint_timing(raw: &JsValue) -> Option<PaintTiming> {
    Some(PaintTiming {
        name: string(raw, "name")?,
        start_time: number(raw, "startTime")?,
    })
}

/// Read `performance.timing`
pub fn legacy_timing(timing: &JsValue) -> LegacyTiming {
    let mut legacy = LegacyTiming::new(number(timing, "navigationStart"));
    for checkpoint in Checkpoint::ALL {
        legacy.set(checkpoint, number(timing, checkpoint.property()));
    }
    legacy
}

pub fn navigation_entry(raw: &JsValue) -> NavigationEntry {
    NavigationEntry {
        start_time: number(raw, "startTime").unwrap_or(f64::NAN),
        secure_connection_start: number(raw, "secureConnectionStart"),
        redirect_count: number(raw, "redirectCount"),
        next_hop_protocol: string(raw, "nextHopProtocol"),
    }
}

/// Read `navigator.connection`
pub fn connection_info(raw: &JsValue) -> ConnectionInfo {
    ConnectionInfo {
        effective_type: string(raw, "effectiveType"),
        rtt: number(raw, "rtt"),
        downlink: number(raw, "downlink"),
    }
}
