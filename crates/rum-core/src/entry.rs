//! Browser-reported timing entries, decoupled from any JS binding
//!
//! The platform layer converts whatever the runtime hands out into these
//! plain structs. Numeric fields the runtime may leave undefined are
//! `Option<f64>` so the aggregators can tell "absent" from "zero".

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five observable signal streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    LayoutShift,
    LargestContentfulPaint,
    Element,
    Mark,
    Measure,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::LayoutShift,
        SignalKind::LargestContentfulPaint,
        SignalKind::Element,
        SignalKind::Mark,
        SignalKind::Measure,
    ];

    /// The `entryType` string used when observing
    pub fn entry_type(self) -> &'static str {
        match self {
            SignalKind::LayoutShift => "layout-shift",
            SignalKind::LargestContentfulPaint => "largest-contentful-paint",
            SignalKind::Element => "element",
            SignalKind::Mark => "mark",
            SignalKind::Measure => "measure",
        }
    }

    /// The global constructor whose presence signals support
    pub fn interface_name(self) -> &'static str {
        match self {
            SignalKind::LayoutShift => "LayoutShift",
            SignalKind::LargestContentfulPaint => "LargestContentfulPaint",
            SignalKind::Element => "PerformanceElementTiming",
            SignalKind::Mark => "PerformanceMark",
            SignalKind::Measure => "PerformanceMeasure",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_type())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutShift {
    pub value: f64,
    pub had_recent_input: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LargestContentfulPaint {
    pub start_time: f64,
}

/// Element timing entry; `E` is the platform's DOM node handle
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTiming<E> {
    pub render_time: f64,
    pub element: Option<E>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTimingKind {
    Mark,
    Measure,
}

/// A `performance.mark()` or `performance.measure()` entry
#[derive(Debug, Clone, PartialEq)]
pub struct UserTiming {
    pub kind: UserTimingKind,
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
}

impl UserTiming {
    pub fn mark(name: impl Into<String>, start_time: f64) -> Self {
        Self {
            kind: UserTimingKind::Mark,
            name: name.into(),
            start_time,
            duration: 0.0,
        }
    }

    pub fn measure(name: impl Into<String>, start_time: f64, duration: f64) -> Self {
        Self {
            kind: UserTimingKind::Measure,
            name: name.into(),
            start_time,
            duration,
        }
    }
}

/// One entry delivered by an observer callback
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEntry<E> {
    LayoutShift(LayoutShift),
    LargestContentfulPaint(LargestContentfulPaint),
    Element(ElementTiming<E>),
    UserTiming(UserTiming),
}

impl<E> PerformanceEntry<E> {
    pub fn kind(&self) -> SignalKind {
        match self {
            PerformanceEntry::LayoutShift(_) => SignalKind::LayoutShift,
            PerformanceEntry::LargestContentfulPaint(_) => SignalKind::LargestContentfulPaint,
            PerformanceEntry::Element(_) => SignalKind::Element,
            PerformanceEntry::UserTiming(t) => match t.kind {
                UserTimingKind::Mark => SignalKind::Mark,
                UserTimingKind::Measure => SignalKind::Measure,
            },
        }
    }
}

/// A resource-timing entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceTiming {
    pub initiator_type: String,
    pub render_blocking_status: Option<String>,
    pub delivery_type: Option<String>,
    pub duration: f64,
    pub response_end: f64,
    pub transfer_size: Option<f64>,
    pub encoded_body_size: Option<f64>,
    pub decoded_body_size: Option<f64>,
}

/// A paint-timing entry (`first-paint`, `first-contentful-paint`)
#[derive(Debug, Clone, PartialEq)]
pub struct PaintTiming {
    pub name: String,
    pub start_time: f64,
}

/// Navigation checkpoints in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Checkpoint {
    UnloadEventStart,
    UnloadEventEnd,
    RedirectStart,
    RedirectEnd,
    FetchStart,
    DomainLookupStart,
    DomainLookupEnd,
    ConnectStart,
    ConnectEnd,
    SecureConnectionStart,
    RequestStart,
    ResponseStart,
    ResponseEnd,
    DomLoading,
    DomInteractive,
    DomContentLoadedEventStart,
    DomContentLoadedEventEnd,
    DomComplete,
    LoadEventStart,
    LoadEventEnd,
}

impl Checkpoint {
    pub const COUNT: usize = 20;

    pub const ALL: [Checkpoint; Checkpoint::COUNT] = [
        Checkpoint::UnloadEventStart,
        Checkpoint::UnloadEventEnd,
        Checkpoint::RedirectStart,
        Checkpoint::RedirectEnd,
        Checkpoint::FetchStart,
        Checkpoint::DomainLookupStart,
        Checkpoint::DomainLookupEnd,
        Checkpoint::ConnectStart,
        Checkpoint::ConnectEnd,
        Checkpoint::SecureConnectionStart,
        Checkpoint::RequestStart,
        Checkpoint::ResponseStart,
        Checkpoint::ResponseEnd,
        Checkpoint::DomLoading,
        Checkpoint::DomInteractive,
        Checkpoint::DomContentLoadedEventStart,
        Checkpoint::DomContentLoadedEventEnd,
        Checkpoint::DomComplete,
        Checkpoint::LoadEventStart,
        Checkpoint::LoadEventEnd,
    ];

    /// Property name on `performance.timing`
    pub fn property(self) -> &'static str {
        match self {
            Checkpoint::UnloadEventStart => "unloadEventStart",
            Checkpoint::UnloadEventEnd => "unloadEventEnd",
            Checkpoint::RedirectStart => "redirectStart",
            Checkpoint::RedirectEnd => "redirectEnd",
            Checkpoint::FetchStart => "fetchStart",
            Checkpoint::DomainLookupStart => "domainLookupStart",
            Checkpoint::DomainLookupEnd => "domainLookupEnd",
            Checkpoint::ConnectStart => "connectStart",
            Checkpoint::ConnectEnd => "connectEnd",
            Checkpoint::SecureConnectionStart => "secureConnectionStart",
            Checkpoint::RequestStart => "requestStart",
            Checkpoint::ResponseStart => "responseStart",
            Checkpoint::ResponseEnd => "responseEnd",
            Checkpoint::DomLoading => "domLoading",
            Checkpoint::DomInteractive => "domInteractive",
            Checkpoint::DomContentLoadedEventStart => "domContentLoadedEventStart",
            Checkpoint::DomContentLoadedEventEnd => "domContentLoadedEventEnd",
            Checkpoint::DomComplete => "domComplete",
            Checkpoint::LoadEventStart => "loadEventStart",
            Checkpoint::LoadEventEnd => "loadEventEnd",
        }
    }

    /// Record field name (`nt_` + property)
    pub fn field(self) -> String {
        format!("nt_{}", self.property())
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Level 1 `performance.timing` values (epoch milliseconds)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyTiming {
    pub navigation_start: Option<f64>,
    values: [Option<f64>; Checkpoint::COUNT],
}

impl LegacyTiming {
    pub fn new(navigation_start: Option<f64>) -> Self {
        Self {
            navigation_start,
            values: [None; Checkpoint::COUNT],
        }
    }

    pub fn get(&self, checkpoint: Checkpoint) -> Option<f64> {
        self.values[checkpoint.index()]
    }

    pub fn set(&mut self, checkpoint: Checkpoint, value: Option<f64>) {
        self.values[checkpoint.index()] = value;
    }

    /// Builder-style setter, handy for fixtures
    pub fn with(mut self, checkpoint: Checkpoint, value: f64) -> Self {
        self.set(checkpoint, Some(value));
        self
    }
}

/// The level 2 `PerformanceNavigationTiming` entry, when the runtime has one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationEntry {
    pub start_time: f64,
    pub secure_connection_start: Option<f64>,
    pub redirect_count: Option<f64>,
    pub next_hop_protocol: Option<String>,
}

/// Everything the navigation normalizer reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationTiming {
    pub legacy: LegacyTiming,
    pub entry: Option<NavigationEntry>,
}

/// `navigator.connection` fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub rtt: Option<f64>,
    pub downlink: Option<f64>,
}

/// `location` fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLocation {
    pub host_name: Option<String>,
    pub path_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_order_matches_index() {
        for (i, checkpoint) in Checkpoint::ALL.iter().enumerate() {
            assert_eq!(checkpoint.index(), i);
        }
    }

    #[test]
    fn test_checkpoint_field_names() {
        assert_eq!(Checkpoint::FetchStart.field(), "nt_fetchStart");
        assert_eq!(
            Checkpoint::DomContentLoadedEventStart.field(),
            "nt_domContentLoadedEventStart"
        );
    }

    #[test]
    fn test_entry_kind() {
        let entry: PerformanceEntry<()> = PerformanceEntry::UserTiming(UserTiming::measure("x", 0.0, 5.0));
        assert_eq!(entry.kind(), SignalKind::Measure);
        assert_eq!(SignalKind::Element.entry_type(), "element");
    }
}
