//! The browser surface the collector consumes
//!
//! Each trait covers one capability family. The wasm app implements them on
//! top of `web-sys`; tests implement them with a scripted fake page.

use url::Url;

use crate::attributes::AttributeSource;
use crate::entry::{
    ConnectionInfo, NavigationTiming, PageLocation, PaintTiming, ResourceTiming, SignalKind,
};
use crate::error::CollectorError;
use crate::observer::{EntryCallback, Subscription};

/// Observable performance signal streams
pub trait SignalSource {
    /// DOM node handle; equality must be node identity
    type Element: PartialEq + Clone + 'static;

    /// Capability probe, checked before every subscription
    fn supports(&self, kind: SignalKind) -> bool;

    /// Subscribe with buffered delivery; `on_entry` gets one entry per call
    fn observe(
        &self,
        kind: SignalKind,
        on_entry: EntryCallback<Self::Element>,
    ) -> Result<Box<dyn Subscription<Self::Element>>, CollectorError>;

    /// The element opted in to element timing, if the page has one
    fn element_timing_target(&self) -> Option<Self::Element> {
        None
    }
}

/// Synchronous reads from the performance timeline
pub trait PerformanceTimeline {
    /// Whether `performance.getEntriesByType` exists at all
    fn has_performance_timeline(&self) -> bool;

    /// `performance.now()`
    fn now(&self) -> f64;

    fn navigation_timing(&self) -> Option<NavigationTiming>;

    fn resource_entries(&self) -> Vec<ResourceTiming>;

    fn paint_entries(&self) -> Vec<PaintTiming>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// `document.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn parse(value: &str) -> Self {
        match value {
            "loading" => ReadyState::Loading,
            "complete" => ReadyState::Complete,
            _ => ReadyState::Interactive,
        }
    }
}

/// What a visibility listener wants after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerControl {
    Keep,
    Detach,
}

/// Page state, events and timers
pub trait PageLifecycle {
    fn visibility(&self) -> Visibility;

    fn ready_state(&self) -> ReadyState;

    /// Whether the page runs inside a nested frame
    ///
    /// Errors when ancestry cannot be inspected (cross-origin parent).
    fn is_framed(&self) -> Result<bool, CollectorError>;

    fn connection(&self) -> ConnectionInfo;

    fn location(&self) -> PageLocation;

    /// Run `task` once after `delay_ms`
    fn set_timeout(&self, delay_ms: f64, task: Box<dyn FnOnce()>) -> Result<(), CollectorError>;

    /// Run `task` once when the load event fires
    fn on_load(&self, task: Box<dyn FnOnce()>) -> Result<(), CollectorError>;

    /// Call `handler` on every visibility change until it asks to detach
    fn on_visibility_change(
        &self,
        handler: Box<dyn FnMut() -> ListenerControl>,
    ) -> Result<(), CollectorError>;
}

/// One-way delivery of a serialized beacon
pub trait BeaconTransport {
    fn send_beacon(&self, url: &Url) -> Result<(), CollectorError>;
}

/// Everything the collector needs from its host
pub trait Platform:
    SignalSource + PerformanceTimeline + PageLifecycle + BeaconTransport + AttributeSource
{
}

impl<T> Platform for T where
    T: SignalSource + PerformanceTimeline + PageLifecycle + BeaconTransport + AttributeSource
{
}
