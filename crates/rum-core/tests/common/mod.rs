//! Scripted fake page for driving the collector deterministically
//!
//! The clock only moves when a test calls [`FakePage::advance`]; timers due
//! within the advanced window run in order of due time, then scheduling
//! order.

#![allow(dead_code)]

use rum_core::entry::{
    ConnectionInfo, NavigationTiming, PageLocation, PaintTiming, ResourceTiming,
};
use rum_core::{
    AttributeSource, BeaconTransport, CollectorError, EntryCallback, ListenerControl,
    PageLifecycle, PerformanceEntry, PerformanceTimeline, ReadyState, SignalKind, SignalSource,
    Subscription, Visibility,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// DOM node handle for the fake page
pub type NodeId = u32;

struct Timer {
    due: f64,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

struct FakeObserver {
    kind: SignalKind,
    callback: EntryCallback<NodeId>,
    pending: Rc<RefCell<Vec<PerformanceEntry<NodeId>>>>,
    connected: Rc<Cell<bool>>,
}

#[derive(Default)]
pub struct FakeState {
    pub now: Cell<f64>,
    pub hidden: Cell<bool>,
    pub loading: Cell<bool>,
    pub complete: Cell<bool>,
    /// `None` makes the frame check fail
    pub framed: Cell<Option<bool>>,
    pub no_timeline: Cell<bool>,
    pub supported: RefCell<Vec<SignalKind>>,
    pub failing: RefCell<Vec<SignalKind>>,
    pub attributes: RefCell<HashMap<String, String>>,
    pub resources: RefCell<Vec<ResourceTiming>>,
    pub paints: RefCell<Vec<PaintTiming>>,
    pub navigation: RefCell<Option<NavigationTiming>>,
    pub connection: RefCell<ConnectionInfo>,
    pub location: RefCell<PageLocation>,
    pub element_target: Cell<Option<NodeId>>,
    pub disconnects: Cell<u32>,
    observers: RefCell<Vec<FakeObserver>>,
    buffered: RefCell<Vec<PerformanceEntry<NodeId>>>,
    timers: RefCell<Vec<Timer>>,
    next_seq: Cell<u64>,
    load_listeners: RefCell<Vec<Box<dyn FnOnce()>>>,
    visibility_listeners: RefCell<Vec<Box<dyn FnMut() -> ListenerControl>>>,
    beacons: RefCell<Vec<Url>>,
}

/// Cheap handle; the collector owns one clone, the test keeps another
#[derive(Clone, Default)]
pub struct FakePage {
    pub state: Rc<FakeState>,
}

impl FakePage {
    /// Visible, interactive page that supports every signal
    pub fn new() -> Self {
        let page = Self::default();
        page.state.framed.set(Some(false));
        page.state.supported.replace(SignalKind::ALL.to_vec());
        page.state.location.replace(PageLocation {
            host_name: Some("example.com".into()),
            path_name: Some("/post/1".into()),
        });
        page
    }

    pub fn with_attribute(self, name: &str, value: &str) -> Self {
        self.state
            .attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn complete(self) -> Self {
        self.state.complete.set(true);
        self
    }

    pub fn loading(self) -> Self {
        self.state.loading.set(true);
        self
    }

    pub fn hidden(self) -> Self {
        self.state.hidden.set(true);
        self
    }

    pub fn at(self, now: f64) -> Self {
        self.state.now.set(now);
        self
    }

    pub fn unsupported(self, kind: SignalKind) -> Self {
        self.state.supported.borrow_mut().retain(|k| *k != kind);
        self
    }

    pub fn failing(self, kind: SignalKind) -> Self {
        self.state.failing.borrow_mut().push(kind);
        self
    }

    pub fn with_resource(self, resource: ResourceTiming) -> Self {
        self.state.resources.borrow_mut().push(resource);
        self
    }

    pub fn with_navigation(self, timing: NavigationTiming) -> Self {
        self.state.navigation.replace(Some(timing));
        self
    }

    /// Deliver an entry to live observers, or buffer it if none is subscribed
    pub fn emit(&self, entry: PerformanceEntry<NodeId>) {
        let callbacks: Vec<EntryCallback<NodeId>> = self
            .state
            .observers
            .borrow()
            .iter()
            .filter(|o| o.kind == entry.kind() && o.connected.get())
            .map(|o| o.callback.clone())
            .collect();

        if callbacks.is_empty() {
            self.state.buffered.borrow_mut().push(entry);
            return;
        }
        for callback in callbacks {
            callback(entry.clone());
        }
    }

    /// Record an entry that the observer has not been called back for yet
    pub fn queue(&self, entry: PerformanceEntry<NodeId>) {
        let observers = self.state.observers.borrow();
        let observer = observers
            .iter()
            .find(|o| o.kind == entry.kind() && o.connected.get())
            .expect("no live observer for entry kind");
        observer.pending.borrow_mut().push(entry);
    }

    pub fn is_observing(&self, kind: SignalKind) -> bool {
        self.state
            .observers
            .borrow()
            .iter()
            .any(|o| o.kind == kind && o.connected.get())
    }

    /// Move the clock forward, running timers as they come due
    pub fn advance(&self, ms: f64) {
        let target = self.state.now.get() + ms;
        loop {
            let next = {
                let mut timers = self.state.timers.borrow_mut();
                let index = timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq))
                    })
                    .map(|(i, _)| i);
                index.map(|i| timers.remove(i))
            };
            let Some(timer) = next else { break };
            if timer.due > self.state.now.get() {
                self.state.now.set(timer.due);
            }
            (timer.task)();
        }
        self.state.now.set(target);
    }

    pub fn pending_timers(&self) -> usize {
        self.state.timers.borrow().len()
    }

    /// Finish loading and dispatch the load event
    pub fn fire_load(&self) {
        self.state.loading.set(false);
        self.state.complete.set(true);
        let listeners = std::mem::take(&mut *self.state.load_listeners.borrow_mut());
        for listener in listeners {
            listener();
        }
    }

    pub fn set_ready(&self) {
        self.state.loading.set(false);
    }

    /// Flip visibility and dispatch `visibilitychange`
    pub fn set_hidden(&self, hidden: bool) {
        self.state.hidden.set(hidden);
        let mut listeners = std::mem::take(&mut *self.state.visibility_listeners.borrow_mut());
        listeners.retain_mut(|listener| listener() == ListenerControl::Keep);
        self.state
            .visibility_listeners
            .borrow_mut()
            .extend(listeners);
    }

    pub fn visibility_listener_count(&self) -> usize {
        self.state.visibility_listeners.borrow().len()
    }

    pub fn beacons(&self) -> Vec<Url> {
        self.state.beacons.borrow().clone()
    }

    /// Query parameters of the only beacon sent
    pub fn beacon_fields(&self) -> HashMap<String, String> {
        let beacons = self.beacons();
        assert_eq!(beacons.len(), 1, "expected exactly one beacon");
        beacons[0].query_pairs().into_owned().collect()
    }
}

struct FakeSubscription {
    pending: Rc<RefCell<Vec<PerformanceEntry<NodeId>>>>,
    connected: Rc<Cell<bool>>,
    state: Rc<FakeState>,
}

impl Subscription<NodeId> for FakeSubscription {
    fn take_records(&mut self) -> Vec<PerformanceEntry<NodeId>> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    fn disconnect(&mut self) {
        self.connected.set(false);
        self.state.disconnects.set(self.state.disconnects.get() + 1);
    }
}

impl SignalSource for FakePage {
    type Element = NodeId;

    fn supports(&self, kind: SignalKind) -> bool {
        self.state.supported.borrow().contains(&kind)
    }

    fn observe(
        &self,
        kind: SignalKind,
        on_entry: EntryCallback<NodeId>,
    ) -> Result<Box<dyn Subscription<NodeId>>, CollectorError> {
        if self.state.failing.borrow().contains(&kind) {
            return Err(CollectorError::Subscribe {
                kind,
                reason: "observe() threw".into(),
            });
        }
        let pending = Rc::new(RefCell::new(Vec::new()));
        let connected = Rc::new(Cell::new(true));
        self.state.observers.borrow_mut().push(FakeObserver {
            kind,
            callback: on_entry.clone(),
            pending: pending.clone(),
            connected: connected.clone(),
        });

        // Buffered entries are flushed to the new observer
        let buffered: Vec<_> = {
            let mut all = self.state.buffered.borrow_mut();
            let (matching, rest): (Vec<_>, Vec<_>) =
                std::mem::take(&mut *all).into_iter().partition(|e| e.kind() == kind);
            *all = rest;
            matching
        };
        for entry in buffered {
            on_entry(entry);
        }

        Ok(Box::new(FakeSubscription {
            pending,
            connected,
            state: self.state.clone(),
        }))
    }

    fn element_timing_target(&self) -> Option<NodeId> {
        self.state.element_target.get()
    }
}

impl PerformanceTimeline for FakePage {
    fn has_performance_timeline(&self) -> bool {
        !self.state.no_timeline.get()
    }

    fn now(&self) -> f64 {
        self.state.now.get()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.state.navigation.borrow().clone()
    }

    fn resource_entries(&self) -> Vec<ResourceTiming> {
        self.state.resources.borrow().clone()
    }

    fn paint_entries(&self) -> Vec<PaintTiming> {
        self.state.paints.borrow().clone()
    }
}

impl PageLifecycle for FakePage {
    fn visibility(&self) -> Visibility {
        if self.state.hidden.get() {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }

    fn ready_state(&self) -> ReadyState {
        if self.state.loading.get() {
            ReadyState::Loading
        } else if self.state.complete.get() {
            ReadyState::Complete
        } else {
            ReadyState::Interactive
        }
    }

    fn is_framed(&self) -> Result<bool, CollectorError> {
        self.state
            .framed
            .get()
            .ok_or_else(|| CollectorError::FrameCheck("SecurityError".into()))
    }

    fn connection(&self) -> ConnectionInfo {
        self.state.connection.borrow().clone()
    }

    fn location(&self) -> PageLocation {
        self.state.location.borrow().clone()
    }

    fn set_timeout(&self, delay_ms: f64, task: Box<dyn FnOnce()>) -> Result<(), CollectorError> {
        let seq = self.state.next_seq.get();
        self.state.next_seq.set(seq + 1);
        self.state.timers.borrow_mut().push(Timer {
            due: self.state.now.get() + delay_ms,
            seq,
            task,
        });
        Ok(())
    }

    fn on_load(&self, task: Box<dyn FnOnce()>) -> Result<(), CollectorError> {
        self.state.load_listeners.borrow_mut().push(task);
        Ok(())
    }

    fn on_visibility_change(
        &self,
        handler: Box<dyn FnMut() -> ListenerControl>,
    ) -> Result<(), CollectorError> {
        self.state.visibility_listeners.borrow_mut().push(handler);
        Ok(())
    }
}

impl BeaconTransport for FakePage {
    fn send_beacon(&self, url: &Url) -> Result<(), CollectorError> {
        self.state.beacons.borrow_mut().push(url.clone());
        Ok(())
    }
}

impl AttributeSource for FakePage {
    fn attribute(&self, name: &str) -> Option<String> {
        self.state.attributes.borrow().get(name).cloned()
    }
}
