//! Send Coordinator
//!
//! Owns the record, the aggregators and the observer registry for one page.
//! Three triggers race to send: the page becoming hidden, a settle delay
//! after load, and quiescence polling. All of them go through
//! [`Collector::attempt_send`], whose first step claims the single `sent`
//! flag, so at most one beacon leaves the page.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::attributes::{self, AttributeSource};
use crate::beacon;
use crate::config::{CollectorConfig, SendFlags};
use crate::entry::{PerformanceEntry, SignalKind};
use crate::error::CollectorError;
use crate::metrics::paint::ELEMENT_RENDER_FIELD;
use crate::metrics::{
    record_largest_contentful_paint, ElementTimingTracker, LayoutShiftAggregator,
    UserTimingAggregator,
};
use crate::observer::{self, EntryCallback, ObserverRegistry};
use crate::platform::{ListenerControl, Platform, ReadyState, Visibility};
use crate::record::PerformanceRecord;
use crate::snapshot::build_snapshot;

pub const PROVIDER_FIELD: &str = "provider";
pub const SERVICE_FIELD: &str = "service";
pub const CUSTOM_PROPERTIES_FIELD: &str = "custom_properties";

/// Which trigger is attempting the send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTrigger {
    /// The page was already hidden at start
    InitiallyHidden,
    /// The page transitioned to hidden
    VisibilityHidden,
    /// The settle delay after the load event elapsed
    LoadSettled,
    /// No resource completed for a full settle interval
    Quiescent,
}

impl SendTrigger {
    fn apply(self, flags: &mut SendFlags) {
        match self {
            SendTrigger::InitiallyHidden => flags.final_send = true,
            SendTrigger::VisibilityHidden => flags.final_send = false,
            SendTrigger::Quiescent => flags.periodic = true,
            SendTrigger::LoadSettled => {}
        }
    }
}

/// Result of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// This attempt won the claim and a beacon was fired
    Sent,
    /// This attempt won the claim but the record was empty
    Empty,
    /// Another attempt already claimed the send
    AlreadySent,
    /// The document is still loading; nothing was claimed
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendState {
    Collecting,
    Sent,
}

/// Delay before the next quiescence check
///
/// Polls at 5% of the interval once the quiet gap covers at least 75% of
/// it, otherwise at 25%.
pub fn next_poll_delay(gap_ms: f64, interval_ms: f64) -> f64 {
    if gap_ms >= 0.75 * interval_ms {
        0.05 * interval_ms
    } else {
        0.25 * interval_ms
    }
}

struct Inner<P: Platform> {
    platform: P,
    endpoint: Url,
    config: RefCell<CollectorConfig>,
    record: RefCell<PerformanceRecord>,
    state: Cell<SendState>,
    observers: RefCell<ObserverRegistry<P::Element>>,
    layout_shift: RefCell<LayoutShiftAggregator>,
    user_timing: RefCell<UserTimingAggregator>,
    element_tracker: Option<ElementTimingTracker<P::Element>>,
}

/// The per-page collector
///
/// Cloning yields another handle to the same page state.
pub struct Collector<P: Platform + 'static> {
    inner: Rc<Inner<P>>,
}

impl<P: Platform + 'static> Clone for Collector<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Platform + 'static> Collector<P> {
    /// Start collecting with configuration read from the platform's annotations
    ///
    /// See [`start_with_config`](Self::start_with_config).
    pub fn start(platform: P) -> Result<Option<Self>, CollectorError> {
        let config = CollectorConfig::from_attributes(&platform);
        Self::start_with_config(platform, config)
    }

    /// Start collecting
    ///
    /// Returns `Ok(None)` when the collector must stay inert: no performance
    /// timeline, or running inside a frame without `allowIframe`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidEndpoint`] if the configured endpoint
    /// cannot be parsed.
    pub fn start_with_config(
        platform: P,
        config: CollectorConfig,
    ) -> Result<Option<Self>, CollectorError> {
        if !platform.has_performance_timeline() {
            debug!("Performance timeline unavailable, collector disabled");
            return Ok(None);
        }
        if !config.allow_iframe {
            match platform.is_framed() {
                Ok(false) => {}
                Ok(true) => {
                    debug!("Running inside a frame, collector disabled");
                    return Ok(None);
                }
                Err(e) => {
                    debug!(error = %e, "Frame check failed, collector disabled");
                    return Ok(None);
                }
            }
        }
        let endpoint = config.endpoint_url()?;

        let element_tracker = if platform.supports(SignalKind::Element) {
            platform.element_timing_target().map(ElementTimingTracker::new)
        } else {
            None
        };
        let user_timing =
            UserTimingAggregator::new(config.mark_prefixes.clone(), config.measure_prefixes.clone());

        let inner = Rc::new(Inner {
            platform,
            endpoint,
            config: RefCell::new(config),
            record: RefCell::new(PerformanceRecord::new()),
            state: Cell::new(SendState::Collecting),
            observers: RefCell::new(ObserverRegistry::new()),
            layout_shift: RefCell::new(LayoutShiftAggregator::new()),
            user_timing: RefCell::new(user_timing),
            element_tracker,
        });

        inner.write_identity();
        inner.subscribe_all();
        info!(observers = ?inner.observers.borrow().active_kinds(), "Collector started");

        inner.arm_visibility();
        inner.arm_load_settle();
        inner.poll_quiescence();

        Ok(Some(Self { inner }))
    }

    /// Try to send; only the first successful claim per page sends
    pub fn attempt_send(&self, trigger: SendTrigger) -> SendOutcome {
        self.inner.attempt_send(trigger)
    }

    pub fn is_sent(&self) -> bool {
        self.inner.state.get() == SendState::Sent
    }

    /// Copy of the record as it stands
    pub fn record(&self) -> PerformanceRecord {
        self.inner.record.borrow().clone()
    }

    pub fn config(&self) -> CollectorConfig {
        self.inner.config.borrow().clone()
    }

    pub fn active_observers(&self) -> Vec<SignalKind> {
        self.inner.observers.borrow().active_kinds()
    }

    pub fn platform(&self) -> &P {
        &self.inner.platform
    }
}

impl<P: Platform + 'static> Inner<P> {
    fn write_identity(&self) {
        let source: &dyn AttributeSource = &self.platform;
        let mut record = self.record.borrow_mut();
        record.set_optional_text(
            PROVIDER_FIELD,
            attributes::read_string(source, attributes::ATTR_PROVIDER, None),
        );
        record.set_optional_text(
            SERVICE_FIELD,
            attributes::read_string(source, attributes::ATTR_SERVICE, None),
        );
        let raw = source.attribute(attributes::ATTR_CUSTOM_PROPERTIES);
        record.set_optional_text(
            CUSTOM_PROPERTIES_FIELD,
            attributes::parse_custom_properties(raw.as_deref()),
        );
    }

    fn subscribe_all(self: &Rc<Self>) {
        self.subscribe_kind(SignalKind::LayoutShift);
        if self.observers.borrow().is_active(SignalKind::LayoutShift) {
            self.layout_shift.borrow().write(&mut self.record.borrow_mut());
        }

        self.subscribe_kind(SignalKind::LargestContentfulPaint);

        if self.element_tracker.is_some() {
            self.subscribe_kind(SignalKind::Element);
            // Buffered delivery may already have matched during subscribe
            if self.record.borrow().contains(ELEMENT_RENDER_FIELD) {
                self.observers.borrow_mut().cancel(SignalKind::Element);
            }
        }

        let custom_supported = self.platform.supports(SignalKind::Mark)
            && self.platform.supports(SignalKind::Measure);
        if custom_supported && self.user_timing.borrow().is_enabled() {
            self.subscribe_kind(SignalKind::Mark);
            if self.observers.borrow().is_active(SignalKind::Mark) {
                self.subscribe_kind(SignalKind::Measure);
            }
        }
    }

    fn subscribe_kind(self: &Rc<Self>, kind: SignalKind) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let on_entry: EntryCallback<P::Element> = Rc::new(move |entry| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_entry(entry);
            }
        });

        match observer::subscribe(&self.platform, kind, on_entry) {
            Ok(handle) => self.observers.borrow_mut().insert(handle),
            Err(CollectorError::Unsupported(_)) => {
                debug!(kind = %kind, "Signal not supported, skipping");
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Subscription failed");
                self.abandon(kind);
            }
        }
    }

    /// Clean up after a failed subscription; marks and measures go together
    fn abandon(&self, kind: SignalKind) {
        let mut observers = self.observers.borrow_mut();
        match kind {
            SignalKind::Mark | SignalKind::Measure => {
                observers.cancel(SignalKind::Mark);
                observers.cancel(SignalKind::Measure);
            }
            other => observers.cancel(other),
        }
    }

    fn handle_entry(&self, entry: PerformanceEntry<P::Element>) {
        match entry {
            PerformanceEntry::LayoutShift(shift) => {
                self.layout_shift
                    .borrow_mut()
                    .record(&shift, &mut self.record.borrow_mut());
            }
            PerformanceEntry::LargestContentfulPaint(lcp) => {
                record_largest_contentful_paint(&lcp, &mut self.record.borrow_mut());
            }
            PerformanceEntry::Element(timing) => {
                let Some(tracker) = &self.element_tracker else {
                    return;
                };
                let matched = tracker.record(&timing, &mut self.record.borrow_mut());
                if matched {
                    debug!(render_time = timing.render_time, "Tracked element rendered");
                    // Skipped if the registry is mid-update
                    if let Ok(mut observers) = self.observers.try_borrow_mut() {
                        observers.cancel(SignalKind::Element);
                    }
                }
            }
            PerformanceEntry::UserTiming(timing) => {
                self.user_timing
                    .borrow_mut()
                    .record(&timing, &mut self.record.borrow_mut());
            }
        }
    }

    /// Flush every observer's pending entries, then disconnect it
    fn teardown_observers(&self) {
        let handles = self.observers.borrow_mut().drain();
        for mut handle in handles {
            handle.flush();
            handle.cancel();
        }
    }

    #[instrument(skip(self))]
    fn attempt_send(&self, trigger: SendTrigger) -> SendOutcome {
        trigger.apply(&mut self.config.borrow_mut().flags);

        if self.state.get() == SendState::Sent {
            self.teardown_observers();
            debug!("Already sent");
            return SendOutcome::AlreadySent;
        }
        if self.platform.ready_state() == ReadyState::Loading {
            debug!("Document still loading, send deferred");
            return SendOutcome::NotReady;
        }

        // Claim before anything else can run
        self.state.set(SendState::Sent);
        self.teardown_observers();

        let flags = self.config.borrow().flags;
        let sent = {
            let mut record = self.record.borrow_mut();
            build_snapshot(&self.platform, flags, &mut record);
            beacon::deliver(&self.platform, &self.endpoint, &record)
        };

        match sent {
            Ok(true) => {
                info!(?flags, "Beacon sent");
                SendOutcome::Sent
            }
            Ok(false) => SendOutcome::Empty,
            Err(e) => {
                // Fire-and-forget: the claim stands even if the request failed
                warn!(error = %e, "Beacon delivery failed");
                SendOutcome::Sent
            }
        }
    }

    fn is_sent(&self) -> bool {
        self.state.get() == SendState::Sent
    }

    fn settle_interval(&self) -> f64 {
        self.config.borrow().settle_interval_ms
    }

    /// Run `task` after `delay_ms`; scheduling failures are logged and dropped
    fn schedule(self: &Rc<Self>, delay_ms: f64, task: impl FnOnce(&Rc<Self>) + 'static) {
        let inner = self.clone();
        let result = self
            .platform
            .set_timeout(delay_ms, Box::new(move || task(&inner)));
        if let Err(e) = result {
            warn!(error = %e, delay_ms, "Failed to schedule timer");
        }
    }

    fn arm_visibility(self: &Rc<Self>) {
        if self.platform.visibility() == Visibility::Hidden {
            debug!("Page hidden at start");
            self.attempt_send(SendTrigger::InitiallyHidden);
            return;
        }

        let inner = self.clone();
        let result = self.platform.on_visibility_change(Box::new(move || {
            if inner.platform.visibility() != Visibility::Hidden {
                return ListenerControl::Keep;
            }
            inner.attempt_send(SendTrigger::VisibilityHidden);
            ListenerControl::Detach
        }));
        if let Err(e) = result {
            warn!(error = %e, "Failed to listen for visibility changes");
        }
    }

    fn arm_load_settle(self: &Rc<Self>) {
        let inner = self.clone();
        let settle = move || {
            let interval = inner.settle_interval();
            inner.schedule(interval, |inner| {
                inner.attempt_send(SendTrigger::LoadSettled);
            });
        };

        if self.platform.ready_state() == ReadyState::Complete {
            settle();
        } else if let Err(e) = self.platform.on_load(Box::new(settle)) {
            warn!(error = %e, "Failed to listen for load");
        }
    }

    fn poll_quiescence(self: &Rc<Self>) {
        if self.is_sent() {
            return;
        }
        let interval = self.settle_interval();
        let last_end = self
            .platform
            .resource_entries()
            .iter()
            .map(|r| r.response_end)
            .fold(0.0, f64::max);
        let gap = self.platform.now().floor() - last_end.floor();

        if gap > interval {
            if self.attempt_send(SendTrigger::Quiescent) == SendOutcome::NotReady {
                self.schedule(0.25 * interval, |inner| inner.poll_quiescence());
            }
            return;
        }
        self.schedule(next_poll_delay(gap, interval), |inner| inner.poll_quiescence());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_poll_delay() {
        assert_eq!(next_poll_delay(0.0, 2000.0), 500.0);
        assert_eq!(next_poll_delay(1499.0, 2000.0), 500.0);
        assert_eq!(next_poll_delay(1500.0, 2000.0), 100.0);
        assert_eq!(next_poll_delay(2000.0, 2000.0), 100.0);
    }

    #[test]
    fn test_trigger_flags() {
        let mut flags = SendFlags::default();
        SendTrigger::InitiallyHidden.apply(&mut flags);
        assert!(flags.final_send);
        SendTrigger::Quiescent.apply(&mut flags);
        assert!(flags.periodic);
        SendTrigger::VisibilityHidden.apply(&mut flags);
        assert!(!flags.final_send);
        assert!(flags.periodic);
    }
}
