//! Observer Manager
//!
//! Subscriptions to the signal streams are represented by [`ObserverHandle`],
//! a cancel-once capability, and kept in an [`ObserverRegistry`] keyed by
//! [`SignalKind`] so the coordinator can tear them all down at send time.

use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace, warn};

use crate::entry::{PerformanceEntry, SignalKind};
use crate::error::CollectorError;
use crate::platform::SignalSource;

/// Callback invoked once per delivered entry
pub type EntryCallback<E> = Rc<dyn Fn(PerformanceEntry<E>)>;

/// A live platform subscription
pub trait Subscription<E> {
    /// Drain entries recorded but not yet delivered to the callback
    fn take_records(&mut self) -> Vec<PerformanceEntry<E>>;

    /// Stop delivery; called at most once per subscription
    fn disconnect(&mut self);
}

/// Cancellation capability for one subscription
///
/// Cancelling is idempotent: the first call disconnects and drops the
/// subscription, later calls do nothing.
pub struct ObserverHandle<E> {
    kind: SignalKind,
    subscription: Option<Box<dyn Subscription<E>>>,
    on_entry: EntryCallback<E>,
}

impl<E> ObserverHandle<E> {
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Deliver any pending records to the callback
    ///
    /// Runs the callback path even when nothing is pending, so it is safe to
    /// call right before [`cancel`](Self::cancel).
    pub fn flush(&mut self) {
        let Some(subscription) = self.subscription.as_mut() else {
            return;
        };
        let pending = subscription.take_records();
        trace!(kind = %self.kind, pending = pending.len(), "Flushing observer");
        for entry in pending {
            (self.on_entry)(entry);
        }
    }

    pub fn cancel(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            debug!(kind = %self.kind, "Disconnecting observer");
            subscription.disconnect();
        }
    }
}

impl<E> Drop for ObserverHandle<E> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Subscribe to `kind`, requesting buffered entries as well as future ones
///
/// # Errors
///
/// - [`CollectorError::Unsupported`] if the capability probe fails; nothing
///   is subscribed in that case.
/// - Any error raised by the platform while subscribing.
pub fn subscribe<E, S>(
    source: &S,
    kind: SignalKind,
    on_entry: EntryCallback<E>,
) -> Result<ObserverHandle<E>, CollectorError>
where
    S: SignalSource<Element = E> + ?Sized,
{
    if !source.supports(kind) {
        return Err(CollectorError::Unsupported(kind));
    }
    let subscription = source.observe(kind, on_entry.clone())?;
    debug!(kind = %kind, "Observer subscribed");
    Ok(ObserverHandle {
        kind,
        subscription: Some(subscription),
        on_entry,
    })
}

/// Active subscriptions, one per signal kind
pub struct ObserverRegistry<E> {
    handles: BTreeMap<SignalKind, ObserverHandle<E>>,
}

impl<E> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
        }
    }
}

impl<E> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a handle, cancelling any previous one of the same kind
    pub fn insert(&mut self, handle: ObserverHandle<E>) {
        if let Some(mut previous) = self.handles.insert(handle.kind, handle) {
            warn!(kind = %previous.kind, "Replacing an existing observer");
            previous.cancel();
        }
    }

    pub fn is_active(&self, kind: SignalKind) -> bool {
        self.handles.get(&kind).is_some_and(ObserverHandle::is_active)
    }

    pub fn active_kinds(&self) -> Vec<SignalKind> {
        self.handles
            .values()
            .filter(|h| h.is_active())
            .map(ObserverHandle::kind)
            .collect()
    }

    /// Cancel a single kind; a no-op if it was never subscribed
    pub fn cancel(&mut self, kind: SignalKind) {
        if let Some(handle) = self.handles.get_mut(&kind) {
            handle.cancel();
        }
    }

    /// Remove every handle so it can be flushed without holding the registry
    pub fn drain(&mut self) -> Vec<ObserverHandle<E>> {
        std::mem::take(&mut self.handles).into_values().collect()
    }
}
