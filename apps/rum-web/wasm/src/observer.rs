//! `PerformanceObserver` binding

use js_sys::{Array, Object, Reflect};
use rum_core::{CollectorError, EntryCallback, PerformanceEntry, SignalKind, Subscription};
use wasm_bindgen::prelude::*;

use crate::entries::{observed_entries, DomNode};

#[wasm_bindgen]
extern "C" {
    type PerformanceObserver;

    type PerformanceObserverEntryList;

    #[wasm_bindgen(constructor, catch)]
    fn new(callback: &js_sys::Function) -> Result<PerformanceObserver, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn observe(this: &PerformanceObserver, options: &Object) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = takeRecords)]
    fn take_records(this: &PerformanceObserver) -> Array;

    #[wasm_bindgen(method)]
    fn disconnect(this: &PerformanceObserver);

    #[wasm_bindgen(method, js_name = getEntries)]
    fn get_entries(this: &PerformanceObserverEntryList) -> Array;
}

/// A live observer for one entry type
///
/// Owns the callback closure, so the callback stays valid exactly as long as
/// the subscription does.
pub struct BrowserSubscription {
    kind: SignalKind,
    observer: PerformanceObserver,
    _callback: Closure<dyn FnMut(PerformanceObserverEntryList)>,
}

impl BrowserSubscription {
    /// Observe `kind` with `buffered: true`
    pub fn observe(
        kind: SignalKind,
        on_entry: EntryCallback<DomNode>,
    ) -> Result<Self, CollectorError> {
        let callback = Closure::wrap(Box::new(move |list: PerformanceObserverEntryList| {
            for entry in observed_entries(kind, &list.get_entries()) {
                on_entry(entry);
            }
        }) as Box<dyn FnMut(PerformanceObserverEntryList)>);

        let observer =
            PerformanceObserver::new(callback.as_ref().unchecked_ref()).map_err(|e| {
                CollectorError::Subscribe {
                    kind,
                    reason: format!("{:?}", e),
                }
            })?;

        let options = Object::new();
        let set = |key: &str, value: JsValue| Reflect::set(&options, &JsValue::from_str(key), &value);
        set("type", JsValue::from_str(kind.entry_type()))
            .and_then(|_| set("buffered", JsValue::TRUE))
            .map_err(|e| CollectorError::Platform(format!("{:?}", e)))?;

        observer
            .observe(&options)
            .map_err(|e| CollectorError::Subscribe {
                kind,
                reason: format!("{:?}", e),
            })?;

        Ok(Self {
            kind,
            observer,
            _callback: callback,
        })
    }
}

impl Subscription<DomNode> for BrowserSubscription {
    fn take_records(&mut self) -> Vec<PerformanceEntry<DomNode>> {
        observed_entries(self.kind, &self.observer.take_records())
    }

    fn disconnect(&mut self) {
        self.observer.disconnect();
    }
}
