//! `rum_core` platform traits on top of `web-sys`

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use rum_core::attributes::{ELEMENT_MARKER_SELECTOR, ELEMENT_TIMING_ATTRIBUTE};
use rum_core::entry::{ConnectionInfo, NavigationTiming, PageLocation, PaintTiming, ResourceTiming};
use rum_core::{
    AttributeSource, BeaconTransport, CollectorError, EntryCallback, ListenerControl,
    PageLifecycle, PerformanceTimeline, ReadyState, SignalKind, SignalSource, Subscription,
    Visibility,
};
use tracing::debug;
use url::Url;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, HtmlImageElement, Performance, VisibilityState, Window};

use crate::entries::{self, DomNode};
use crate::observer::BrowserSubscription;

fn platform_error(context: &str, err: JsValue) -> CollectorError {
    CollectorError::Platform(format!("{}: {:?}", context, err))
}

/// The current page, as seen by the collector
pub struct BrowserPlatform {
    window: Window,
    document: Document,
    performance: Option<Performance>,
    /// Script element carrying the `data-*` annotations
    script: Option<HtmlElement>,
}

impl BrowserPlatform {
    /// Bind to the global window
    ///
    /// `script` is the element whose dataset holds the annotations; when
    /// `None`, `document.currentScript` is used if there is one.
    pub fn new(script: Option<HtmlElement>) -> Result<Self, CollectorError> {
        let window = web_sys::window()
            .ok_or_else(|| CollectorError::Platform("no global window".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| CollectorError::Platform("no document".to_string()))?;
        let script = script.or_else(|| {
            document
                .current_script()
                .and_then(|e| e.dyn_into::<HtmlElement>().ok())
        });
        let performance = window.performance();

        Ok(Self {
            window,
            document,
            performance,
            script,
        })
    }

    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    fn entries_by_type(&self, entry_type: &str) -> Vec<JsValue> {
        match &self.performance {
            Some(performance) => performance.get_entries_by_type(entry_type).iter().collect(),
            None => Vec::new(),
        }
    }

    fn has_global(&self, name: &str) -> bool {
        Reflect::has(self.window.as_ref(), &JsValue::from_str(name)).unwrap_or(false)
    }
}

impl SignalSource for BrowserPlatform {
    type Element = DomNode;

    fn supports(&self, kind: SignalKind) -> bool {
        self.has_global("PerformanceObserver") && self.has_global(kind.interface_name())
    }

    fn observe(
        &self,
        kind: SignalKind,
        on_entry: EntryCallback<DomNode>,
    ) -> Result<Box<dyn Subscription<DomNode>>, CollectorError> {
        let subscription = BrowserSubscription::observe(kind, on_entry)?;
        Ok(Box::new(subscription))
    }

    fn element_timing_target(&self) -> Option<DomNode> {
        let element = self
            .document
            .query_selector(ELEMENT_MARKER_SELECTOR)
            .ok()
            .flatten()?;
        if !element.has_attribute(ELEMENT_TIMING_ATTRIBUTE) {
            debug!("Marked element has no elementtiming attribute");
            return None;
        }
        Some(DomNode(element))
    }
}

impl PerformanceTimeline for BrowserPlatform {
    fn has_performance_timeline(&self) -> bool {
        self.performance.as_ref().is_some_and(|performance| {
            entries::property(performance.as_ref(), "getEntriesByType")
                .is_some_and(|f| f.is_function())
        })
    }

    fn now(&self) -> f64 {
        self.performance
            .as_ref()
            .map(Performance::now)
            .unwrap_or(0.0)
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        let performance = self.performance.as_ref()?;
        let timing = entries::property(performance.as_ref(), "timing")?;
        Some(NavigationTiming {
            legacy: entries::legacy_timing(&timing),
            entry: self
                .entries_by_type("navigation")
                .first()
                .map(entries::navigation_entry),
        })
    }

    fn resource_entries(&self) -> Vec<ResourceTiming> {
        self.entries_by_type("resource")
            .iter()
            .map(entries::resource_timing)
            .collect()
    }

    fn paint_entries(&self) -> Vec<PaintTiming> {
        self.entries_by_type("paint")
            .iter()
            .filter_map(entries::paint_timing)
            .collect()
    }
}

impl PageLifecycle for BrowserPlatform {
    fn visibility(&self) -> Visibility {
        match self.document.visibility_state() {
            VisibilityState::Hidden => Visibility::Hidden,
            _ => Visibility::Visible,
        }
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::parse(&self.document.ready_state())
    }

    fn is_framed(&self) -> Result<bool, CollectorError> {
        match self.window.top() {
            Ok(Some(top)) => Ok(!Object::is(top.as_ref(), self.window.as_ref())),
            Ok(None) => Ok(false),
            Err(e) => Err(CollectorError::FrameCheck(format!("{:?}", e))),
        }
    }

    fn connection(&self) -> ConnectionInfo {
        entries::property(self.window.navigator().as_ref(), "connection")
            .map(|connection| entries::connection_info(&connection))
            .unwrap_or_default()
    }

    fn location(&self) -> PageLocation {
        let location = self.window.location();
        PageLocation {
            host_name: location.hostname().ok(),
            path_name: location.pathname().ok(),
        }
    }

    fn set_timeout(&self, delay_ms: f64, task: Box<dyn FnOnce()>) -> Result<(), CollectorError> {
        let callback = Closure::once_into_js(move || task());
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                delay_ms.round() as i32,
            )
            .map(|_| ())
            .map_err(|e| platform_error("setTimeout", e))
    }

    fn on_load(&self, task: Box<dyn FnOnce()>) -> Result<(), CollectorError> {
        let callback = Closure::once_into_js(move || task());
        self.window
            .add_event_listener_with_callback("load", callback.unchecked_ref())
            .map_err(|e| platform_error("load listener", e))
    }

    fn on_visibility_change(
        &self,
        mut handler: Box<dyn FnMut() -> ListenerControl>,
    ) -> Result<(), CollectorError> {
        // The listener removes itself, so it needs a handle to its own closure
        let slot: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let own = slot.clone();
        let document = self.document.clone();

        let callback = Closure::wrap(Box::new(move || {
            if handler() == ListenerControl::Keep {
                return;
            }
            if let Some(closure) = own.borrow_mut().take() {
                let listener: &Function = closure.as_ref().unchecked_ref();
                if let Err(e) =
                    document.remove_event_listener_with_callback("visibilitychange", listener)
                {
                    debug!(error = ?e, "Failed to detach visibility listener");
                }
            }
        }) as Box<dyn FnMut()>);

        self.document
            .add_event_listener_with_callback("visibilitychange", callback.as_ref().unchecked_ref())
            .map_err(|e| platform_error("visibilitychange listener", e))?;
        *slot.borrow_mut() = Some(callback);
        Ok(())
    }
}

impl BeaconTransport for BrowserPlatform {
    fn send_beacon(&self, url: &Url) -> Result<(), CollectorError> {
        let image = HtmlImageElement::new().map_err(|e| platform_error("Image", e))?;
        image.set_src(url.as_str());
        Ok(())
    }
}

impl AttributeSource for BrowserPlatform {
    fn attribute(&self, name: &str) -> Option<String> {
        self.script.as_ref()?.dataset().get(name)
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn annotated_script(pairs: &[(&str, &str)]) -> HtmlElement {
        let document = web_sys::window().unwrap().document().unwrap();
        let script: HtmlElement = document.create_element("script").unwrap().unchecked_into();
        for (name, value) in pairs {
            script.set_attribute(name, value).unwrap();
        }
        script
    }

    #[wasm_bindgen_test]
    fn test_dataset_annotations() {
        let script = annotated_script(&[
            ("data-provider", "wpcom"),
            ("data-custom-marks-prefixes", "app,lib"),
            ("data-allow-iframe", "true"),
        ]);
        let platform = BrowserPlatform::new(Some(script)).unwrap();
        assert_eq!(platform.attribute("provider").as_deref(), Some("wpcom"));
        assert_eq!(
            platform.attribute("customMarksPrefixes").as_deref(),
            Some("app,lib")
        );
        assert_eq!(platform.attribute("allowIframe").as_deref(), Some("true"));
        assert_eq!(platform.attribute("service"), None);
    }

    #[wasm_bindgen_test]
    fn test_no_current_script_outside_script_evaluation() {
        let platform = BrowserPlatform::new(None).unwrap();
        assert!(!platform.has_script());
        assert_eq!(platform.attribute("provider"), None);
    }

    #[wasm_bindgen_test]
    fn test_timeline_available() {
        let platform = BrowserPlatform::new(None).unwrap();
        assert!(platform.has_performance_timeline());
        assert!(platform.now() >= 0.0);
        assert!(platform.navigation_timing().is_some());
    }

    #[wasm_bindgen_test]
    fn test_element_target_requires_opt_in() {
        let document = web_sys::window().unwrap().document().unwrap();
        let body = document.body().unwrap();
        let img = document.create_element("img").unwrap();
        img.set_attribute("data-bilmur-mie", "").unwrap();
        body.append_child(&img).unwrap();

        let platform = BrowserPlatform::new(None).unwrap();
        assert!(platform.element_timing_target().is_none());

        img.set_attribute("elementtiming", "hero").unwrap();
        assert_eq!(platform.element_timing_target(), Some(DomNode(img.clone())));
        body.remove_child(&img).unwrap();
    }
}
