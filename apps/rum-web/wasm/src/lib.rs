//! WASM entry point for the real-user performance collector
//!
//! The collector logic lives in `rum-core`; this crate only binds it to the
//! browser. Annotations are read from the `data-*` attributes of the script
//! element the host passes to [`start`]. Module start only installs the panic
//! hook (and the console logger); by the time it runs after async
//! instantiation, `document.currentScript` is already null.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { start } from './pkg/rum_wasm.js';
//!
//! await init();
//! start(document.querySelector('script[data-provider]'));
//! ```

pub mod browser;
pub mod entries;
#[cfg(feature = "console-log")]
pub mod logging;
pub mod observer;

use std::cell::RefCell;

use rum_core::Collector;
use wasm_bindgen::prelude::*;

pub use browser::BrowserPlatform;
pub use entries::DomNode;

thread_local! {
    static COLLECTOR: RefCell<Option<Collector<BrowserPlatform>>> = const { RefCell::new(None) };
}

/// Called automatically by wasm-bindgen; collection starts with [`start`]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    #[cfg(feature = "console-log")]
    logging::init();
}

fn is_running() -> bool {
    COLLECTOR.with(|c| c.borrow().is_some())
}

/// Start the collector for this page
///
/// Returns whether a collector is running afterwards: `false` when the page
/// is gated off (framed, or no performance timeline). Calling it again once
/// a collector runs does nothing.
#[wasm_bindgen]
pub fn start(script: Option<web_sys::HtmlElement>) -> Result<bool, JsValue> {
    if is_running() {
        return Ok(true);
    }

    let platform = BrowserPlatform::new(script).map_err(|e| JsValue::from_str(&e.to_string()))?;
    if !platform.has_script() {
        tracing::debug!("No annotated script element, using defaults");
    }
    let collector =
        Collector::start(platform).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let running = collector.is_some();
    COLLECTOR.with(|c| *c.borrow_mut() = collector);
    Ok(running)
}

/// Whether the beacon for this page has been claimed
#[wasm_bindgen(js_name = isSent)]
pub fn is_sent() -> bool {
    COLLECTOR.with(|c| c.borrow().as_ref().is_some_and(Collector::is_sent))
}

/// Get the library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
