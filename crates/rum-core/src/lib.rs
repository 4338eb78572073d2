//! Real-user performance telemetry, collected once per page view
//!
//! This crate holds the platform-independent core of the collector:
//!
//! - **Observer Manager** ([`observer`]): cancel-once subscriptions to the
//!   layout-shift, LCP, element-timing, mark and measure streams
//! - **Metric Aggregators** ([`metrics`]): CLS, custom marks/measures,
//!   navigation-timing normalization and resource byte accounting
//! - **Snapshot Builder** ([`snapshot`]): the fields read once at send time
//! - **Send Coordinator** ([`coordinator`]): races the hidden, load-settle and
//!   quiescence triggers and guarantees at most one beacon
//! - **Beacon Transport** ([`beacon`]): record to GET URL
//!
//! The browser is reached through the traits in [`platform`]; the wasm app
//! implements them with `web-sys`.
//!
//! # Example
//!
//! ```ignore
//! use rum_core::Collector;
//!
//! // `page` implements `rum_core::Platform`
//! if let Some(collector) = Collector::start(page)? {
//!     // Triggers are armed; the collector sends on its own
//!     assert!(!collector.is_sent());
//! }
//! ```

pub mod attributes;
pub mod beacon;
pub mod config;
pub mod coordinator;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod platform;
pub mod record;
pub mod snapshot;

pub use attributes::AttributeSource;
pub use config::{CollectorConfig, SendFlags};
pub use coordinator::{Collector, SendOutcome, SendTrigger};
pub use entry::{PerformanceEntry, SignalKind};
pub use error::CollectorError;
pub use observer::{EntryCallback, ObserverHandle, Subscription};
pub use platform::{
    BeaconTransport, ListenerControl, PageLifecycle, PerformanceTimeline, Platform, ReadyState,
    SignalSource, Visibility,
};
pub use record::{MetricValue, PerformanceRecord};
