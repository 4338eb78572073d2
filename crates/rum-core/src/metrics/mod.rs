//! Metric aggregators
//!
//! - **Layout shift**: running CLS sum, excluding input-driven shifts
//! - **Paint**: LCP, element timing and paint-timing entries
//! - **User timing**: prefix-gated custom marks and measures
//! - **Navigation**: level 1/2 timing normalized against navigation start
//! - **Resources**: byte accounting with the cache-hit heuristic

pub mod layout_shift;
pub mod navigation;
pub mod paint;
pub mod resources;
pub mod user_timing;

pub use layout_shift::LayoutShiftAggregator;
pub use navigation::{write_navigation_timing, ApiLevel};
pub use paint::{record_largest_contentful_paint, write_paint_timing, ElementTimingTracker};
pub use resources::{write_resource_timing, AccumulatorBucket};
pub use user_timing::UserTimingAggregator;

/// `Math.round`: halves round towards positive infinity
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// A number that is zero or positive (NaN and undefined are not)
pub(crate) fn is_valid_number(value: Option<f64>) -> bool {
    value.is_some_and(|v| v >= 0.0)
}
