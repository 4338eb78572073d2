//! Paint-related signals: LCP, element timing and paint entries

use tracing::trace;

use crate::entry::{ElementTiming, LargestContentfulPaint, PaintTiming};
use crate::metrics::round_half_up;
use crate::record::PerformanceRecord;

pub const LCP_FIELD: &str = "largest_contentful_paint";
pub const ELEMENT_RENDER_FIELD: &str = "mie_renderTime";
pub const START_RENDER_FIELD: &str = "start_render";
pub const FCP_FIELD: &str = "first_contentful_paint";

/// Overwrite LCP with the latest candidate
pub fn record_largest_contentful_paint(entry: &LargestContentfulPaint, record: &mut PerformanceRecord) {
    trace!(start_time = entry.start_time, "LCP candidate");
    record.set_number(LCP_FIELD, round_half_up(entry.start_time));
}

/// Tracks render time of the one element the page opted in
#[derive(Debug, Clone)]
pub struct ElementTimingTracker<E> {
    target: E,
}

impl<E: PartialEq> ElementTimingTracker<E> {
    pub fn new(target: E) -> Self {
        Self { target }
    }

    /// Record the entry if it belongs to the tracked node
    ///
    /// Returns `true` on a match; the observer is no longer needed after that.
    pub fn record(&self, entry: &ElementTiming<E>, record: &mut PerformanceRecord) -> bool {
        if entry.element.as_ref() != Some(&self.target) {
            return false;
        }
        record.set_number(ELEMENT_RENDER_FIELD, round_half_up(entry.render_time));
        true
    }
}

/// First paint and first contentful paint
pub fn write_paint_timing(entries: &[PaintTiming], record: &mut PerformanceRecord) {
    for entry in entries {
        match entry.name.as_str() {
            "first-paint" => {
                record.set_number(START_RENDER_FIELD, round_half_up(entry.start_time));
            }
            "first-contentful-paint" => {
                record.set_number(FCP_FIELD, round_half_up(entry.start_time));
            }
            _ => {}
        }
    }
}
