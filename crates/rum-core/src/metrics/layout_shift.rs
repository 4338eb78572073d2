use tracing::trace;

use crate::entry::LayoutShift;
use crate::metrics::round_half_up;
use crate::record::PerformanceRecord;

pub const FIELD: &str = "cumulative_layout_shift";

/// Cumulative layout shift accumulator
///
/// The reported score is recomputed from the unrounded running sum on every
/// update, so rounding error never accumulates.
#[derive(Debug, Clone, Default)]
pub struct LayoutShiftAggregator {
    sum: f64,
}

impl LayoutShiftAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one shift; shifts caused by recent input are ignored
    pub fn add(&mut self, entry: &LayoutShift) {
        if !entry.had_recent_input {
            self.sum += entry.value;
        }
    }

    /// The score at three-decimal precision
    pub fn score(&self) -> f64 {
        round_half_up(self.sum * 1000.0) / 1000.0
    }

    pub fn write(&self, record: &mut PerformanceRecord) {
        record.set_number(FIELD, self.score());
    }

    /// Add a shift and publish the new score
    pub fn record(&mut self, entry: &LayoutShift, record: &mut PerformanceRecord) {
        self.add(entry);
        trace!(value = entry.value, recent_input = entry.had_recent_input, score = self.score(), "Layout shift");
        self.write(record);
    }
}
