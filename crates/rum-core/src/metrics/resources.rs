//! Resource byte accounting
//!
//! Resources that finished before DOMContentLoaded are summed into three
//! buckets. Each entry's bytes go either to the cache total or to the
//! transferred total, decided by [`is_cache_served`].

use tracing::debug;

use crate::entry::{Checkpoint, ResourceTiming};
use crate::metrics::round_half_up;
use crate::record::PerformanceRecord;

pub const LAST_RESOURCE_END_FIELD: &str = "last_resource_end";

/// Below this duration a zero-transfer fetch is taken as served from cache
const FAST_FETCH_MS: f64 = 30.0;

/// Running totals for one resource class
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorBucket {
    name: &'static str,
    logical_bytes: f64,
    transferred_bytes: f64,
    cache_bytes: f64,
}

impl AccumulatorBucket {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            logical_bytes: 0.0,
            transferred_bytes: 0.0,
            cache_bytes: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn logical_bytes(&self) -> f64 {
        self.logical_bytes
    }

    pub fn transferred_bytes(&self) -> f64 {
        self.transferred_bytes
    }

    pub fn cache_bytes(&self) -> f64 {
        self.cache_bytes
    }

    pub fn add(&mut self, entry: &ResourceTiming) {
        let decoded = entry.decoded_body_size.unwrap_or(0.0);
        self.logical_bytes += decoded;
        if is_cache_served(entry) {
            self.cache_bytes += decoded;
        } else {
            self.transferred_bytes += entry.transfer_size.unwrap_or(0.0);
        }
    }

    /// `floor(cache / logical * 100)`, or `None` when nothing was loaded
    pub fn cache_percent(&self) -> Option<f64> {
        (self.logical_bytes > 0.0).then(|| (self.cache_bytes / self.logical_bytes * 100.0).floor())
    }

    pub fn write(&self, record: &mut PerformanceRecord) {
        record.set_number(format!("{}_size", self.name), self.logical_bytes);
        record.set_number(format!("{}_transferred", self.name), self.transferred_bytes);
        if let Some(percent) = self.cache_percent() {
            record.set_number(format!("{}_cache_percent", self.name), percent);
        }
    }
}

/// Cache-hit heuristic
///
/// Each disjunct covers a different way browsers and caching layers report
/// a response that did not cross the network in full. Undefined sizes make
/// their comparisons false.
pub fn is_cache_served(entry: &ResourceTiming) -> bool {
    let gt_zero = |v: Option<f64>| v.is_some_and(|v| v > 0.0);
    let transfer = entry.transfer_size;
    let encoded = entry.encoded_body_size;

    let explicit_cache = entry.delivery_type.as_deref() == Some("cache");
    let instant = entry.duration == 0.0;
    let partial = match (encoded, transfer) {
        (Some(e), Some(t)) => e > 0.0 && t > 0.0 && t < e,
        _ => false,
    };
    let no_transfer = transfer.is_some_and(|t| t <= 0.0)
        && (gt_zero(entry.decoded_body_size) || entry.duration < FAST_FETCH_MS);

    explicit_cache || instant || partial || no_transfer
}

/// Largest `round(responseEnd)` across all resources, 0 when there are none
pub fn last_resource_end(resources: &[ResourceTiming]) -> f64 {
    resources
        .iter()
        .map(|r| round_half_up(r.response_end))
        .fold(0.0, f64::max)
}

/// Write the bucket fields, plus `last_resource_end` for periodic sends
///
/// Does nothing until `nt_domContentLoadedEventStart` is in the record.
pub fn write_resource_timing(
    resources: &[ResourceTiming],
    periodic: bool,
    record: &mut PerformanceRecord,
) -> bool {
    let dcl = match record.number(&Checkpoint::DomContentLoadedEventStart.field()) {
        Some(dcl) if dcl != 0.0 => dcl,
        _ => {
            debug!("DOMContentLoaded not reached, skipping resource accounting");
            return false;
        }
    };

    let mut all = AccumulatorBucket::new("resource");
    let mut scripts = AccumulatorBucket::new("js");
    let mut blocking = AccumulatorBucket::new("blocking");

    for entry in resources.iter().filter(|r| r.response_end < dcl) {
        all.add(entry);
        if entry.initiator_type == "script" {
            scripts.add(entry);
        }
        if entry.render_blocking_status.as_deref() == Some("blocking") {
            blocking.add(entry);
        }
    }

    for bucket in [&all, &scripts, &blocking] {
        bucket.write(record);
    }

    if periodic {
        record.set_number(LAST_RESOURCE_END_FIELD, last_resource_end(resources));
    }
    true
}
