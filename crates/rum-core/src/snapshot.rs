//! Snapshot Builder
//!
//! Fills the fields that are read exactly once, at send time. Aggregator
//! fields already in the record are left as they are.

use tracing::{debug, instrument};

use crate::config::SendFlags;
use crate::entry::{ConnectionInfo, PageLocation};
use crate::metrics::{
    is_valid_number, round_half_up, write_navigation_timing, write_paint_timing,
    write_resource_timing,
};
use crate::platform::{PageLifecycle, PerformanceTimeline};
use crate::record::PerformanceRecord;

pub const EFFECTIVE_CONNECTION_TYPE_FIELD: &str = "effective_connection_type";
pub const RTT_FIELD: &str = "rtt";
pub const DOWNLINK_FIELD: &str = "downlink";
pub const HOST_NAME_FIELD: &str = "host_name";
pub const URL_PATH_FIELD: &str = "url_path";

/// Network information; downlink is reported in kbps
pub fn write_connection_info(info: &ConnectionInfo, record: &mut PerformanceRecord) {
    if let Some(effective_type) = info.effective_type.as_deref().filter(|t| !t.is_empty()) {
        record.set_text(EFFECTIVE_CONNECTION_TYPE_FIELD, effective_type);
    }
    if is_valid_number(info.rtt) {
        record.set_optional_number(RTT_FIELD, info.rtt);
    }
    if is_valid_number(info.downlink) {
        record.set_optional_number(DOWNLINK_FIELD, info.downlink.map(|d| round_half_up(d * 1000.0)));
    }
}

pub fn write_location(location: &PageLocation, record: &mut PerformanceRecord) {
    record.set_optional_text(HOST_NAME_FIELD, location.host_name.clone());
    record.set_optional_text(URL_PATH_FIELD, location.path_name.clone());
}

/// Read connection, location, navigation, paint and resource data into `record`
///
/// Navigation timing goes first: resource accounting keys off the
/// DOMContentLoaded offset it writes.
#[instrument(skip(platform, record))]
pub fn build_snapshot<P>(platform: &P, flags: SendFlags, record: &mut PerformanceRecord)
where
    P: PerformanceTimeline + PageLifecycle + ?Sized,
{
    write_connection_info(&platform.connection(), record);
    write_location(&platform.location(), record);

    match platform.navigation_timing() {
        Some(timing) => {
            write_navigation_timing(&timing, record);
        }
        None => debug!("Navigation timing unavailable"),
    }

    write_paint_timing(&platform.paint_entries(), record);
    write_resource_timing(&platform.resource_entries(), flags.periodic, record);
    debug!(fields = record.len(), "Snapshot built");
}
