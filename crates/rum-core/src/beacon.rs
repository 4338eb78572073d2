//! Beacon Transport
//!
//! Serializes the record into a GET URL and hands it to the platform's
//! fire-and-forget transport. No response is read and nothing is retried.

use tracing::{debug, instrument};
use url::Url;

use crate::config::MARKER_PARAM;
use crate::error::CollectorError;
use crate::platform::BeaconTransport;
use crate::record::PerformanceRecord;

/// Build the beacon URL, or `None` when the record has no fields
pub fn beacon_url(endpoint: &Url, record: &PerformanceRecord) -> Option<Url> {
    if record.is_empty() {
        return None;
    }
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query.append_pair(MARKER_PARAM.0, MARKER_PARAM.1);
        for (key, value) in record.iter() {
            query.append_pair(key, &value.to_string());
        }
    }
    Some(url)
}

/// Serialize and fire; returns whether a request was issued
#[instrument(skip_all)]
pub fn deliver<T>(transport: &T, endpoint: &Url, record: &PerformanceRecord) -> Result<bool, CollectorError>
where
    T: BeaconTransport + ?Sized,
{
    let Some(url) = beacon_url(endpoint, record) else {
        debug!("Record is empty, no beacon sent");
        return Ok(false);
    };
    debug!(fields = record.len(), "Sending beacon");
    transport.send_beacon(&url)?;
    Ok(true)
}
