//! Collector configuration
//!
//! Populated once from the script tag's annotations. After that only the two
//! [`SendFlags`] change, flipped by whichever trigger is about to attempt a
//! send.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::attributes::{self, AttributeSource};
use crate::error::CollectorError;

pub const DEFAULT_ENDPOINT: &str = "https://pixel.wp.com/boom.gif";
pub const DEFAULT_SETTLE_INTERVAL_MS: f64 = 2000.0;

/// Query pair identifying beacons from this collector
pub const MARKER_PARAM: (&str, &str) = ("bilmur", "1");

/// Flags describing the pending send attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFlags {
    /// Page was already hidden when the collector started
    pub final_send: bool,
    /// Send was triggered by quiescence polling
    pub periodic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Keep running when embedded in a frame
    #[serde(default)]
    pub allow_iframe: bool,
    /// Accepted name prefixes for `performance.mark()` entries
    #[serde(default)]
    pub mark_prefixes: Vec<String>,
    /// Accepted name prefixes for `performance.measure()` entries
    #[serde(default)]
    pub measure_prefixes: Vec<String>,
    /// Quiet period used by the load and quiescence triggers (default: 2000)
    #[serde(default = "default_settle_interval")]
    pub settle_interval_ms: f64,
    /// Collection endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub flags: SendFlags,
}

fn default_settle_interval() -> f64 {
    DEFAULT_SETTLE_INTERVAL_MS
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            allow_iframe: false,
            mark_prefixes: Vec::new(),
            measure_prefixes: Vec::new(),
            settle_interval_ms: DEFAULT_SETTLE_INTERVAL_MS,
            endpoint: default_endpoint(),
            flags: SendFlags::default(),
        }
    }
}

impl CollectorConfig {
    /// Build the configuration from the recognized annotations
    pub fn from_attributes(source: &dyn AttributeSource) -> Self {
        Self {
            allow_iframe: attributes::read_flag(source, attributes::ATTR_ALLOW_IFRAME),
            // Blank items are dropped: a trailing comma must not accept every name
            mark_prefixes: attributes::read_list(source, attributes::ATTR_MARK_PREFIXES),
            measure_prefixes: attributes::read_list(source, attributes::ATTR_MEASURE_PREFIXES),
            ..Self::default()
        }
    }

    /// Parse the endpoint
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidEndpoint`] if the endpoint is not an
    /// absolute URL.
    pub fn endpoint_url(&self) -> Result<Url, CollectorError> {
        Ok(Url::parse(&self.endpoint)?)
    }
}
