//! Navigation-timing normalization
//!
//! Every checkpoint is reported as an offset from navigation start. A
//! checkpoint that never happened, or that precedes navigation start, is
//! left out of the record instead of being reported as zero.

use serde::Serialize;
use tracing::debug;

use crate::entry::{Checkpoint, NavigationTiming};
use crate::record::PerformanceRecord;

pub const API_LEVEL_FIELD: &str = "nt_api_level";
pub const REDIRECT_COUNT_FIELD: &str = "nt_redirectCount";
pub const NEXT_HOP_PROTOCOL_FIELD: &str = "nt_nextHopProtocol";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiLevel {
    Level1 = 1,
    Level2 = 2,
}

impl ApiLevel {
    /// Level 2 when the navigation entry starts exactly at the time origin
    pub fn detect(timing: &NavigationTiming) -> Self {
        match &timing.entry {
            Some(entry) if entry.start_time == 0.0 => ApiLevel::Level2,
            _ => ApiLevel::Level1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self as u8 as f64
    }
}

/// `value - navigation_start`, if both are positive and the result is not negative
pub fn checkpoint_offset(value: Option<f64>, navigation_start: Option<f64>) -> Option<f64> {
    let value = value.filter(|v| *v > 0.0)?;
    let start = navigation_start.filter(|s| *s > 0.0)?;
    let offset = value - start;
    (offset >= 0.0).then_some(offset)
}

/// Write the `nt_*` fields
///
/// Returns `false` (and writes nothing) when navigation start is unknown.
pub fn write_navigation_timing(timing: &NavigationTiming, record: &mut PerformanceRecord) -> bool {
    let navigation_start = timing.legacy.navigation_start;
    if !navigation_start.is_some_and(|s| s != 0.0 && !s.is_nan()) {
        debug!("No navigation start, skipping navigation timing");
        return false;
    }

    let level = ApiLevel::detect(timing);
    for checkpoint in Checkpoint::ALL {
        let offset = checkpoint_offset(timing.legacy.get(checkpoint), navigation_start);
        record.set_optional_number(checkpoint.field(), offset);
    }

    let entry = timing.entry.as_ref();
    if level == ApiLevel::Level2 {
        if let Some(secure) = entry
            .and_then(|e| e.secure_connection_start)
            .filter(|s| *s > 0.0)
        {
            record.set_number(Checkpoint::SecureConnectionStart.field(), secure.floor());
        }
    }
    record.set_optional_number(REDIRECT_COUNT_FIELD, entry.and_then(|e| e.redirect_count));
    record.set_optional_text(
        NEXT_HOP_PROTOCOL_FIELD,
        entry.and_then(|e| e.next_hop_protocol.clone()),
    );
    record.set_number(API_LEVEL_FIELD, level.as_f64());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LegacyTiming, NavigationEntry};
    use pretty_assertions::assert_eq;

    const NAV_START: f64 = 1_700_000_000_000.0;

    fn legacy() -> LegacyTiming {
        LegacyTiming::new(Some(NAV_START))
            .with(Checkpoint::FetchStart, NAV_START + 3.0)
            .with(Checkpoint::ResponseEnd, NAV_START + 120.0)
            .with(Checkpoint::DomContentLoadedEventStart, NAV_START + 450.0)
            .with(Checkpoint::UnloadEventStart, 0.0)
            .with(Checkpoint::SecureConnectionStart, NAV_START + 40.0)
    }

    #[test]
    fn test_offsets_and_omissions() {
        let timing = NavigationTiming { legacy: legacy(), entry: None };
        let mut record = PerformanceRecord::new();
        assert!(write_navigation_timing(&timing, &mut record));

        assert_eq!(record.number("nt_fetchStart"), Some(3.0));
        assert_eq!(record.number("nt_responseEnd"), Some(120.0));
        assert_eq!(record.number("nt_domContentLoadedEventStart"), Some(450.0));
        assert_eq!(record.number("nt_secureConnectionStart"), Some(40.0));
        // Zero means "did not happen"
        assert!(!record.contains("nt_unloadEventStart"));
        assert!(!record.contains("nt_loadEventEnd"));
        assert_eq!(record.number(API_LEVEL_FIELD), Some(1.0));
        assert!(!record.contains(REDIRECT_COUNT_FIELD));
    }

    #[test]
    fn test_checkpoint_before_navigation_start() {
        assert_eq!(checkpoint_offset(Some(NAV_START - 1.0), Some(NAV_START)), None);
        assert_eq!(checkpoint_offset(Some(NAV_START), Some(NAV_START)), Some(0.0));
        assert_eq!(checkpoint_offset(Some(f64::NAN), Some(NAV_START)), None);
        assert_eq!(checkpoint_offset(Some(10.0), None), None);
    }

    #[test]
    fn test_level_two_secure_connection() {
        let timing = NavigationTiming {
            legacy: legacy(),
            entry: Some(NavigationEntry {
                start_time: 0.0,
                secure_connection_start: Some(38.7),
                redirect_count: Some(1.0),
                next_hop_protocol: Some("h2".into()),
            }),
        };
        let mut record = PerformanceRecord::new();
        write_navigation_timing(&timing, &mut record);

        assert_eq!(record.number(API_LEVEL_FIELD), Some(2.0));
        assert_eq!(record.number("nt_secureConnectionStart"), Some(38.0));
        assert_eq!(record.number(REDIRECT_COUNT_FIELD), Some(1.0));
        assert_eq!(record.text(NEXT_HOP_PROTOCOL_FIELD), Some("h2"));
    }

    #[test]
    fn test_level_two_ignores_non_positive_secure_connection() {
        let timing = NavigationTiming {
            legacy: legacy(),
            entry: Some(NavigationEntry {
                start_time: 0.0,
                secure_connection_start: Some(0.0),
                ..NavigationEntry::default()
            }),
        };
        let mut record = PerformanceRecord::new();
        write_navigation_timing(&timing, &mut record);
        // Falls back to the level 1 offset
        assert_eq!(record.number("nt_secureConnectionStart"), Some(40.0));
    }

    #[test]
    fn test_nonzero_entry_start_is_level_one() {
        let timing = NavigationTiming {
            legacy: legacy(),
            entry: Some(NavigationEntry { start_time: 5.0, ..NavigationEntry::default() }),
        };
        assert_eq!(ApiLevel::detect(&timing), ApiLevel::Level1);
    }

    #[test]
    fn test_missing_navigation_start() {
        let timing = NavigationTiming {
            legacy: LegacyTiming::new(None).with(Checkpoint::FetchStart, 5.0),
            entry: None,
        };
        let mut record = PerformanceRecord::new();
        assert!(!write_navigation_timing(&timing, &mut record));
        assert!(record.is_empty());
    }
}
