//! Custom marks and measures
//!
//! Entries are accepted only when their name starts with a configured
//! prefix. Accepted values accumulate for the page lifetime and both maps
//! are re-serialized in full after every accepted entry.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::entry::{UserTiming, UserTimingKind};
use crate::record::PerformanceRecord;

pub const MARKS_FIELD: &str = "custom_marks";
pub const MEASURES_FIELD: &str = "custom_measures";

lazy_static! {
    static ref LEADING_DIGIT: Regex = Regex::new(r"^[0-9]").unwrap();
    static ref NON_WORD: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Leading digit and every non-word character become `_`
pub fn normalize_name(name: &str) -> String {
    let name = LEADING_DIGIT.replace(name, "_");
    NON_WORD.replace_all(&name, "_").into_owned()
}

fn matches_prefix(normalized: &str, original: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .any(|p| normalized.starts_with(p.as_str()) || original.starts_with(p.as_str()))
}

/// `Math.round(x) || 0`
fn rounded_or_zero(value: f64) -> i64 {
    let rounded = super::round_half_up(value);
    if rounded.is_finite() {
        rounded as i64
    } else {
        0
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserTimingAggregator {
    mark_prefixes: Vec<String>,
    measure_prefixes: Vec<String>,
    marks: BTreeMap<String, i64>,
    measures: BTreeMap<String, i64>,
}

impl UserTimingAggregator {
    pub fn new(mark_prefixes: Vec<String>, measure_prefixes: Vec<String>) -> Self {
        Self {
            mark_prefixes,
            measure_prefixes,
            ..Self::default()
        }
    }

    /// Whether any entry could ever be accepted
    pub fn is_enabled(&self) -> bool {
        !self.mark_prefixes.is_empty() || !self.measure_prefixes.is_empty()
    }

    pub fn marks(&self) -> &BTreeMap<String, i64> {
        &self.marks
    }

    pub fn measures(&self) -> &BTreeMap<String, i64> {
        &self.measures
    }

    /// Accept or reject one entry, publishing both maps on acceptance
    pub fn record(&mut self, entry: &UserTiming, record: &mut PerformanceRecord) -> bool {
        let normalized = normalize_name(&entry.name);
        let accepted = match entry.kind {
            UserTimingKind::Mark if matches_prefix(&normalized, &entry.name, &self.mark_prefixes) => {
                self.marks.insert(normalized, rounded_or_zero(entry.start_time));
                true
            }
            UserTimingKind::Measure
                if matches_prefix(&normalized, &entry.name, &self.measure_prefixes) =>
            {
                self.measures.insert(normalized, rounded_or_zero(entry.duration));
                true
            }
            _ => false,
        };

        if !accepted {
            trace!(name = %entry.name, "User timing entry rejected");
            return false;
        }
        debug!(name = %entry.name, kind = ?entry.kind, "User timing entry accepted");
        self.write(record);
        true
    }

    fn write(&self, record: &mut PerformanceRecord) {
        if let Ok(marks) = serde_json::to_string(&self.marks) {
            record.set_text(MARKS_FIELD, marks);
        }
        if let Ok(measures) = serde_json::to_string(&self.measures) {
            record.set_text(MEASURES_FIELD, measures);
        }
    }
}
