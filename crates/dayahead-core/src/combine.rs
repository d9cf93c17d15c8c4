//! Concatenation of per-country results into combined datasets.
//!
//! Combined output keeps rows grouped per country in the order the
//! countries were requested; rows are never interleaved or re-sorted
//! across countries. In local mode the combined timezone label is the
//! shared zone suffix when every country reports from the same zone,
//! and [`MIXED_ZONE_LABEL`] otherwise.

use chrono_tz::Tz;

use crate::timezone::{zone_suffix_at, TimeMode, MIXED_ZONE_LABEL};
use crate::{CountryCode, DailyMetric, LocalizedPricePoint};

/// One country's fully processed results, ready for output.
#[derive(Debug, Clone)]
pub struct CountryResult {
    pub country: CountryCode,
    pub timezone: Tz,
    pub rows: Vec<LocalizedPricePoint>,
    pub metrics: Vec<DailyMetric>,
}

/// All requested countries concatenated, with a single filename label.
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    pub rows: Vec<LocalizedPricePoint>,
    pub metrics: Vec<DailyMetric>,
    pub timezone_label: String,
}

/// Concatenates per-country results in their given order.
///
/// `anchor` fixes the instant at which zone abbreviations are sampled
/// for the filename label, so one run names all its files consistently.
pub fn combine(
    results: &[CountryResult],
    mode: TimeMode,
    anchor: chrono::DateTime<chrono::Utc>,
) -> CombinedDataset {
    let mut rows = Vec::new();
    let mut metrics = Vec::new();
    for result in results {
        rows.extend(result.rows.iter().cloned());
        metrics.extend(result.metrics.iter().cloned());
    }

    CombinedDataset {
        rows,
        metrics,
        timezone_label: combined_label(results, mode, anchor),
    }
}

/// Filename timezone label for a combined dataset.
///
/// UTC mode always yields `utc`. Local mode yields the shared suffix
/// (e.g. `local_CEST`) when all countries agree, [`MIXED_ZONE_LABEL`]
/// when they do not.
pub fn combined_label(
    results: &[CountryResult],
    mode: TimeMode,
    anchor: chrono::DateTime<chrono::Utc>,
) -> String {
    match mode {
        TimeMode::Utc => zone_suffix_at(TimeMode::Utc, chrono_tz::UTC, anchor),
        TimeMode::Local => {
            let mut suffixes = results
                .iter()
                .map(|r| zone_suffix_at(TimeMode::Local, r.timezone, anchor));
            match suffixes.next() {
                None => MIXED_ZONE_LABEL.to_owned(),
                Some(first) => {
                    if suffixes.all(|s| s == first) {
                        first
                    } else {
                        MIXED_ZONE_LABEL.to_owned()
                    }
                }
            }
        }
    }
}
