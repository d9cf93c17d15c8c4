//! Timezone normalization of UTC price series.
//!
//! Conversion is per-instant relabeling: every UTC point maps to exactly
//! one local representation, so the series is never shortened or padded.
//! During a fall-back transition the repeated local hour appears twice,
//! distinguished by offset; during spring-forward the skipped local hour
//! simply never occurs as a label, because the mapping from UTC is total
//! and upstream data stays hourly across the transition.

use chrono::{DateTime, Offset, Utc};
use chrono_tz::{OffsetName, Tz};
use serde::{Deserialize, Serialize};

use crate::{LocalizedPricePoint, PricePoint};

/// Timezone label used when a combined dataset spans several zones.
pub const MIXED_ZONE_LABEL: &str = "local_mixed";

/// Target representation for timestamps: pass-through UTC or the
/// country's local zone. Exactly one is selected per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    Utc,
    Local,
}

impl TimeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utc => "utc",
            Self::Local => "local",
        }
    }
}

/// Re-express a UTC series in the target representation.
///
/// Never drops or fabricates points; only relabels them.
pub fn normalize(points: &[PricePoint], mode: TimeMode, tz: Tz) -> Vec<LocalizedPricePoint> {
    points
        .iter()
        .map(|point| match mode {
            TimeMode::Utc => LocalizedPricePoint {
                point: point.clone(),
                local_timestamp: point.timestamp_utc.fixed_offset(),
                zone_abbreviation: String::from("UTC"),
            },
            TimeMode::Local => {
                let local = point.timestamp_utc.with_timezone(&tz);
                LocalizedPricePoint {
                    point: point.clone(),
                    local_timestamp: local.fixed_offset(),
                    zone_abbreviation: abbreviation_at(tz, point.timestamp_utc),
                }
            }
        })
        .collect()
}

/// Zone abbreviation in force at the given instant (CET vs CEST).
///
/// Zones without a named abbreviation fall back to the numeric offset.
pub fn abbreviation_at(tz: Tz, instant: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&tz);
    match local.offset().abbreviation() {
        Some(name) => name.to_owned(),
        None => local.offset().fix().to_string(),
    }
}

/// Filename suffix for a timezone mode, e.g. `utc` or `local_CEST`.
///
/// Mirrors the output naming convention: the local suffix carries the
/// abbreviation in force at the given instant.
pub fn zone_suffix_at(mode: TimeMode, tz: Tz, instant: DateTime<Utc>) -> String {
    match mode {
        TimeMode::Utc => String::from("utc"),
        TimeMode::Local => format!("local_{}", abbreviation_at(tz, instant)),
    }
}

/// [`zone_suffix_at`] anchored at the current instant.
pub fn zone_suffix(mode: TimeMode, tz: Tz) -> String {
    zone_suffix_at(mode, tz, Utc::now())
}
