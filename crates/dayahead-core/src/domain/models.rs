use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{CountryCode, ValidationError};

/// One hourly day-ahead price observation, timestamped in UTC.
///
/// Negative and zero prices are valid domain values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp_utc: DateTime<Utc>,
    pub country: CountryCode,
    pub price_eur_per_mwh: f64,
}

impl PricePoint {
    pub fn new(
        timestamp_utc: DateTime<Utc>,
        country: CountryCode,
        price_eur_per_mwh: f64,
    ) -> Result<Self, ValidationError> {
        if !price_eur_per_mwh.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "price_eur_per_mwh",
            });
        }
        validate_hour_aligned(timestamp_utc).map_err(|value| {
            ValidationError::UnalignedTimestamp { value }
        })?;

        Ok(Self {
            timestamp_utc,
            country,
            price_eur_per_mwh,
        })
    }
}

/// Half-open UTC time window `[start_utc, end_utc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalWindow {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

impl RetrievalWindow {
    pub fn new(start_utc: DateTime<Utc>, end_utc: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start_utc >= end_utc {
            return Err(ValidationError::EmptyWindow {
                start: start_utc.to_rfc3339(),
                end: end_utc.to_rfc3339(),
            });
        }
        for bound in [start_utc, end_utc] {
            validate_hour_aligned(bound)
                .map_err(|value| ValidationError::UnalignedWindow { value })?;
        }

        Ok(Self { start_utc, end_utc })
    }

    /// Number of whole hours covered by the window.
    pub fn hours(&self) -> u64 {
        (self.end_utc - self.start_utc).num_hours() as u64
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_utc && instant < self.end_utc
    }

    pub fn duration(&self) -> Duration {
        self.end_utc - self.start_utc
    }
}

/// A run of expected hourly observations the source did not return.
///
/// Half-open like the window it was detected in. Gaps are non-fatal:
/// they are recorded and propagated into partial-day flags downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

impl Gap {
    pub fn missing_hours(&self) -> u64 {
        (self.end_utc - self.start_utc).num_hours() as u64
    }
}

/// A [`PricePoint`] re-expressed in a target zone.
///
/// The source point is never mutated; localization only relabels it.
/// Across a daylight-saving transition the `zone_abbreviation` differs
/// between rows of the same local day (for example CET vs CEST), and the
/// repeated fall-back hour appears twice distinguished by offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedPricePoint {
    pub point: PricePoint,
    pub local_timestamp: DateTime<FixedOffset>,
    pub zone_abbreviation: String,
}

/// Daily price statistics for one country in the reporting timezone.
///
/// `weighted_avg_kwh_all_in` is present only when the country's full tax
/// group (energy tax, renewable energy tax, VAT rate) is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub country: CountryCode,
    pub min_price_mwh: f64,
    pub max_price_mwh: f64,
    pub weighted_avg_mwh: f64,
    pub weighted_avg_kwh: f64,
    pub weighted_avg_kwh_all_in: Option<f64>,
    /// Hourly observations seen for this local day.
    pub observed_hours: u32,
    /// Real wall-clock length of this local day (23, 24 or 25).
    pub expected_hours: u32,
    /// True when fewer hours were observed than the day contains.
    pub partial: bool,
}

fn validate_hour_aligned(instant: DateTime<Utc>) -> Result<(), String> {
    if instant.minute() != 0 || instant.second() != 0 || instant.nanosecond() != 0 {
        return Err(instant.to_rfc3339());
    }
    Ok(())
}
