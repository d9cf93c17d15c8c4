//! Daily price metrics over an hourly series.
//!
//! Rows are grouped by the calendar date implied by their (local or UTC)
//! timestamp. The weighted average is duration-weighted: source data is
//! hourly, so every observed slot carries equal unit duration and the
//! weighted mean equals the arithmetic mean over the day's observed rows.
//! A DST transition changes the labeling of slots, never their duration,
//! which is why 23- and 25-hour days need no special-casing. Days with
//! fewer observed hours than the local day contains are flagged partial.

use std::collections::BTreeMap;

use chrono::{Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::registry::TaxGroup;
use crate::timezone::TimeMode;
use crate::{CountryCode, CountryConfig, DailyMetric, LocalizedPricePoint};

/// Reduces one country's localized series to one [`DailyMetric`] per day.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    mode: TimeMode,
    timezone: Tz,
    taxes: Option<TaxGroup>,
}

impl MetricsAggregator {
    pub fn new(mode: TimeMode, timezone: Tz, taxes: Option<TaxGroup>) -> Self {
        Self {
            mode,
            timezone,
            taxes,
        }
    }

    pub fn for_country(config: &CountryConfig, mode: TimeMode) -> Self {
        Self::new(mode, config.timezone, config.taxes)
    }

    /// One metric per calendar day, in chronological order.
    ///
    /// The tax-inclusive column is populated only when the country's full
    /// tax group is configured; its absence is per-country, never a
    /// failure.
    pub fn daily_metrics(&self, rows: &[LocalizedPricePoint]) -> Vec<DailyMetric> {
        let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

        for row in rows {
            let date = row.local_timestamp.date_naive();
            days.entry(date)
                .or_insert_with(|| DayAccumulator::new(row.point.country.clone()))
                .observe(row.point.price_eur_per_mwh);
        }

        days.into_iter()
            .map(|(date, acc)| {
                let expected_hours = self.expected_hours(date);
                acc.into_metric(date, expected_hours, self.taxes.as_ref())
            })
            .collect()
    }

    /// Real wall-clock length of a reporting-zone calendar day.
    fn expected_hours(&self, date: NaiveDate) -> u32 {
        match self.mode {
            TimeMode::Utc => 24,
            TimeMode::Local => local_day_hours(self.timezone, date),
        }
    }
}

struct DayAccumulator {
    country: CountryCode,
    min: f64,
    max: f64,
    sum: f64,
    observed_hours: u32,
}

impl DayAccumulator {
    fn new(country: CountryCode) -> Self {
        Self {
            country,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            observed_hours: 0,
        }
    }

    fn observe(&mut self, price: f64) {
        self.min = self.min.min(price);
        self.max = self.max.max(price);
        self.sum += price;
        self.observed_hours += 1;
    }

    fn into_metric(
        self,
        date: NaiveDate,
        expected_hours: u32,
        taxes: Option<&TaxGroup>,
    ) -> DailyMetric {
        // Equal unit duration per observed hourly slot; the weights sum
        // to the observed count, so the weighted mean is sum / count.
        let weighted_avg_mwh = self.sum / f64::from(self.observed_hours);
        let weighted_avg_kwh = weighted_avg_mwh / 1000.0;

        DailyMetric {
            date,
            country: self.country,
            min_price_mwh: self.min,
            max_price_mwh: self.max,
            weighted_avg_mwh,
            weighted_avg_kwh,
            weighted_avg_kwh_all_in: taxes.map(|group| group.all_in_kwh(weighted_avg_kwh)),
            observed_hours: self.observed_hours,
            expected_hours,
            partial: self.observed_hours < expected_hours,
        }
    }
}

/// Hours in the local calendar day: 23 on spring-forward, 25 on
/// fall-back, 24 otherwise.
fn local_day_hours(tz: Tz, date: NaiveDate) -> u32 {
    let start = first_instant_of_day(tz, date);
    let next = date
        .checked_add_days(Days::new(1))
        .map(|d| first_instant_of_day(tz, d));

    match (start, next) {
        (Some(start), Some(Some(end))) => (end - start).num_hours().max(0) as u32,
        _ => 24,
    }
}

/// First valid instant of the local day, skipping a midnight erased by a
/// DST jump (some zones spring forward at 00:00).
fn first_instant_of_day(tz: Tz, date: NaiveDate) -> Option<chrono::DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    for offset in 0..3 {
        let candidate = midnight + Duration::hours(offset);
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(first, _) => return Some(first.with_timezone(&Utc)),
            LocalResult::None => continue,
        }
    }
    None
}
