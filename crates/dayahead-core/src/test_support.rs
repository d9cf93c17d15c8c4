//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::source::{FetchRequest, PriceSource, SourceError};
use crate::{CountryCode, CountryConfig, PricePoint, RetrievalWindow};

pub(crate) fn base_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

pub(crate) fn test_window(start_hour: i64, end_hour: i64) -> RetrievalWindow {
    RetrievalWindow::new(
        base_instant() + Duration::hours(start_hour),
        base_instant() + Duration::hours(end_hour),
    )
    .expect("test window must be valid")
}

pub(crate) fn test_point(country: &CountryCode, hour: i64, price: f64) -> PricePoint {
    PricePoint::new(
        base_instant() + Duration::hours(hour),
        country.clone(),
        price,
    )
    .expect("test point must be valid")
}

pub(crate) fn test_config(code: &str) -> CountryConfig {
    CountryConfig {
        code: CountryCode::parse(code).expect("valid code"),
        domain_code: String::from("10YNL----------L"),
        timezone: chrono_tz::Europe::Amsterdam,
        taxes: None,
        currency: String::from("EUR"),
    }
}

enum FakeMode {
    Clean,
    /// Rate-limited for the first N calls, then clean.
    Flaky(u32),
    AlwaysRateLimited,
    AuthFailure,
    /// Clean except the given hour offsets from the window start.
    MissingHours(Vec<u64>),
}

/// Deterministic in-memory price source for scheduler tests.
pub(crate) struct FakeSource {
    pub(crate) calls: AtomicU32,
    mode: FakeMode,
}

impl FakeSource {
    pub(crate) fn clean() -> Self {
        Self {
            calls: AtomicU32::new(0),
            mode: FakeMode::Clean,
        }
    }

    pub(crate) fn flaky(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            mode: FakeMode::Flaky(failures),
        }
    }

    pub(crate) fn always_rate_limited() -> Self {
        Self {
            calls: AtomicU32::new(0),
            mode: FakeMode::AlwaysRateLimited,
        }
    }

    pub(crate) fn auth_failure() -> Self {
        Self {
            calls: AtomicU32::new(0),
            mode: FakeMode::AuthFailure,
        }
    }

    pub(crate) fn with_missing_hours(hours: Vec<u64>) -> Self {
        Self {
            calls: AtomicU32::new(0),
            mode: FakeMode::MissingHours(hours),
        }
    }

    fn hourly_points(request: &FetchRequest, skip: &[u64]) -> Vec<PricePoint> {
        let mut points = Vec::new();
        for offset in 0..request.window.hours() {
            if skip.contains(&offset) {
                continue;
            }
            let ts = request.window.start_utc + Duration::hours(offset as i64);
            points.push(
                PricePoint::new(ts, request.country.clone(), 10.0 + offset as f64)
                    .expect("fake point must be valid"),
            );
        }
        points
    }
}

impl PriceSource for FakeSource {
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<PricePoint>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            FakeMode::Clean => Ok(Self::hourly_points(request, &[])),
            FakeMode::Flaky(failures) => {
                if call < *failures {
                    Err(SourceError::rate_limited("synthetic rate limit"))
                } else {
                    Ok(Self::hourly_points(request, &[]))
                }
            }
            FakeMode::AlwaysRateLimited => {
                Err(SourceError::rate_limited("synthetic rate limit"))
            }
            FakeMode::AuthFailure => Err(SourceError::auth("synthetic bad token")),
            FakeMode::MissingHours(hours) => Ok(Self::hourly_points(request, hours)),
        }
    }
}
