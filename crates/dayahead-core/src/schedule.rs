//! Chunked, retry-safe retrieval of long price windows.
//!
//! A multi-year request is partitioned into source-safe chunks whose
//! concatenation reconstructs the original window exactly: the boundary
//! between chunk *i* and *i+1* is the same instant, with no overlap.
//! Each chunk is fetched through the shared
//! [`RequestGate`] with bounded exponential backoff on transient errors;
//! fatal errors abort the whole country run before further chunks start.
//! Hours the source legitimately lacks are recorded as [`Gap`]s and the
//! run continues.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gate::RequestGate;
use crate::source::{FetchRequest, PriceSource, SourceError};
use crate::{CountryCode, CountryConfig, Gap, PricePoint, RetrievalWindow};

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed { delay: Duration },
    /// Exponential delay: `base * (factor ^ attempt)`, capped at `max`,
    /// optionally with +/- 50% random jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay for a 0-based retry attempt.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                // Jitter: +/- 50% of the delay
                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2).max(1));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Bounded retry policy injected into the scheduler.
///
/// Total attempts per chunk = `max_retries + 1`. Which errors are
/// retried is decided by [`SourceError::retryable`], not here.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Complete chronological series for one country, with detected gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSeries {
    pub country: CountryCode,
    pub window: RetrievalWindow,
    pub points: Vec<PricePoint>,
    pub gaps: Vec<Gap>,
}

impl RetrievedSeries {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn missing_hours(&self) -> u64 {
        self.gaps.iter().map(Gap::missing_hours).sum()
    }
}

/// Partition `[start, end)` into consecutive sub-windows of at most
/// `max_days` days. The partition is exact: sub-windows are contiguous
/// and their union equals the input window.
pub fn chunk_windows(window: RetrievalWindow, max_days: u32) -> Vec<RetrievalWindow> {
    let span = ChronoDuration::days(i64::from(max_days.max(1)));
    let mut chunks = Vec::new();
    let mut cursor = window.start_utc;

    while cursor < window.end_utc {
        let end = (cursor + span).min(window.end_utc);
        chunks.push(RetrievalWindow {
            start_utc: cursor,
            end_utc: end,
        });
        cursor = end;
    }

    chunks
}

/// Reliable retrieval of one country's series over an arbitrary window.
pub struct RetrievalScheduler {
    source: Arc<dyn PriceSource>,
    gate: RequestGate,
    retry: RetryPolicy,
    chunk_days: u32,
}

impl RetrievalScheduler {
    /// Default chunk span. Well under the source's one-year request
    /// limit while keeping the request count low for multi-year pulls.
    pub const DEFAULT_CHUNK_DAYS: u32 = 90;

    pub fn new(source: Arc<dyn PriceSource>, gate: RequestGate) -> Self {
        Self {
            source,
            gate,
            retry: RetryPolicy::default(),
            chunk_days: Self::DEFAULT_CHUNK_DAYS,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chunk_days(mut self, chunk_days: u32) -> Self {
        self.chunk_days = chunk_days.max(1);
        self
    }

    /// Materialize the full series for one country.
    ///
    /// Transient chunk failures are retried with backoff; exhausting the
    /// retry budget, or any fatal error, aborts this country's run. Hours
    /// the source did not return are recorded as gaps, not errors.
    pub fn fetch_series(
        &self,
        config: &CountryConfig,
        window: RetrievalWindow,
    ) -> Result<RetrievedSeries, SourceError> {
        let chunks = chunk_windows(window, self.chunk_days);
        debug!(
            country = %config.code,
            chunks = chunks.len(),
            hours = window.hours(),
            "starting chunked retrieval"
        );

        let mut points: Vec<PricePoint> = Vec::with_capacity(window.hours() as usize);
        for chunk in chunks {
            let request = FetchRequest::new(config.code.clone(), &config.domain_code, chunk)?;
            let fetched = self.fetch_chunk(&request)?;

            for point in fetched {
                if !chunk.contains(point.timestamp_utc) {
                    continue;
                }
                // Chunk windows are half-open and contiguous, so a
                // well-behaved source never repeats the seam hour; guard
                // against it anyway to keep the series strictly increasing.
                if points
                    .last()
                    .is_some_and(|last| last.timestamp_utc >= point.timestamp_utc)
                {
                    continue;
                }
                points.push(point);
            }
        }

        let gaps = detect_gaps(window, &points);
        if !gaps.is_empty() {
            warn!(
                country = %config.code,
                gaps = gaps.len(),
                missing_hours = gaps.iter().map(Gap::missing_hours).sum::<u64>(),
                "source returned an incomplete series; continuing with gaps recorded"
            );
        }

        Ok(RetrievedSeries {
            country: config.code.clone(),
            window,
            points,
            gaps,
        })
    }

    fn fetch_chunk(&self, request: &FetchRequest) -> Result<Vec<PricePoint>, SourceError> {
        let mut attempt: u32 = 0;
        loop {
            self.gate.wait();
            match self.source.fetch(request) {
                Ok(points) => return Ok(points),
                Err(error) if error.retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        country = %request.country,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient source error; backing off before retry"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Compare the returned points against the expected hourly grid.
fn detect_gaps(window: RetrievalWindow, points: &[PricePoint]) -> Vec<Gap> {
    let hour = ChronoDuration::hours(1);
    let mut gaps = Vec::new();
    let mut cursor = window.start_utc;

    for point in points {
        if point.timestamp_utc > cursor {
            gaps.push(Gap {
                start_utc: cursor,
                end_utc: point.timestamp_utc,
            });
        }
        cursor = point.timestamp_utc + hour;
    }

    if cursor < window.end_utc {
        gaps.push(Gap {
            start_utc: cursor,
            end_utc: window.end_utc,
        });
    }

    gaps
}
