//! Core pipeline for retrieving ENTSO-E day-ahead electricity prices.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The country registry (bidding-zone codes, timezones, taxes)
//! - The price source trait and the ENTSO-E adapter
//! - Chunked retrieval with retry, throttling and gap detection
//! - Timezone normalization, daily metrics and CSV output

pub mod adapters;
pub mod combine;
pub mod domain;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod output;
pub mod registry;
pub mod schedule;
pub mod source;
pub mod timezone;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::EntsoeSource;
pub use combine::{combine, combined_label, CombinedDataset, CountryResult};
pub use domain::{CountryCode, DailyMetric, Gap, LocalizedPricePoint, PricePoint, RetrievalWindow};
pub use error::{ConfigError, OutputError, ValidationError};
pub use gate::RequestGate;
pub use metrics::MetricsAggregator;
pub use output::OutputWriter;
pub use registry::{CountryConfig, CountryRegistry, TaxGroup};
pub use schedule::{chunk_windows, Backoff, RetrievalScheduler, RetrievedSeries, RetryPolicy};
pub use source::{FetchRequest, PriceSource, SourceError, SourceErrorKind};
pub use timezone::{
    abbreviation_at, normalize, zone_suffix, zone_suffix_at, TimeMode, MIXED_ZONE_LABEL,
};
