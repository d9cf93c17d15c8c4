//! Domain models for the day-ahead price pipeline.

mod country;
mod models;

pub use country::CountryCode;
pub use models::{DailyMetric, Gap, LocalizedPricePoint, PricePoint, RetrievalWindow};
