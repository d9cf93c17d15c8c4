use thiserror::Error;

/// Domain-model validation errors exposed by `dayahead-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("country code cannot be empty")]
    EmptyCountryCode,
    #[error("country code must be two ASCII letters: '{value}'")]
    InvalidCountryCode { value: String },

    #[error("retrieval window start {start} must precede end {end}")]
    EmptyWindow { start: String, end: String },
    #[error("retrieval window bound {value} must be hour-aligned")]
    UnalignedWindow { value: String },

    #[error("price timestamp {value} must be hour-aligned")]
    UnalignedTimestamp { value: String },
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}

/// Configuration errors raised while loading the country registry.
///
/// All of these are fatal and surface before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse country registry: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown country code '{code}'; known codes: {known}")]
    UnknownCountry { code: String, known: String },

    #[error("country '{code}' has an empty domain code")]
    EmptyDomainCode { code: String },

    #[error("country '{code}' has unknown timezone '{timezone}'")]
    UnknownTimezone { code: String, timezone: String },

    #[error("country '{code}' tax group field '{field}' must be a finite non-negative number")]
    InvalidTaxField { code: String, field: &'static str },

    #[error("no countries requested")]
    NoCountries,
}

/// Output serialization errors from the CSV writer.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
