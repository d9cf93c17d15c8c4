//! Price source trait and error classification.
//!
//! The upstream market-data API is treated as a black box behind
//! [`PriceSource`]: given an area domain code and a UTC window it returns
//! hour-aligned, chronologically ordered price points, or a classified
//! error. The `retryable` flag on [`SourceError`] is what separates
//! transient conditions (rate limits, network trouble) from fatal ones
//! (bad credentials, invalid domain) in the retrieval scheduler.

use std::fmt::{Display, Formatter};

use crate::{CountryCode, PricePoint, RetrievalWindow};

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Bad or missing credentials. Fatal, never retried.
    Auth,
    /// Unknown area domain code. Fatal, never retried.
    InvalidDomain,
    /// Upstream rate limit hit. Transient.
    RateLimited,
    /// Transport failure or upstream outage. Transient.
    Network,
    /// Upstream payload could not be decoded. Fatal.
    Malformed,
}

/// Structured source error carrying the transient-vs-fatal decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Auth,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_domain(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidDomain,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Network,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Auth => "source.auth",
            SourceErrorKind::InvalidDomain => "source.invalid_domain",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Network => "source.network",
            SourceErrorKind::Malformed => "source.malformed",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// One source fetch: a country's domain code over a UTC window.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub country: CountryCode,
    pub domain_code: String,
    pub window: RetrievalWindow,
}

impl FetchRequest {
    pub fn new(
        country: CountryCode,
        domain_code: impl Into<String>,
        window: RetrievalWindow,
    ) -> Result<Self, SourceError> {
        let domain_code = domain_code.into();
        if domain_code.trim().is_empty() {
            return Err(SourceError::invalid_domain(
                "fetch request requires a non-empty domain code",
            ));
        }
        Ok(Self {
            country,
            domain_code,
            window,
        })
    }
}

/// Source adapter contract.
///
/// Implementations must return points that are hour-aligned, unique and
/// strictly increasing, all stamped with the request's country. A window
/// the upstream has no data for yields an empty vector, not an error.
///
/// Implementations must be `Send + Sync`; country runs may execute on
/// independent workers sharing one adapter behind the request gate.
pub trait PriceSource: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<PricePoint>, SourceError>;
}
