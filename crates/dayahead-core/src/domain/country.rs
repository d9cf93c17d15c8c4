use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Normalized two-letter country code (ISO 3166-1 alpha-2, uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse and normalize a country code to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCountryCode);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let valid = normalized.len() == 2 && normalized.bytes().all(|b| b.is_ascii_uppercase());
        if !valid {
            return Err(ValidationError::InvalidCountryCode {
                value: trimmed.to_owned(),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used in output filenames.
    pub fn file_stem(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl Display for CountryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_code() {
        let parsed = CountryCode::parse(" nl ").expect("code should parse");
        assert_eq!(parsed.as_str(), "NL");
        assert_eq!(parsed.file_stem(), "nl");
    }

    #[test]
    fn rejects_non_alpha2_codes() {
        assert!(matches!(
            CountryCode::parse("NLD"),
            Err(ValidationError::InvalidCountryCode { .. })
        ));
        assert!(matches!(
            CountryCode::parse("N1"),
            Err(ValidationError::InvalidCountryCode { .. })
        ));
        assert!(matches!(
            CountryCode::parse("  "),
            Err(ValidationError::EmptyCountryCode)
        ));
    }
}
