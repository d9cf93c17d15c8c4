//! Static per-country configuration.
//!
//! The registry is loaded once at process start from a declarative TOML
//! source and is immutable thereafter. Schema violations are fatal at
//! load time, before any network call. A missing tax group is not a
//! violation: it means the tax-inclusive metric is not computable for
//! that country and the column is omitted downstream.

use std::collections::BTreeMap;
use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{ConfigError, CountryCode};

/// Built-in registry covering the ENTSO-E bidding-zone countries.
const BUILTIN_REGISTRY: &str = include_str!("../../../config/countries.toml");

/// Fixed per-unit taxes and VAT applied to the kWh average price.
///
/// The group is all-or-nothing: either every field is configured or the
/// all-in metric is suppressed for the country.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaxGroup {
    /// Energy tax in EUR per kWh.
    pub energy_tax: f64,
    /// Renewable energy surcharge in EUR per kWh.
    pub renewable_energy_tax: f64,
    /// Value-added tax rate as a fraction (0.21 for 21%).
    pub vat_rate: f64,
}

impl TaxGroup {
    /// Tax-inclusive price for a kWh average:
    /// `(avg_kwh + energy_tax + renewable_energy_tax) * (1 + vat_rate)`.
    pub fn all_in_kwh(&self, weighted_avg_kwh: f64) -> f64 {
        (weighted_avg_kwh + self.energy_tax + self.renewable_energy_tax) * (1.0 + self.vat_rate)
    }
}

/// Validated static configuration for one country.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryConfig {
    pub code: CountryCode,
    /// ENTSO-E EIC area code, e.g. `10YNL----------L`.
    pub domain_code: String,
    pub timezone: Tz,
    pub taxes: Option<TaxGroup>,
    pub currency: String,
}

/// Immutable mapping from country code to [`CountryConfig`].
#[derive(Debug, Clone)]
pub struct CountryRegistry {
    countries: BTreeMap<CountryCode, CountryConfig>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    countries: BTreeMap<String, CountryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CountryEntry {
    domain_code: String,
    timezone: String,
    taxes: Option<TaxGroup>,
    currency: Option<String>,
}

impl CountryRegistry {
    /// Registry bundled with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_REGISTRY)
    }

    pub fn load_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(raw)?;

        let mut countries = BTreeMap::new();
        for (raw_code, entry) in file.countries {
            let code = CountryCode::parse(&raw_code)?;
            let config = validate_entry(&code, entry)?;
            countries.insert(code, config);
        }

        Ok(Self { countries })
    }

    pub fn get(&self, code: &CountryCode) -> Option<&CountryConfig> {
        self.countries.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &CountryCode> {
        self.countries.keys()
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Resolve requested codes in request order.
    ///
    /// Unknown codes are fatal: retrieval must not silently run on a
    /// subset of what was asked for.
    pub fn resolve(&self, codes: &[CountryCode]) -> Result<Vec<CountryConfig>, ConfigError> {
        if codes.is_empty() {
            return Err(ConfigError::NoCountries);
        }

        codes
            .iter()
            .map(|code| {
                self.get(code).cloned().ok_or_else(|| ConfigError::UnknownCountry {
                    code: code.to_string(),
                    known: self
                        .codes()
                        .map(CountryCode::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                })
            })
            .collect()
    }
}

fn validate_entry(code: &CountryCode, entry: CountryEntry) -> Result<CountryConfig, ConfigError> {
    if entry.domain_code.trim().is_empty() {
        return Err(ConfigError::EmptyDomainCode {
            code: code.to_string(),
        });
    }

    let timezone: Tz = entry.timezone.parse().map_err(|_| ConfigError::UnknownTimezone {
        code: code.to_string(),
        timezone: entry.timezone.clone(),
    })?;

    if let Some(taxes) = &entry.taxes {
        for (field, value) in [
            ("energy_tax", taxes.energy_tax),
            ("renewable_energy_tax", taxes.renewable_energy_tax),
            ("vat_rate", taxes.vat_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTaxField {
                    code: code.to_string(),
                    field,
                });
            }
        }
    }

    Ok(CountryConfig {
        code: code.clone(),
        domain_code: entry.domain_code,
        timezone,
        taxes: entry.taxes,
        currency: entry.currency.unwrap_or_else(|| String::from("EUR")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(value: &str) -> CountryCode {
        CountryCode::parse(value).expect("valid code")
    }

    #[test]
    fn builtin_registry_loads_and_knows_nl() {
        let registry = CountryRegistry::builtin().expect("builtin registry must parse");
        assert!(registry.len() >= 30);

        let nl = registry.get(&code("NL")).expect("NL present");
        assert_eq!(nl.domain_code, "10YNL----------L");
        assert_eq!(nl.timezone, chrono_tz::Europe::Amsterdam);
        assert_eq!(nl.currency, "EUR");

        let taxes = nl.taxes.expect("NL carries the full tax group");
        assert_eq!(taxes.vat_rate, 0.21);
    }

    #[test]
    fn builtin_registry_leaves_tax_group_absent_elsewhere() {
        let registry = CountryRegistry::builtin().expect("builtin registry must parse");
        let de = registry.get(&code("DE")).expect("DE present");
        assert!(de.taxes.is_none());
    }

    #[test]
    fn resolve_preserves_request_order() {
        let registry = CountryRegistry::builtin().expect("builtin registry must parse");
        let resolved = registry
            .resolve(&[code("FR"), code("NL"), code("DE")])
            .expect("all known");
        let order: Vec<&str> = resolved.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(order, vec!["FR", "NL", "DE"]);
    }

    #[test]
    fn resolve_fails_on_unknown_code() {
        let registry = CountryRegistry::builtin().expect("builtin registry must parse");
        let err = registry
            .resolve(&[code("NL"), code("XX")])
            .expect_err("XX is unknown");
        assert!(matches!(err, ConfigError::UnknownCountry { .. }));
    }

    #[test]
    fn missing_domain_code_is_fatal() {
        let raw = r#"
            [countries.NL]
            timezone = "Europe/Amsterdam"
        "#;
        let err = CountryRegistry::from_toml_str(raw).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_timezone_is_fatal() {
        let raw = r#"
            [countries.NL]
            domain_code = "10YNL----------L"
            timezone = "Europe/Nowhere"
        "#;
        let err = CountryRegistry::from_toml_str(raw).expect_err("must fail");
        assert!(matches!(err, ConfigError::UnknownTimezone { .. }));
    }

    #[test]
    fn partial_tax_group_is_rejected_at_load_time() {
        // vat_rate missing: the group is all-or-nothing, enforced here so
        // downstream aggregation never checks partial combinations.
        let raw = r#"
            [countries.NL]
            domain_code = "10YNL----------L"
            timezone = "Europe/Amsterdam"

            [countries.NL.taxes]
            energy_tax = 0.12
            renewable_energy_tax = 0.001
        "#;
        let err = CountryRegistry::from_toml_str(raw).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn all_in_price_matches_reference_vector() {
        let taxes = TaxGroup {
            energy_tax: 0.12,
            renewable_energy_tax: 0.001,
            vat_rate: 0.21,
        };
        let all_in = taxes.all_in_kwh(0.10);
        assert!((all_in - 0.26741).abs() < 1e-9);
    }
}
