//! CLI argument definitions for dayahead.
//!
//! One retrieval run per invocation: pick countries, a timezone mode
//! and a date range, and the tool writes raw-price and daily-metric
//! CSV files into the output directory.
//!
//! # Examples
//!
//! ```bash
//! # Last year of Dutch prices in local time
//! dayahead --countries NL --local-time --years 1
//!
//! # A fixed range for three countries, plus combined files, in UTC
//! dayahead --countries NL,DE,FR --utc \
//!     --start-date 2023-01-01 --end-date 2023-12-31 --combined
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use clap::{ArgGroup, Parser};
use dayahead_core::{RetrievalWindow, TimeMode};

use crate::error::CliError;

/// Day-ahead electricity price retrieval from the ENTSO-E transparency
/// platform.
#[derive(Debug, Parser)]
#[command(
    name = "dayahead",
    version,
    about = "Retrieve ENTSO-E day-ahead electricity prices as CSV",
    group(ArgGroup::new("time_mode").required(true).args(["local_time", "utc"])),
    group(ArgGroup::new("date_range").required(true).args(["years", "start_date"]))
)]
pub struct Cli {
    /// Comma-separated ISO 3166-1 alpha-2 country codes, e.g. NL,DE,FR.
    #[arg(long, value_delimiter = ',', required = true)]
    pub countries: Vec<String>,

    /// Report timestamps in each country's local timezone.
    #[arg(long)]
    pub local_time: bool,

    /// Report timestamps in UTC.
    #[arg(long)]
    pub utc: bool,

    /// Retrieve the last N years (365-day blocks ending now).
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    pub years: Option<u32>,

    /// First day of the range (YYYY-MM-DD, inclusive).
    #[arg(long, requires = "end_date")]
    pub start_date: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD, inclusive).
    #[arg(long, requires = "start_date")]
    pub end_date: Option<NaiveDate>,

    /// Also write combined files concatenating all requested countries.
    #[arg(long)]
    pub combined: bool,

    /// ENTSO-E security token; falls back to the ENTSOE_API_KEY
    /// environment variable.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Country registry TOML file; the built-in registry is used when
    /// omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory the CSV files are written into.
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Maximum days covered by a single upstream request.
    #[arg(long, default_value_t = 90)]
    pub chunk_days: u32,

    /// Retry attempts per chunk after the first try.
    #[arg(long, default_value_t = 4)]
    pub max_retries: u32,
}

impl Cli {
    pub fn time_mode(&self) -> TimeMode {
        if self.utc {
            TimeMode::Utc
        } else {
            TimeMode::Local
        }
    }

    /// Resolves the requested date range into a UTC retrieval window.
    pub fn window(&self, now: DateTime<Utc>) -> Result<RetrievalWindow, CliError> {
        if let Some(years) = self.years {
            if years == 0 {
                return Err(CliError::Usage(String::from(
                    "--years must be greater than zero",
                )));
            }
            let end = truncate_to_hour(now);
            let start = end - Duration::days(i64::from(years) * 365);
            return Ok(RetrievalWindow::new(start, end)?);
        }

        match (self.start_date, self.end_date) {
            (Some(first), Some(last)) => {
                if last < first {
                    return Err(CliError::Usage(String::from(
                        "--end-date must not precede --start-date",
                    )));
                }
                let start = first.and_time(NaiveTime::MIN).and_utc();
                let end = last
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| CliError::Usage(String::from("--end-date out of range")))?
                    .and_time(NaiveTime::MIN)
                    .and_utc();
                Ok(RetrievalWindow::new(start, end)?)
            }
            _ => Err(CliError::Usage(String::from(
                "either --years or --start-date/--end-date is required",
            ))),
        }
    }

    /// Explicit flag wins over the environment.
    pub fn resolved_api_key(&self) -> Result<String, CliError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ENTSOE_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CliError::Usage(String::from(
                    "an API key is required: pass --api-key or set ENTSOE_API_KEY",
                ))
            })
    }
}

fn truncate_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
