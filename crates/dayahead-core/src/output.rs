//! CSV output files.
//!
//! Every dataset yields two files in the output directory:
//!
//! * `{stem}_raw_prices_{label}.csv`: one row per hourly price
//! * `{stem}_price_metrics_{label}.csv`: one row per calendar day
//!
//! where `stem` is the lowercase country code (or `combined`) and
//! `label` is the timezone suffix (`utc`, `local_CEST`, `local_mixed`).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use crate::error::OutputError;
use crate::{DailyMetric, LocalizedPricePoint};

const RAW_HEADER: [&str; 4] = ["datetime", "country", "price_eur_per_mwh", "timezone"];
const METRICS_HEADER: [&str; 9] = [
    "date",
    "country",
    "min_price_mwh",
    "max_price_mwh",
    "weighted_avg_mwh",
    "weighted_avg_kwh",
    "weighted_avg_kwh_all_in",
    "partial",
    "timezone",
];

/// Writes raw-price and daily-metric CSV files into one directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
}

impl OutputWriter {
    /// Creates the output directory if it does not yet exist.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(OutputError::CreateDir)?;
        Ok(Self { output_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn raw_path(&self, stem: &str, label: &str) -> PathBuf {
        self.output_dir
            .join(format!("{stem}_raw_prices_{label}.csv"))
    }

    pub fn metrics_path(&self, stem: &str, label: &str) -> PathBuf {
        self.output_dir
            .join(format!("{stem}_price_metrics_{label}.csv"))
    }

    /// One row per hourly price, in series order.
    pub fn write_raw(
        &self,
        stem: &str,
        label: &str,
        rows: &[LocalizedPricePoint],
    ) -> Result<PathBuf, OutputError> {
        let path = self.raw_path(stem, label);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(RAW_HEADER)?;
        for row in rows {
            writer.write_record([
                row.local_timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                row.point.country.as_str().to_owned(),
                format_price(row.point.price_eur_per_mwh),
                row.zone_abbreviation.clone(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// One row per calendar day; the all-in column stays empty for
    /// countries without a configured tax group.
    pub fn write_metrics(
        &self,
        stem: &str,
        label: &str,
        metrics: &[DailyMetric],
    ) -> Result<PathBuf, OutputError> {
        let path = self.metrics_path(stem, label);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(METRICS_HEADER)?;
        for day in metrics {
            writer.write_record([
                day.date.to_string(),
                day.country.as_str().to_owned(),
                format_price(day.min_price_mwh),
                format_price(day.max_price_mwh),
                format_price(day.weighted_avg_mwh),
                format_price(day.weighted_avg_kwh),
                day.weighted_avg_kwh_all_in
                    .map(format_price)
                    .unwrap_or_default(),
                day.partial.to_string(),
                label.to_owned(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

// Five decimals keeps sub-cent kWh figures exact enough while staying
// stable across platforms.
fn format_price(value: f64) -> String {
    format!("{value:.5}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_point;
    use crate::timezone::{normalize, TimeMode};
    use crate::CountryCode;
    use chrono::NaiveDate;

    fn sample_rows() -> Vec<LocalizedPricePoint> {
        let country = CountryCode::parse("NL").expect("valid code");
        let points = vec![
            test_point(&country, 0, 42.5),
            test_point(&country, 1, -3.25),
        ];
        normalize(&points, TimeMode::Utc, chrono_tz::Europe::Amsterdam)
    }

    fn sample_metric(all_in: Option<f64>) -> DailyMetric {
        DailyMetric {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            country: CountryCode::parse("NL").expect("valid code"),
            min_price_mwh: -3.25,
            max_price_mwh: 42.5,
            weighted_avg_mwh: 19.6,
            weighted_avg_kwh: 0.0196,
            weighted_avg_kwh_all_in: all_in,
            observed_hours: 2,
            expected_hours: 24,
            partial: true,
        }
    }

    #[test]
    fn raw_file_has_expected_name_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let path = writer.write_raw("nl", "utc", &sample_rows()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "nl_raw_prices_utc.csv"
        );
        let body = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(lines[0], "datetime,country,price_eur_per_mwh,timezone");
        assert_eq!(lines[1], "2024-03-01T00:00:00Z,NL,42.50000,UTC");
        assert_eq!(lines[2], "2024-03-01T01:00:00Z,NL,-3.25000,UTC");
    }

    #[test]
    fn metrics_file_leaves_all_in_empty_without_taxes() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let path = writer
            .write_metrics("nl", "utc", &[sample_metric(None)])
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "nl_price_metrics_utc.csv"
        );
        let body = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = body.lines().collect();
        assert_eq!(
            lines[1],
            "2024-03-01,NL,-3.25000,42.50000,19.60000,0.01960,,true,utc"
        );
    }

    #[test]
    fn metrics_file_writes_all_in_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();
        let path = writer
            .write_metrics("combined", "local_mixed", &[sample_metric(Some(0.26741))])
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "combined_price_metrics_local_mixed.csv"
        );
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.lines().nth(1).unwrap().contains(",0.26741,"));
    }

    #[test]
    fn nested_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("prices");
        let writer = OutputWriter::new(&nested).unwrap();
        assert!(writer.dir().is_dir());
    }
}
