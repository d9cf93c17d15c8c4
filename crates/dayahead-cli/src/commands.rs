//! Orchestration of one retrieval run.
//!
//! Countries are processed sequentially in request order. A country
//! whose retries exhaust is skipped with an error log; authentication
//! failures and rejected domain codes abort the whole run, since every
//! remaining request would fail the same way.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use dayahead_core::{
    combine, zone_suffix_at, CountryCode, CountryConfig, CountryRegistry, CountryResult,
    EntsoeSource, MetricsAggregator, OutputWriter, RequestGate, RetrievalScheduler,
    RetrievalWindow, RetryPolicy, SourceErrorKind, TimeMode,
};

use crate::cli::Cli;
use crate::error::CliError;

pub struct RunSummary {
    pub files: Vec<PathBuf>,
    pub failed_countries: Vec<CountryCode>,
}

pub fn run(cli: &Cli) -> Result<RunSummary, CliError> {
    let registry = match &cli.config {
        Some(path) => CountryRegistry::load_path(path)?,
        None => CountryRegistry::builtin()?,
    };

    let mut codes = Vec::with_capacity(cli.countries.len());
    for raw in &cli.countries {
        codes.push(CountryCode::parse(raw)?);
    }
    let configs = registry.resolve(&codes)?;

    let api_key = cli.resolved_api_key()?;
    let mode = cli.time_mode();
    let window = cli.window(Utc::now())?;
    let writer = OutputWriter::new(&cli.output_dir)?;

    let scheduler = RetrievalScheduler::new(
        Arc::new(EntsoeSource::new(api_key)),
        RequestGate::entsoe_default(),
    )
    .with_retry_policy(RetryPolicy::exponential(cli.max_retries))
    .with_chunk_days(cli.chunk_days);

    info!(
        countries = configs.len(),
        start = %window.start_utc,
        end = %window.end_utc,
        mode = mode.as_str(),
        "starting retrieval run"
    );

    let mut results = Vec::new();
    let mut failed_countries = Vec::new();
    for config in &configs {
        match process_country(&scheduler, config, mode, window) {
            Ok(result) => results.push(result),
            Err(CountryFailure::Fatal(err)) => return Err(err),
            Err(CountryFailure::Skipped(message)) => {
                error!(country = config.code.as_str(), "{message}");
                failed_countries.push(config.code.clone());
            }
        }
    }

    if results.is_empty() {
        return Err(CliError::Fetch(String::from(
            "no data retrieved for any requested country",
        )));
    }

    // One anchor instant per run keeps every filename's zone suffix
    // consistent.
    let anchor = window.start_utc;

    let mut files = Vec::new();
    for result in &results {
        let label = zone_suffix_at(mode, result.timezone, anchor);
        let stem = result.country.file_stem();
        files.push(writer.write_raw(&stem, &label, &result.rows)?);
        files.push(writer.write_metrics(&stem, &label, &result.metrics)?);
    }

    if cli.combined && results.len() > 1 {
        let combined = combine(&results, mode, anchor);
        files.push(writer.write_raw("combined", &combined.timezone_label, &combined.rows)?);
        files.push(writer.write_metrics(
            "combined",
            &combined.timezone_label,
            &combined.metrics,
        )?);
    }

    Ok(RunSummary {
        files,
        failed_countries,
    })
}

enum CountryFailure {
    /// Aborts the run.
    Fatal(CliError),
    /// Fails this country only.
    Skipped(String),
}

fn process_country(
    scheduler: &RetrievalScheduler,
    config: &CountryConfig,
    mode: TimeMode,
    window: RetrievalWindow,
) -> Result<CountryResult, CountryFailure> {
    let series = scheduler.fetch_series(config, window).map_err(|err| {
        match err.kind() {
            SourceErrorKind::Auth | SourceErrorKind::InvalidDomain => {
                CountryFailure::Fatal(CliError::Fetch(err.to_string()))
            }
            _ => CountryFailure::Skipped(err.to_string()),
        }
    })?;

    if !series.is_complete() {
        warn!(
            country = config.code.as_str(),
            gaps = series.gaps.len(),
            missing_hours = series.missing_hours(),
            "series has gaps; daily metrics will flag affected days as partial"
        );
    }

    let rows = dayahead_core::normalize(&series.points, mode, config.timezone);
    let metrics = MetricsAggregator::for_country(config, mode).daily_metrics(&rows);

    info!(
        country = config.code.as_str(),
        hours = rows.len(),
        days = metrics.len(),
        "country processed"
    );

    Ok(CountryResult {
        country: config.code.clone(),
        timezone: config.timezone,
        rows,
        metrics,
    })
}
