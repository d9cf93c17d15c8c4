//! ENTSO-E transparency platform adapter.
//!
//! Fetches day-ahead prices (document type A44) from the REST API and
//! decodes the `Publication_MarketDocument` XML into [`PricePoint`]s.
//! The platform answers some well-formed requests with an HTTP 200
//! `Acknowledgement_MarketDocument` saying no data matched; that is an
//! empty result here, not an error.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::debug;

use crate::source::{FetchRequest, PriceSource, SourceError};
use crate::PricePoint;

const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";
const DOCUMENT_TYPE_DAY_AHEAD: &str = "A44";
const HOURLY_RESOLUTION: &str = "PT60M";
const NO_DATA_MARKER: &str = "No matching data";

/// Blocking client for the ENTSO-E day-ahead price endpoint.
pub struct EntsoeSource {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EntsoeSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Points the adapter at a different endpoint, e.g. a local stub.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn query_params(&self, request: &FetchRequest) -> [(&'static str, String); 6] {
        let fmt = "%Y%m%d%H%M";
        [
            ("documentType", DOCUMENT_TYPE_DAY_AHEAD.to_owned()),
            ("in_Domain", request.domain_code.clone()),
            ("out_Domain", request.domain_code.clone()),
            ("periodStart", request.window.start_utc.format(fmt).to_string()),
            ("periodEnd", request.window.end_utc.format(fmt).to_string()),
            ("securityToken", self.api_key.clone()),
        ]
    }
}

impl PriceSource for EntsoeSource {
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<PricePoint>, SourceError> {
        debug!(
            country = request.country.as_str(),
            domain = request.domain_code.as_str(),
            start = %request.window.start_utc,
            end = %request.window.end_utc,
            "requesting day-ahead prices"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(request))
            .send()
            .map_err(|e| SourceError::network(format!("entsoe request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SourceError::network(format!("entsoe response truncated: {e}")))?;

        classify_status(status, &body)?;

        if body.contains(NO_DATA_MARKER) {
            debug!(country = request.country.as_str(), "no matching data");
            return Ok(Vec::new());
        }

        parse_publication_document(&body, request)
    }
}

/// Maps upstream HTTP statuses onto retryable/fatal source errors.
fn classify_status(status: StatusCode, body: &str) -> Result<(), SourceError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::auth(format!(
            "entsoe rejected the security token (status {status})"
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(SourceError::rate_limited(
            "entsoe request quota exceeded (status 429)",
        )),
        StatusCode::BAD_REQUEST => {
            // A 400 acknowledgement for an out-of-range interval also
            // means "nothing there", unlike a genuinely bad domain.
            if body.contains(NO_DATA_MARKER) {
                Ok(())
            } else {
                Err(SourceError::invalid_domain(format!(
                    "entsoe rejected the request (status 400): {}",
                    first_reason_text(body).unwrap_or_else(|| "no reason given".to_owned())
                )))
            }
        }
        _ if status.is_server_error() => Err(SourceError::network(format!(
            "entsoe upstream error (status {status})"
        ))),
        _ => Err(SourceError::network(format!(
            "unexpected entsoe status {status}"
        ))),
    }
}

/// Pulls the first `<text>` element out of an acknowledgement body.
fn first_reason_text(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    let mut in_text = false;
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) if e.local_name().as_ref() == b"text" => in_text = true,
            Event::Text(t) if in_text => return t.unescape().ok().map(|s| s.into_owned()),
            Event::Eof => return None,
            _ => {}
        }
    }
}

struct PeriodState {
    start: Option<DateTime<Utc>>,
    resolution: String,
    position: Option<i64>,
    amount: Option<f64>,
}

impl PeriodState {
    fn new() -> Self {
        Self {
            start: None,
            resolution: String::new(),
            position: None,
            amount: None,
        }
    }
}

/// Decodes one `Publication_MarketDocument` into hourly points.
///
/// Positions are 1-based offsets from the period start. Periods with a
/// resolution other than PT60M are skipped; the day-ahead auction is
/// hourly for every supported bidding zone.
fn parse_publication_document(
    body: &str,
    request: &FetchRequest,
) -> Result<Vec<PricePoint>, SourceError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut points = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut period = PeriodState::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SourceError::malformed(format!("invalid entsoe xml: {e}")))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "Period" {
                    period = PeriodState::new();
                }
                path.push(name);
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "Point" {
                    finalize_point(&period, request, &mut points)?;
                    period.position = None;
                    period.amount = None;
                }
                path.pop();
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| SourceError::malformed(format!("invalid entsoe xml: {e}")))?;
                record_text(&mut period, &path, text.trim())?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // The API may return overlapping daily documents at chunk seams;
    // callers rely on chronological order for dedup.
    points.sort_by_key(|p| p.timestamp_utc);
    debug!(
        country = request.country.as_str(),
        points = points.len(),
        "decoded day-ahead document"
    );
    Ok(points)
}

fn record_text(period: &mut PeriodState, path: &[String], text: &str) -> Result<(), SourceError> {
    let under_period = path.iter().any(|n| n == "Period");
    if !under_period {
        return Ok(());
    }
    match path.last().map(String::as_str) {
        Some("start") if path.iter().any(|n| n == "timeInterval") => {
            period.start = Some(parse_interval_start(text)?);
        }
        Some("resolution") => period.resolution = text.to_owned(),
        Some("position") if path.iter().any(|n| n == "Point") => {
            period.position = Some(text.parse::<i64>().map_err(|_| {
                SourceError::malformed(format!("invalid point position {text:?}"))
            })?);
        }
        Some("price.amount") if path.iter().any(|n| n == "Point") => {
            period.amount = Some(text.parse::<f64>().map_err(|_| {
                SourceError::malformed(format!("invalid price amount {text:?}"))
            })?);
        }
        _ => {}
    }
    Ok(())
}

fn finalize_point(
    period: &PeriodState,
    request: &FetchRequest,
    points: &mut Vec<PricePoint>,
) -> Result<(), SourceError> {
    if period.resolution != HOURLY_RESOLUTION {
        return Ok(());
    }
    let start = period
        .start
        .ok_or_else(|| SourceError::malformed("point before period timeInterval"))?;
    let position = period
        .position
        .ok_or_else(|| SourceError::malformed("point without position"))?;
    let amount = period
        .amount
        .ok_or_else(|| SourceError::malformed("point without price.amount"))?;

    if position < 1 {
        return Err(SourceError::malformed(format!(
            "point position {position} out of range"
        )));
    }

    let timestamp = start + Duration::hours(position - 1);
    let point = PricePoint::new(timestamp, request.country.clone(), amount)
        .map_err(|e| SourceError::malformed(format!("rejected upstream point: {e}")))?;
    points.push(point);
    Ok(())
}

/// ENTSO-E interval starts come as `2023-12-31T23:00Z`, occasionally
/// with seconds.
fn parse_interval_start(text: &str) -> Result<DateTime<Utc>, SourceError> {
    for fmt in ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(SourceError::malformed(format!(
        "invalid period start {text:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_window;
    use crate::{CountryCode, SourceErrorKind};
    use chrono::TimeZone;

    fn request() -> FetchRequest {
        FetchRequest::new(
            CountryCode::parse("NL").expect("valid code"),
            "10YNL----------L",
            test_window(0, 3),
        )
        .expect("valid request")
    }

    fn document(period: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Publication_MarketDocument xmlns=\"urn:iec62325.351:tc57wg16:451-3:publicationdocument:7:0\">\
             <TimeSeries><currency_Unit.name>EUR</currency_Unit.name>{period}</TimeSeries>\
             </Publication_MarketDocument>"
        )
    }

    #[test]
    fn decodes_hourly_points_from_positions() {
        let body = document(
            "<Period><timeInterval><start>2024-03-01T00:00Z</start>\
             <end>2024-03-01T03:00Z</end></timeInterval>\
             <resolution>PT60M</resolution>\
             <Point><position>1</position><price.amount>50.10</price.amount></Point>\
             <Point><position>2</position><price.amount>-4.00</price.amount></Point>\
             <Point><position>3</position><price.amount>61.25</price.amount></Point>\
             </Period>",
        );
        let points = parse_publication_document(&body, &request()).expect("parses");

        assert_eq!(points.len(), 3);
        assert_eq!(
            points[0].timestamp_utc,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(points[0].price_eur_per_mwh, 50.10);
        assert_eq!(points[1].price_eur_per_mwh, -4.00);
        assert_eq!(points[0].country.as_str(), "NL");
    }

    #[test]
    fn skips_non_hourly_periods() {
        let body = document(
            "<Period><timeInterval><start>2024-03-01T00:00Z</start>\
             <end>2024-03-01T01:00Z</end></timeInterval>\
             <resolution>PT15M</resolution>\
             <Point><position>1</position><price.amount>50.00</price.amount></Point>\
             </Period>",
        );
        let points = parse_publication_document(&body, &request()).expect("parses");
        assert!(points.is_empty());
    }

    #[test]
    fn multiple_periods_are_sorted_chronologically() {
        let body = document(
            "<Period><timeInterval><start>2024-03-02T00:00Z</start>\
             <end>2024-03-02T01:00Z</end></timeInterval>\
             <resolution>PT60M</resolution>\
             <Point><position>1</position><price.amount>20.0</price.amount></Point>\
             </Period>\
             <Period><timeInterval><start>2024-03-01T00:00Z</start>\
             <end>2024-03-01T01:00Z</end></timeInterval>\
             <resolution>PT60M</resolution>\
             <Point><position>1</position><price.amount>10.0</price.amount></Point>\
             </Period>",
        );
        let points = parse_publication_document(&body, &request()).expect("parses");
        assert_eq!(points.len(), 2);
        assert!(points[0].timestamp_utc < points[1].timestamp_utc);
        assert_eq!(points[0].price_eur_per_mwh, 10.0);
    }

    #[test]
    fn malformed_position_is_a_malformed_error() {
        let body = document(
            "<Period><timeInterval><start>2024-03-01T00:00Z</start>\
             <end>2024-03-01T01:00Z</end></timeInterval>\
             <resolution>PT60M</resolution>\
             <Point><position>one</position><price.amount>50.0</price.amount></Point>\
             </Period>",
        );
        let err = parse_publication_document(&body, &request()).unwrap_err();
        assert_eq!(err.kind(), SourceErrorKind::Malformed);
    }

    #[test]
    fn status_classification_matches_retry_semantics() {
        let auth = classify_status(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert_eq!(auth.kind(), SourceErrorKind::Auth);
        assert!(!auth.retryable());

        let limited = classify_status(StatusCode::TOO_MANY_REQUESTS, "").unwrap_err();
        assert_eq!(limited.kind(), SourceErrorKind::RateLimited);
        assert!(limited.retryable());

        let upstream = classify_status(StatusCode::BAD_GATEWAY, "").unwrap_err();
        assert_eq!(upstream.kind(), SourceErrorKind::Network);
        assert!(upstream.retryable());

        let bad = classify_status(StatusCode::BAD_REQUEST, "<Reason><text>bad domain</text></Reason>")
            .unwrap_err();
        assert_eq!(bad.kind(), SourceErrorKind::InvalidDomain);
        assert!(!bad.retryable());

        assert!(classify_status(
            StatusCode::BAD_REQUEST,
            "<Reason><text>No matching data found</text></Reason>"
        )
        .is_ok());
    }

    #[test]
    fn interval_start_accepts_both_observed_formats() {
        assert_eq!(
            parse_interval_start("2024-03-01T00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_interval_start("2024-03-01T00:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_interval_start("yesterday").is_err());
    }
}
