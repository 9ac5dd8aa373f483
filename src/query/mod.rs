use chrono::{DateTime, Duration, Utc};
use reqwest::Method;

use crate::transport::{build_url, SignedTransport};
use crate::{AmpErr, Result};

mod response;

pub use response::*;

pub const QUERY_PATH: &str = "api/v1/query";
pub const QUERY_RANGE_PATH: &str = "api/v1/query_range";
pub const METRIC_NAMES_PATH: &str = "api/v1/label/__name__/values";
pub const DEFAULT_STEP: &str = "1m";
pub const DEFAULT_RANGE_DAYS: i64 = 7;

/// Range query window. Missing bounds default to the last seven days ending now.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeSpec {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub step: String,
}

impl Default for RangeSpec {
    fn default() -> Self {
        RangeSpec { start: None, end: None, step: DEFAULT_STEP.to_string() }
    }
}

impl RangeSpec {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>, step: &str) -> RangeSpec {
        RangeSpec { start, end, step: step.to_string() }
    }

    /// Concrete `(start, end, step)` in unix seconds, defaults applied against `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<(i64, i64, String)> {
        let end = self.end.unwrap_or(now);
        let start = self.start.unwrap_or(now - Duration::days(DEFAULT_RANGE_DAYS));
        if start > end {
            return Err(AmpErr::OptionErr(format!("range start {} is after end {}", start, end)));
        }
        parse_step(&self.step)?;
        Ok((start.timestamp(), end.timestamp(), self.step.clone()))
    }
}

/// Step as seconds. Accepts float seconds (`15`, `0.5`) or a prometheus duration (`1m`, `1h30m`, `500ms`).
pub fn parse_step(step: &str) -> Result<f64> {
    let step = step.trim();
    let seconds = match step.parse::<f64>() {
        Ok(v) => v,
        Err(_) => promql_parser::util::parse_duration(step)
            .map_err(|e| AmpErr::OptionErr(format!("invalid step {:?}: {}", step, e)))?
            .as_secs_f64(),
    };
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(AmpErr::OptionErr(format!("invalid step {:?}", step)));
    }
    Ok(seconds)
}

/// Signed GETs against the query api of one workspace.
pub struct QueryClient {
    base: String,
}

impl QueryClient {
    pub fn new(base: &str) -> QueryClient {
        QueryClient { base: base.trim_end_matches('/').to_string() }
    }

    /// Instant query when `range` is absent, range query otherwise.
    pub fn query(
        &self,
        transport: &SignedTransport,
        expression: &str,
        range: Option<&RangeSpec>,
    ) -> Result<QueryResult> {
        let (path, params) = self.query_params(expression, range, Utc::now())?;
        let body = self.get(transport, path, &params)?;
        decode_query_response(&body)
    }

    pub fn list_metric_names(&self, transport: &SignedTransport) -> Result<Vec<String>> {
        let body = self.get(transport, METRIC_NAMES_PATH, &[])?;
        decode_label_values(&body)
    }

    /// Endpoint path and query parameters for `expression`.
    pub fn query_params(
        &self,
        expression: &str,
        range: Option<&RangeSpec>,
        now: DateTime<Utc>,
    ) -> Result<(&'static str, Vec<(&'static str, String)>)> {
        if expression.trim().is_empty() {
            return Err(AmpErr::OptionErr("empty query expression".to_string()));
        }
        match range {
            None => Ok((QUERY_PATH, vec![("query", expression.to_string())])),
            Some(range) => {
                let (start, end, step) = range.resolve(now)?;
                Ok((
                    QUERY_RANGE_PATH,
                    vec![
                        ("query", expression.to_string()),
                        ("start", start.to_string()),
                        ("end", end.to_string()),
                        ("step", step),
                    ],
                ))
            }
        }
    }

    fn get(&self, transport: &SignedTransport, path: &str, params: &[(&str, String)]) -> Result<String> {
        let url = build_url(&self.base, path, params)?;
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let response = transport.execute(Method::GET, url, headers, Vec::new())?;
        if !response.is_success() {
            return Err(AmpErr::QueryErr { status: response.status, body: response.body });
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use crate::query::{parse_step, QueryClient, RangeSpec, QUERY_PATH, QUERY_RANGE_PATH};

    #[test]
    fn instant_params() {
        let client = QueryClient::new("https://example.com/workspaces/ws-1");
        let (path, params) = client.query_params("up", None, Utc::now()).unwrap();
        assert_eq!(path, QUERY_PATH);
        assert_eq!(params, vec![("query", "up".to_string())]);
    }

    #[test]
    fn range_defaults_to_last_week() {
        let client = QueryClient::new("https://example.com/workspaces/ws-1");
        let now = Utc::now();
        let (path, params) = client.query_params("up", Some(&RangeSpec::default()), now).unwrap();
        assert_eq!(path, QUERY_RANGE_PATH);
        let start: i64 = params[1].1.parse().unwrap();
        let end: i64 = params[2].1.parse().unwrap();
        assert!((end - now.timestamp()).abs() <= 1);
        assert!((end - start - 7 * 24 * 3600).abs() <= 1);
        assert_eq!(params[3], ("step", "1m".to_string()));
    }

    #[test]
    fn explicit_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(1);
        let range = RangeSpec::new(Some(start), Some(end), "30s");
        assert_eq!(range.resolve(Utc::now()).unwrap(), (1704067200, 1704070800, "30s".to_string()));
    }

    #[test]
    fn start_after_end_rejected() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let range = RangeSpec::new(Some(end + Duration::seconds(1)), Some(end), "1m");
        assert!(range.resolve(Utc::now()).is_err());
    }

    #[test]
    fn only_start_given() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let range = RangeSpec::new(Some(now - Duration::hours(2)), None, "1m");
        let (start, end, _) = range.resolve(now).unwrap();
        assert_eq!(end - start, 7200);
    }

    #[test]
    fn steps() {
        assert_eq!(parse_step("1m").unwrap(), 60.0);
        assert_eq!(parse_step("1h30m").unwrap(), 5400.0);
        assert_eq!(parse_step("500ms").unwrap(), 0.5);
        assert_eq!(parse_step("15").unwrap(), 15.0);
        assert!(parse_step("0").is_err());
        assert!(parse_step("-5").is_err());
        assert!(parse_step("").is_err());
        assert!(parse_step("m").is_err());
        assert!(parse_step("5x").is_err());
        assert!(parse_step("inf").is_err());
    }

    #[test]
    fn step_units_must_descend_once() {
        assert!(parse_step("1m1h").is_err());
        assert!(parse_step("1s1s").is_err());
        assert_eq!(parse_step("2d12h").unwrap(), 216000.0);
    }

    #[test]
    fn empty_expression() {
        let client = QueryClient::new("https://example.com");
        assert!(client.query_params(" ", None, Utc::now()).is_err());
    }
}
