//! HTTP client for the Eagle's local management API.
//!
//! The device accepts a sequence of `LocalCommand` blocks posted to
//! `/cgi-bin/cgi_manager` with basic authentication and answers with a JSON
//! object. Only `demand` (kW) and `summation_delivered` (kWh) are used; both
//! arrive as numeric strings on real hardware, so numbers and strings are
//! both accepted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::{Credentials, ExporterConfig};
use crate::device::{DeviceSource, Reading};
use crate::error::{ExporterError, FetchError};

/// Path of the management endpoint on the device.
pub const CGI_MANAGER_PATH: &str = "/cgi-bin/cgi_manager";

/// Longest response body kept in a [`FetchError::DeviceRejected`].
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Builds the request body asking for usage data and price blocks.
#[must_use]
pub fn request_payload(mac: &str) -> String {
    format!(
        "\n<LocalCommand>\n  <Name>get_usage_data</Name>\n  <MacId>{mac}</MacId>\n</LocalCommand>\n\
         <LocalCommand>\n  <Name>get_price_blocks</Name>\n  <MacId>{mac}</MacId>\n</LocalCommand>\n"
    )
}

/// Builds the management endpoint URL for `host`.
///
/// A bare host or `host:port` is addressed over plain HTTP; a value that
/// already carries a scheme is used as the base URL.
#[must_use]
pub fn device_endpoint(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}{CGI_MANAGER_PATH}")
    } else {
        format!("http://{host}{CGI_MANAGER_PATH}")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self, field: &str) -> Result<f64, String> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("field `{field}` is not numeric: {s:?}"))?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("field `{field}` is not finite: {value}"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageReport {
    demand: Numeric,
    summation_delivered: Numeric,
}

/// Decodes a usage report body into a [`Reading`].
///
/// Demand is converted from kilowatts to watts.
///
/// # Errors
///
/// Returns a description of the problem if the body is not JSON, lacks a
/// required field, or carries a non-numeric value.
pub fn parse_usage_report(body: &str, observed_at: DateTime<Utc>) -> Result<Reading, String> {
    let report: UsageReport = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let demand_kw = report.demand.value("demand")?;
    let summation_delivered_kwh = report.summation_delivered.value("summation_delivered")?;

    Ok(Reading {
        demand_watts: demand_kw * 1000.0,
        summation_delivered_kwh,
        observed_at,
    })
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Polls one Eagle over HTTP.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    host: String,
    endpoint: String,
    credentials: Credentials,
    payload: String,
}

impl DeviceClient {
    /// Create a client for the device at `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        host: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ExporterError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExporterError::HttpClient(e.to_string()))?;

        let host = host.into();
        let endpoint = device_endpoint(&host);
        let payload = request_payload(&credentials.mac);

        Ok(Self {
            http,
            host,
            endpoint,
            credentials,
            payload,
        })
    }

    /// Create a client from the exporter configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, ExporterError> {
        Self::new(
            config.eagle_host.clone(),
            config.credentials.clone(),
            config.request_timeout(),
        )
    }

    /// The URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn network_error(&self, err: &reqwest::Error) -> FetchError {
        FetchError::Network {
            endpoint: self.endpoint.clone(),
            reason: err.to_string(),
        }
    }
}

impl DeviceSource for DeviceClient {
    fn identity(&self) -> &str {
        &self.host
    }

    async fn fetch(&self) -> Result<Reading, FetchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .body(self.payload.clone())
            .send()
            .await
            .map_err(|e| self.network_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::DeviceRejected {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = response.text().await.map_err(|e| self.network_error(&e))?;

        parse_usage_report(&body, Utc::now()).map_err(|reason| FetchError::MalformedResponse {
            endpoint: self.endpoint.clone(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    mod payload_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn test_payload_contains_both_commands_with_mac() {
            let payload = request_payload("0xd8d5b90000001234");

            assert!(payload.contains("<Name>get_usage_data</Name>"));
            assert!(payload.contains("<Name>get_price_blocks</Name>"));
            assert_eq!(payload.matches("<MacId>0xd8d5b90000001234</MacId>").count(), 2);
            assert_eq!(payload.matches("<LocalCommand>").count(), 2);
        }

        #[test_case("eagle", "http://eagle/cgi-bin/cgi_manager" ; "bare host")]
        #[test_case("192.168.1.50:8080", "http://192.168.1.50:8080/cgi-bin/cgi_manager" ; "host and port")]
        #[test_case("https://eagle.local/", "https://eagle.local/cgi-bin/cgi_manager" ; "url with scheme")]
        fn test_device_endpoint(host: &str, expected: &str) {
            assert_eq!(device_endpoint(host), expected);
        }
    }

    mod decode_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn test_string_demand_converted_to_watts() {
            let reading =
                parse_usage_report(r#"{"demand": "1.234", "summation_delivered": 56.7}"#, now())
                    .expect("should decode");

            assert!((reading.demand_watts - 1234.0).abs() < 1e-9);
            assert!((reading.summation_delivered_kwh - 56.7).abs() < 1e-9);
        }

        #[test]
        fn test_numeric_fields_accepted() {
            let reading =
                parse_usage_report(r#"{"demand": 0.5, "summation_delivered": "12.000"}"#, now())
                    .expect("should decode");

            assert!((reading.demand_watts - 500.0).abs() < 1e-9);
            assert!((reading.summation_delivered_kwh - 12.0).abs() < 1e-9);
        }

        #[test]
        fn test_extra_fields_ignored() {
            let body = r#"{
                "demand": "0.250",
                "demand_units": "kW",
                "summation_delivered": "1000.5",
                "summation_received": "0.000",
                "meter_status": "Connected",
                "price": "0.1200"
            }"#;
            let reading = parse_usage_report(body, now()).expect("should decode");
            assert!((reading.demand_watts - 250.0).abs() < 1e-9);
        }

        #[test]
        fn test_observed_at_is_preserved() {
            let at = now();
            let reading =
                parse_usage_report(r#"{"demand": 1, "summation_delivered": 2}"#, at).unwrap();
            assert_eq!(reading.observed_at, at);
        }

        #[test_case("not json at all" ; "not json")]
        #[test_case("" ; "empty body")]
        #[test_case(r#"{"summation_delivered": 1.0}"# ; "missing demand")]
        #[test_case(r#"{"demand": 1.0}"# ; "missing summation")]
        #[test_case(r#"{"demand": "abc", "summation_delivered": 1.0}"# ; "non numeric demand")]
        #[test_case(r#"{"demand": "NaN", "summation_delivered": 1.0}"# ; "nan demand")]
        #[test_case(r#"{"demand": 1.0, "summation_delivered": "inf"}"# ; "infinite summation")]
        #[test_case(r#"{"demand": null, "summation_delivered": 1.0}"# ; "null demand")]
        #[test_case(r#"[1, 2]"# ; "array body")]
        fn test_malformed_bodies_rejected(body: &str) {
            assert!(parse_usage_report(body, now()).is_err());
        }

        #[test]
        fn test_error_names_offending_field() {
            let err =
                parse_usage_report(r#"{"demand": "x", "summation_delivered": 1}"#, now()).unwrap_err();
            assert!(err.contains("demand"));
        }

        proptest::proptest! {
            #[test]
            fn prop_string_and_number_forms_agree(
                demand_kw in -1_000.0f64..1_000.0,
                summation in 0.0f64..1.0e9,
            ) {
                let as_numbers = format!(
                    r#"{{"demand": {demand_kw}, "summation_delivered": {summation}}}"#
                );
                let as_strings = format!(
                    r#"{{"demand": "{demand_kw}", "summation_delivered": "{summation}"}}"#
                );
                let a = parse_usage_report(&as_numbers, now()).unwrap();
                let b = parse_usage_report(&as_strings, now()).unwrap();

                let close = |x: f64, y: f64| (x - y).abs() <= 1e-9 * y.abs().max(1.0);
                proptest::prop_assert!(close(a.demand_watts, b.demand_watts));
                proptest::prop_assert!(close(b.demand_watts, demand_kw * 1000.0));
                proptest::prop_assert!(close(b.summation_delivered_kwh, summation));
            }
        }
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "x".repeat(1000);
        let truncated = truncate_body(&long);
        assert_eq!(truncated.len(), MAX_ERROR_BODY_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_client_from_config() {
        let config = ExporterConfig::default()
            .with_eagle_host("10.0.0.7")
            .with_credentials(Credentials::new("user", "pass", "0x01"));
        let client = DeviceClient::from_config(&config).expect("client builds");

        assert_eq!(client.identity(), "10.0.0.7");
        assert_eq!(client.endpoint(), "http://10.0.0.7/cgi-bin/cgi_manager");
    }
}
