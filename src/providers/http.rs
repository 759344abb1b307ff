//! Time-bounded JSON retrieval shared by every upstream client.

use crate::core::config::{DEFAULT_USER_AGENT, HttpConfig};
use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Thin wrapper over a `reqwest::Client` that never fails past its boundary:
/// timeouts, transport errors, non-2xx statuses, malformed bodies and schema
/// mismatches all come back as `None`, each with its own log signal.
#[derive(Clone, Debug)]
pub struct JsonFetcher {
    client: reqwest::Client,
}

impl JsonFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::new(config.timeout(), &config.user_agent)
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Fetches `url` and decodes the body as `T`. Decoding into a typed
    /// struct is the schema check; use `serde_json::Value` to skip it.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        debug!("Requesting {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(%url, "Request timed out");
                return None;
            }
            Err(e) => {
                warn!(%url, error = %e, "API request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "HTTP error");
            return None;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                warn!(%url, "Request timed out while reading body");
                return None;
            }
            Err(e) => {
                warn!(%url, error = %e, "Response body is not valid JSON");
                return None;
            }
        };

        match serde_json::from_value(body) {
            Ok(data) => Some(data),
            Err(e) => {
                error!(%url, error = %e, "Schema validation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        name: String,
        price: f64,
    }

    async fn create_mock_server(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("accept", "application/json"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_fetch_json_success() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"name": "Gold", "price": 2345.5}"#),
        )
        .await;

        let fetcher = JsonFetcher::with_defaults().unwrap();
        let payload: Option<Payload> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert_eq!(
            payload,
            Some(Payload {
                name: "Gold".to_string(),
                price: 2345.5
            })
        );
    }

    #[tokio::test]
    async fn test_fetch_json_without_schema() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"anything": [1, 2, 3]}"#),
        )
        .await;

        let fetcher = JsonFetcher::with_defaults().unwrap();
        let value: Option<serde_json::Value> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert_eq!(value.unwrap()["anything"][2], 3);
    }

    #[tokio::test]
    async fn test_fetch_json_http_error_is_absent() {
        let mock_server = create_mock_server(ResponseTemplate::new(500)).await;

        let fetcher = JsonFetcher::with_defaults().unwrap();
        let payload: Option<Payload> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_fetch_json_schema_mismatch_is_absent() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200).set_body_string(r#"{"name": "Gold", "price": "high"}"#),
        )
        .await;

        let fetcher = JsonFetcher::with_defaults().unwrap();
        let payload: Option<Payload> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_fetch_json_malformed_body_is_absent() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .await;

        let fetcher = JsonFetcher::with_defaults().unwrap();
        let value: Option<serde_json::Value> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_fetch_json_timeout_is_absent() {
        let mock_server = create_mock_server(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"name": "Gold", "price": 1.0}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let fetcher = JsonFetcher::new(Duration::from_millis(50), DEFAULT_USER_AGENT).unwrap();
        let payload: Option<Payload> = fetcher
            .fetch_json(&format!("{}/data", mock_server.uri()))
            .await;

        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_fetch_json_unreachable_host_is_absent() {
        let fetcher = JsonFetcher::new(Duration::from_millis(500), DEFAULT_USER_AGENT).unwrap();
        let value: Option<serde_json::Value> = fetcher.fetch_json("http://127.0.0.1:1/data").await;

        assert!(value.is_none());
    }
}
