//! Page fetching from an ArcGIS feature service `query` endpoint
//!
//! The coordinator only depends on the [`PageFetcher`] trait; [`ArcGisFetcher`] is the HTTP
//! implementation used in production. Each call issues exactly one request and never
//! retries.

use crate::config::ServiceConfig;
use crate::error::{Error, FetchError, FetchErrorKind, Result};
use crate::types::{Page, Record};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Source of pages for the pagination coordinator
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch up to `page_size` records starting at `offset`
    ///
    /// An empty page is the normal end-of-data signal, not an error.
    async fn fetch_page(
        &self,
        offset: u64,
        page_size: u64,
    ) -> std::result::Result<Page, FetchError>;
}

/// Query result body returned by the service
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default, rename = "exceededTransferLimit")]
    exceeded_transfer_limit: bool,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    /// Some layers send `null` for a feature without attributes
    #[serde(default)]
    attributes: Option<Record>,
}

/// Error object the service sends with HTTP 200 when a query is rejected
#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Decode a query response body into a page
fn decode_page(offset: u64, body: &[u8]) -> std::result::Result<Page, FetchError> {
    let response: QueryResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::new(offset, FetchErrorKind::Decode(e)))?;

    if let Some(error) = response.error {
        return Err(FetchError::new(
            offset,
            FetchErrorKind::Service {
                code: error.code,
                message: error.message,
            },
        ));
    }

    Ok(Page {
        records: response
            .features
            .into_iter()
            .map(|feature| feature.attributes.unwrap_or_default())
            .collect(),
        exceeded_transfer_limit: response.exceeded_transfer_limit,
    })
}

/// Query parameters for one page: every field, no geometry, all rows
fn query_params(offset: u64, page_size: u64) -> [(&'static str, String); 6] {
    [
        ("where", "1=1".to_string()),
        ("outFields", "*".to_string()),
        ("returnGeometry", "false".to_string()),
        ("f", "json".to_string()),
        ("resultOffset", offset.to_string()),
        ("resultRecordCount", page_size.to_string()),
    ]
}

/// HTTP page fetcher for an ArcGIS FeatureServer layer
pub struct ArcGisFetcher {
    /// HTTP client shared by all workers
    http_client: reqwest::Client,

    /// Layer `query` endpoint
    query_url: String,
}

impl ArcGisFetcher {
    /// Create a fetcher for the configured service
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            http_client,
            query_url: config.query_url.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for ArcGisFetcher {
    async fn fetch_page(
        &self,
        offset: u64,
        page_size: u64,
    ) -> std::result::Result<Page, FetchError> {
        debug!(offset, page_size, url = %self.query_url, "Requesting page");

        let response = self
            .http_client
            .get(&self.query_url)
            .query(&query_params(offset, page_size))
            .send()
            .await
            .map_err(|e| FetchError::new(offset, FetchErrorKind::Request(e)))?;

        // Check HTTP status before trying to decode the response body
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                offset,
                FetchErrorKind::Status(status.as_u16()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::new(offset, FetchErrorKind::Body(e)))?;

        let page = decode_page(offset, &body)?;
        debug!(offset, records = page.len(), "Decoded page");
        Ok(page)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> ArcGisFetcher {
        ArcGisFetcher::new(&ServiceConfig {
            query_url: format!("{}/FeatureServer/0/query", server.uri()),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn decode_page_collects_attributes() {
        let body = br#"{
            "objectIdFieldName": "ObjectId",
            "features": [
                {"attributes": {"ObjectId": 1, "Zip": "40211"}},
                {"attributes": {"ObjectId": 2, "Zip": null}}
            ],
            "exceededTransferLimit": true
        }"#;

        let page = decode_page(0, body).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.exceeded_transfer_limit);
        assert_eq!(page.records[0]["ObjectId"], FieldValue::Number(1.0));
        assert_eq!(page.records[1]["Zip"], FieldValue::Null);
    }

    #[test]
    fn null_or_missing_attributes_decode_as_empty_records() {
        let body = br#"{
            "features": [
                {"attributes": null},
                {},
                {"attributes": {"Case_": "23CI000456"}}
            ]
        }"#;

        let page = decode_page(0, body).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.records[0].is_empty());
        assert!(page.records[1].is_empty());
        assert_eq!(
            page.records[2]["Case_"],
            FieldValue::Text("23CI000456".into())
        );
    }

    #[test]
    fn decode_page_without_features_is_empty() {
        let page = decode_page(5000, br#"{"features": []}"#).unwrap();
        assert!(page.is_empty());
        assert!(!page.exceeded_transfer_limit);
    }

    #[test]
    fn decode_page_reports_service_error_object() {
        let body = br#"{"error": {"code": 400, "message": "Invalid query", "details": []}}"#;
        let err = decode_page(2000, body).unwrap_err();
        assert_eq!(err.offset, 2000);
        assert!(matches!(
            err.kind,
            FetchErrorKind::Service { code: 400, ref message } if message == "Invalid query"
        ));
    }

    #[test]
    fn decode_page_rejects_malformed_body() {
        let err = decode_page(1000, b"<html>busy</html>").unwrap_err();
        assert_eq!(err.offset, 1000);
        assert!(matches!(err.kind, FetchErrorKind::Decode(_)));
    }

    #[tokio::test]
    async fn sends_full_query_for_offset() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/FeatureServer/0/query"))
            .and(query_param("where", "1=1"))
            .and(query_param("outFields", "*"))
            .and(query_param("returnGeometry", "false"))
            .and(query_param("f", "json"))
            .and(query_param("resultOffset", "3000"))
            .and(query_param("resultRecordCount", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"features": [{"attributes": {"Case_": "23CI000123"}}]}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = fetcher_for(&mock_server)
            .fetch_page(3000, 1000)
            .await
            .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(
            page.records[0]["Case_"],
            FieldValue::Text("23CI000123".into())
        );
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let err = fetcher_for(&mock_server)
            .fetch_page(7000, 1000)
            .await
            .unwrap_err();

        assert_eq!(err.offset, 7000);
        assert!(matches!(err.kind, FetchErrorKind::Status(503)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"features": []}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = ArcGisFetcher::new(&ServiceConfig {
            query_url: format!("{}/query", mock_server.uri()),
            request_timeout: Duration::from_millis(100),
            ..Default::default()
        })
        .unwrap();

        let err = fetcher.fetch_page(0, 10).await.unwrap_err();
        assert!(matches!(err.kind, FetchErrorKind::Request(ref e) if e.is_timeout()));
    }
}
