//! Query execution against the product master service

use super::ODataClient;
use crate::error::QueryError;
use crate::models::{ODataResult, QueryConfig};

impl ODataClient {
    /// Run one query and map the response
    ///
    /// Nothing is sent when the credential is empty. A 200 response is
    /// decoded as `{"d": {"results": [...]}}`; any other status comes back
    /// as [`ODataResult::Failure`] with the body untouched.
    pub async fn execute_query(&self, config: &QueryConfig) -> Result<ODataResult, QueryError> {
        let request = config.to_request()?;

        tracing::info!(url = %request.url, entity = %config.entity, "Sending OData request");

        let response = self.send(&request).await.inspect_err(|e| {
            tracing::warn!(error = %e, "OData request did not complete");
        })?;

        tracing::debug!(status = response.status, bytes = response.body.len(), "OData response received");

        if response.status != 200 {
            tracing::warn!(status = response.status, "OData request failed");
            return Ok(ODataResult::Failure {
                status: response.status,
                body: response.body,
            });
        }

        let result = ODataResult::from_success_body(&response.body)?;
        tracing::info!(records = result.record_count(), "OData request succeeded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntitySet, FilterEscaping};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ODataClient {
        ODataClient::new(Duration::from_secs(5)).unwrap()
    }

    fn config(server: &MockServer) -> QueryConfig {
        QueryConfig::new(server.uri(), EntitySet::ProductMaster, 2, "test-key")
    }

    #[tokio::test]
    async fn test_missing_credential_sends_nothing() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = QueryConfig::new(mock_server.uri(), EntitySet::ProductMaster, 2, "");
        let err = client().execute_query(&config).await.unwrap_err();

        assert_eq!(err, QueryError::MissingCredential);
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_with_headers_and_query() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/A_Product"))
            .and(query_param("$top", "2"))
            .and(query_param("$format", "json"))
            .and(header("APIKey", "test-key"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"d":{"results":[{"Product":"A"},{"Product":"B"}]}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client().execute_query(&config(&mock_server)).await.unwrap();

        let ODataResult::Rows(records) = result else {
            panic!("expected rows, got {:?}", result);
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Product"], json!("A"));
        assert_eq!(records[1]["Product"], json!("B"));
    }

    #[tokio::test]
    async fn test_filter_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/A_ProductPlant"))
            .and(query_param("$filter", "Product eq 'TG11'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "d": {"results": [{"Product": "TG11", "Plant": "1010"}]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = config(&mock_server).with_filter("TG11");
        config.entity = EntitySet::ProductPlant;
        let result = client().execute_query(&config).await.unwrap();

        assert_eq!(result.record_count(), 1);
    }

    #[tokio::test]
    async fn test_escaped_filter_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("$filter", "Product eq 'O''Neil'"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"d":{"results":[]}}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = config(&mock_server)
            .with_filter("O'Neil")
            .with_escaping(FilterEscaping::DoubleQuotes);
        let result = client().execute_query(&config).await.unwrap();

        assert_eq!(result, ODataResult::Empty);
    }

    #[tokio::test]
    async fn test_empty_results() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"d":{"results":[]}}"#))
            .mount(&mock_server)
            .await;

        let result = client().execute_query(&config(&mock_server)).await.unwrap();
        assert_eq!(result, ODataResult::Empty);
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&mock_server)
            .await;

        let result = client().execute_query(&config(&mock_server)).await.unwrap();
        assert_eq!(
            result,
            ODataResult::Failure {
                status: 404,
                body: "not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string(r#"{"fault":"busy"}"#))
            .mount(&mock_server)
            .await;

        let result = client().execute_query(&config(&mock_server)).await.unwrap();
        assert!(matches!(result, ODataResult::Failure { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_request_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&mock_server)
            .await;

        let err = client().execute_query(&config(&mock_server)).await.unwrap_err();
        assert!(matches!(err, QueryError::Request(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_request_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"d":{"results":[]}}"#)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let client = ODataClient::new(Duration::from_millis(100)).unwrap();
        let err = client.execute_query(&config(&mock_server)).await.unwrap_err();
        assert!(matches!(err, QueryError::Request(_)));
    }

    #[tokio::test]
    async fn test_repeated_query_is_idempotent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"d":{"results":[{"Product":"A"},{"Product":"B"}]}}"#,
            ))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = client();
        let config = config(&mock_server);
        let first = client.execute_query(&config).await.unwrap();
        let second = client.execute_query(&config).await.unwrap();
        let third = client.execute_query(&config).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let config = QueryConfig::new("http://127.0.0.1:9", EntitySet::ProductMaster, 1, "k");
        let err = ODataClient::new(Duration::from_secs(2))
            .unwrap()
            .execute_query(&config)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Request(_)));
    }
}
