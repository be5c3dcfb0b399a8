//! HTTP client for the product master OData service

use crate::error::QueryError;
use crate::models::ODataRequest;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Request timeout when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client for OData GET requests
pub struct ODataClient {
    http_client: Client,
    timeout: Duration,
}

impl ODataClient {
    /// Create a new client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("oprobe/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one GET and read the whole body; never retries
    pub async fn send(&self, request: &ODataRequest) -> Result<RawResponse, QueryError> {
        let mut builder = self.http_client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}
