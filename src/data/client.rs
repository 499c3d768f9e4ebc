//! Swedavia flight info API client
//!
//! This module provides the `FlightSource` seam the cache resolver fetches through,
//! and `SwedaviaClient`, its implementation against the Swedavia REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::{ArrivalsInfo, DeparturesInfo};

/// Base URL for the Swedavia API
pub const SWEDAVIA_BASE_URL: &str = "https://api.swedavia.se";

/// Header carrying the API subscription key
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Errors that can occur when fetching flight data
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with something other than 200 OK
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The fetch did not finish within the configured timeout
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Where arrival and departure sets come from when no snapshot exists
#[async_trait]
pub trait FlightSource: Send + Sync {
    async fn fetch_arrivals(&self, airport: &str, date: &str) -> Result<ArrivalsInfo, SourceError>;

    async fn fetch_departures(
        &self,
        airport: &str,
        date: &str,
    ) -> Result<DeparturesInfo, SourceError>;
}

/// Connection settings for the Swedavia API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without trailing slash
    pub base_url: String,
    pub subscription_key: String,
    /// Upper bound on a single request, connect to last body byte
    pub timeout: Duration,
}

impl ClientConfig {
    /// Creates a config for the public API endpoint
    pub fn new(subscription_key: impl Into<String>) -> Self {
        Self {
            base_url: SWEDAVIA_BASE_URL.to_string(),
            subscription_key: subscription_key.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for fetching flight data from the Swedavia flight info API
#[derive(Debug, Clone)]
pub struct SwedaviaClient {
    client: Client,
    base_url: String,
    subscription_key: String,
}

impl SwedaviaClient {
    /// Creates a new client from the given configuration
    ///
    /// # Returns
    /// * `Ok(SwedaviaClient)` on success
    /// * `Err(SourceError::Request)` if the TLS backend cannot be initialized
    pub fn new(config: ClientConfig) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            subscription_key: config.subscription_key,
        })
    }

    /// Builds the request URL for one direction of traffic
    fn url(&self, airport: &str, direction: &str, date: &str) -> String {
        format!(
            "{}/flightinfo/v2/{}/{}/{}",
            self.base_url, airport, direction, date
        )
    }

    /// Performs an authenticated GET and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        debug!(url, "requesting flight info");

        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::UnexpectedStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl FlightSource for SwedaviaClient {
    async fn fetch_arrivals(&self, airport: &str, date: &str) -> Result<ArrivalsInfo, SourceError> {
        self.get_json(&self.url(airport, "arrivals", date)).await
    }

    async fn fetch_departures(
        &self,
        airport: &str,
        date: &str,
    ) -> Result<DeparturesInfo, SourceError> {
        self.get_json(&self.url(airport, "departures", date)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults_to_public_api() {
        let config = ClientConfig::new("secret");
        assert_eq!(config.base_url, "https://api.swedavia.se");
        assert_eq!(config.subscription_key, "secret");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_url_layout() {
        let client = SwedaviaClient::new(ClientConfig {
            base_url: "https://example.test/".to_string(),
            subscription_key: "k".to_string(),
            timeout: Duration::from_secs(1),
        })
        .expect("Client should build");

        assert_eq!(
            client.url("ARN", "arrivals", "2024-05-01"),
            "https://example.test/flightinfo/v2/ARN/arrivals/2024-05-01"
        );
        assert_eq!(
            client.url("GOT", "departures", "2024-05-02"),
            "https://example.test/flightinfo/v2/GOT/departures/2024-05-02"
        );
    }

    #[test]
    fn test_unexpected_status_message_carries_code() {
        let err = SourceError::UnexpectedStatus(401);
        assert_eq!(err.to_string(), "unexpected status code: 401");
    }
}
