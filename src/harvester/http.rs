use crate::harvester::{HarvestError, Result};
use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

/// Body of a request that reached the gateway.
///
/// A non-success status is a soft failure and is reported instead of raised.
#[derive(Debug)]
pub enum Fetched<T> {
    Ok(T),
    Rejected(StatusCode),
}

/// HTTP client for the metadata gateway and image hosts
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }

    /// Metadata URL for an index, plain concatenation onto the base
    #[must_use]
    pub fn metadata_url(&self, index: u64) -> String {
        format!("{}{}", self.base_url, index)
    }

    /// Fetch and parse the metadata document for an index
    pub async fn fetch_metadata(&self, index: u64) -> Result<Fetched<Value>> {
        let url = parse_url(&self.metadata_url(index))?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Fetched::Rejected(status));
        }

        let body = response.bytes().await?;
        Ok(Fetched::Ok(serde_json::from_slice(&body)?))
    }

    /// Ask for the content type of a resource without downloading it.
    ///
    /// The status of the HEAD response is not checked; a missing or
    /// non-text header yields `None`.
    pub async fn content_type(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.head(parse_url(url)?).send().await?;

        Ok(response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    /// Download raw bytes from a URL
    pub async fn fetch_bytes(&self, url: &str) -> Result<Fetched<Vec<u8>>> {
        let response = self.client.get(parse_url(url)?).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Fetched::Rejected(status));
        }

        Ok(Fetched::Ok(response.bytes().await?.to_vec()))
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| HarvestError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
