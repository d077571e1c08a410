//! HTTP client for the catalog API.

use std::fmt::Debug;
use std::str::FromStr;

use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::config::ApiClientConfig;
use crate::error::ApiClientError;

/// A client for the catalog API.
///
/// Performs `GET` requests relative to the configured base URL and decodes
/// JSON responses. There is no retry or caching at this layer.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    config: ApiClientConfig,
}

impl Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client from configuration.
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiClientError> {
        let base_url = Url::parse(&config.api_url).map_err(|e| {
            ApiClientError::InvalidRequest(format!("invalid api url '{}': {e}", config.api_url))
        })?;
        let http = build_http_client(&config)?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Get the configured base URL.
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// Fetch `path` with the given query parameters and decode the JSON body.
    ///
    /// Non-2xx responses fail with [ApiClientError::ServerRejected]
    /// regardless of their body.
    #[instrument(skip(self, query), fields(path = path))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiClientError> {
        let url = self.request_url(path, query)?;
        debug!(%url, "sending GET request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ApiClientError::NetworkFailure)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ApiClientError::NetworkFailure)?;

        trace!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "received response"
        );

        if !status.is_success() {
            return Err(ApiClientError::ServerRejected(status.as_u16()));
        }

        serde_json::from_slice(&body).map_err(ApiClientError::MalformedResponse)
    }

    /// Append `path` to the base URL and attach query parameters.
    fn request_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiClientError::InvalidRequest(format!(
                    "'{}' cannot be used as a base url",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }

        Ok(url)
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build the HTTP client with default headers and timeouts.
fn build_http_client(config: &ApiClientConfig) -> Result<reqwest::Client, ApiClientError> {
    let mut headers = HeaderMap::new();

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(|e: header::InvalidHeaderName| {
                ApiClientError::InvalidRequest(e.to_string())
            })?,
            header::HeaderValue::from_str(value).map_err(|e: header::InvalidHeaderValue| {
                ApiClientError::InvalidRequest(e.to_string())
            })?,
        );
    }

    debug!(
        api_url = %config.api_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout);

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| ApiClientError::InvalidRequest(e.to_string()))
}
