//! Configuration types for API client construction.

use std::collections::BTreeMap;
use std::time::Duration;

/// Public endpoint of the character catalog.
pub const DEFAULT_API_URL: &str = "https://rickandmortyapi.com/api";

/// Configuration for API client construction.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the catalog API, request paths are appended to it.
    pub api_url: String,
    /// Optional `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for a complete request.
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
        }
    }
}
