use std::path::PathBuf;

use anyhow::{Context, bail};
use character_api::{ApiClient, ApiClientConfig};
use character_sdk::providers::mock::{CHARACTERS_MOCK_DATA_VAR, MockClient};
use character_sdk::providers::repository::{Client, RemoteCharacterRepository};
use tracing::debug;

use crate::config::Config;

/// User agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = concat!("characters/", env!("CARGO_PKG_VERSION"));

/// Initialize the character repository
///
/// - Initialize a mock client if `_CHARACTERS_USE_MOCK` is set to a path to mock data
/// - Initialize a client of the configured API otherwise
pub fn init_client(config: &Config) -> Result<Client, anyhow::Error> {
    if let Ok(path_str) = std::env::var(CHARACTERS_MOCK_DATA_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock character repository");
        return Ok(MockClient::new(Some(path))?.into());
    }

    let api_config = ApiClientConfig {
        api_url: config.api_url.clone(),
        user_agent: Some(
            config
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        ),
        ..Default::default()
    };

    debug!("using character API at {}", api_config.api_url);
    let api_client = ApiClient::new(api_config).context("could not set up the API client")?;
    Ok(RemoteCharacterRepository::new(api_client).into())
}
