use std::env;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use character_api::DEFAULT_API_URL;
use character_sdk::controllers::DEFAULT_DEBOUNCE;
use config::{Config as HierarchicalConfig, Environment};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the directories holding the configuration file
const CHARACTERS_DIR_NAME: &str = "characters";
const CHARACTERS_CONFIG_DIR_VAR: &str = "CHARACTERS_CONFIG_DIR";
pub const CHARACTERS_CONFIG_FILE: &str = "characters.toml";
/// Prefix of environment variables overriding config keys
const CHARACTERS_ENV_PREFIX: &str = "CHARACTERS";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the character API
    pub api_url: String,

    /// User agent sent with API requests
    pub user_agent: Option<String>,

    /// Quiet period in milliseconds before a changed search is applied
    pub debounce_ms: u64,

    /// How many pages `characters list` loads by default
    pub page_limit: NonZeroU32,

    /// Directory the user configuration file is read from (default:
    /// `$XDG_CONFIG_HOME/characters`)
    pub config_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: None,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            page_limit: NonZeroU32::MIN,
            config_dir: PathBuf::from(CHARACTERS_DIR_NAME),
        }
    }
}

impl Config {
    /// Creates a [Config] from defaults, config files and the environment
    ///
    /// Sources in increasing precedence:
    /// built-in defaults, `/etc/characters/characters.toml`,
    /// `characters.toml` in the user config dir, `CHARACTERS_*` variables.
    pub fn parse() -> Result<Config> {
        let config_dir = match env::var(CHARACTERS_CONFIG_DIR_VAR) {
            Ok(v) => {
                debug!("`${CHARACTERS_CONFIG_DIR_VAR}` set: {v}");
                PathBuf::from(v)
            },
            Err(_) => {
                let config_dir = dirs::config_dir()
                    .context("Could not determine the user config directory")?
                    .join(CHARACTERS_DIR_NAME);
                debug!("`${CHARACTERS_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
                config_dir
            },
        };

        let system_dir = Path::new("/etc").join(CHARACTERS_DIR_NAME);
        Self::read_from(&system_dir, &config_dir)
    }

    fn read_from(system_dir: &Path, config_dir: &Path) -> Result<Config> {
        let defaults = Config::default();

        let builder = HierarchicalConfig::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("debounce_ms", i64::try_from(defaults.debounce_ms)?)?
            .set_default("page_limit", i64::from(defaults.page_limit.get()))?
            // Config dir is added to the config for completeness;
            // the config file cannot change the config dir.
            .set_override("config_dir", config_dir.to_string_lossy().as_ref())?
            .add_source(
                config::File::from(system_dir.join(CHARACTERS_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::File::from(config_dir.join(CHARACTERS_CONFIG_FILE))
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(CHARACTERS_ENV_PREFIX).try_parsing(true));

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("Could not parse config")?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
