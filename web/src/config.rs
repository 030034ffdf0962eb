use anyhow::{Context, Result, anyhow};
use libweather::provider::{
    ClientConfig,
    openweather::{DEFAULT_BASE_URL, DEFAULT_GEOCODING_URL, DEFAULT_TIMEOUT},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::{collections::HashMap, path::Path, time::Duration};
use tracing::debug;

const API_KEY_ENV: &str = "WEATHERWEB_API_KEY";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_geocoding_url() -> String {
    DEFAULT_GEOCODING_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub(crate) base_url: String,
    #[serde(default = "default_geocoding_url")]
    pub(crate) geocoding_url: String,
    /// request timeout in seconds
    pub(crate) timeout: Option<u64>,
    #[serde(default)]
    pub(crate) api_key_file: String,
    #[serde(skip)]
    pub(crate) api_key: SecretString,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            geocoding_url: default_geocoding_url(),
            timeout: None,
            api_key_file: String::new(),
            api_key: Default::default(),
        }
    }
}

impl PartialEq for ProviderConfig {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
            && self.geocoding_url == other.geocoding_url
            && self.timeout == other.timeout
            && self.api_key_file == other.api_key_file
            && self.api_key.expose_secret() == other.api_key.expose_secret()
    }
}

impl ProviderConfig {
    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            geocoding_url: self.geocoding_url.trim_end_matches('/').to_string(),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListenConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HOST: &str = "0.0.0.0";
fn default_listen() -> ListenConfig {
    ListenConfig {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_HTTP_PORT,
    }
}

// This handles the case where the `listen` block is PRESENT, but a field may be missing.
fn deserialize_listen_with_default_port<'de, D>(deserializer: D) -> Result<ListenConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct PartialListenConfig {
        host: Option<String>,
        port: Option<u16>,
    }

    let partial_config = PartialListenConfig::deserialize(deserializer)?;

    Ok(ListenConfig {
        host: partial_config
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: partial_config.port.unwrap_or(DEFAULT_HTTP_PORT),
    })
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default = "default_listen")]
    #[serde(deserialize_with = "deserialize_listen_with_default_port")]
    pub(crate) listen: ListenConfig,
    /// path to the sqlite database file, or `:memory:` for a throwaway database
    pub(crate) database: String,
    #[serde(default)]
    pub(crate) provider: ProviderConfig,
}

impl EnvConfig {
    /// Resolve the provider api key. The `api_key_file` entry takes priority
    /// over the environment variable.
    pub(crate) fn init(&mut self) -> Result<()> {
        let provider = &mut self.provider;
        if !provider.api_key_file.is_empty() {
            debug!(
                "Looking up provider api key from file '{}'",
                provider.api_key_file
            );
            provider.api_key = std::fs::read_to_string(&provider.api_key_file)
                .with_context(|| {
                    format!(
                        "Failed to read provider api key from file '{}'",
                        provider.api_key_file
                    )
                })?
                .trim()
                .to_string()
                .into();
        } else {
            debug!("Looking up provider api key from environment variable");
            provider.api_key = std::env::var(API_KEY_ENV)
                .with_context(|| {
                    format!("Failed to get provider api key from env variable {API_KEY_ENV}")
                })?
                .into();
        }
        if provider.api_key.expose_secret().is_empty() {
            return Err(anyhow!("The provider api key is empty"));
        }
        Ok(())
    }
}

/// Parse the environment named `envname` out of a yaml document that maps
/// environment names to configurations
pub(crate) fn parse(yaml: &str, envname: &str) -> Result<EnvConfig> {
    let mut configs: HashMap<String, EnvConfig> =
        serde_yaml::from_str(yaml).with_context(|| "Failed to parse configuration")?;
    configs
        .remove(envname)
        .ok_or_else(|| anyhow!("No configuration found for environment '{envname}'"))
}

/// Load and initialize the configuration for the environment `envname` from `path`
pub(crate) fn load(path: &Path, envname: &str) -> Result<EnvConfig> {
    debug!(?path, envname, "Loading configuration");
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
    let mut config = parse(&yaml, envname)?;
    config.init()?;
    Ok(config)
}
