use crate::config::EnvConfig;
use anyhow::{Context, Result};
use libweather::{
    Database,
    provider::{OpenWeatherClient, WeatherProvider},
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, trace};

const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug)]
pub struct SharedState {
    pub db: Database,
    pub provider: Arc<dyn WeatherProvider>,
    pub config: EnvConfig,
}

impl SharedState {
    pub async fn new(env: EnvConfig) -> Result<Self> {
        trace!("Creating shared app state");
        let db = if env.database == IN_MEMORY_DATABASE {
            debug!("Using a temporary in-memory database");
            Database::open_in_memory().await
        } else {
            Database::open(&env.database).await
        }
        .with_context(|| format!("Unable to open database {}", &env.database))?;

        let client_config = env.provider.client_config();
        debug!(?client_config, "Creating weather provider client");
        let provider = OpenWeatherClient::new(
            env.provider.api_key.expose_secret().to_string(),
            client_config,
        )
        .with_context(|| "Unable to create weather provider client")?;

        Ok(Self {
            db,
            provider: Arc::new(provider),
            config: env,
        })
    }

    /// Shared state for tests, talking to a provider mock at `provider_uri`
    #[cfg(test)]
    pub fn test(pool: sqlx::Pool<sqlx::Sqlite>, provider_uri: &str) -> Self {
        use crate::config::{ListenConfig, ProviderConfig};

        debug!("Creating test shared app state");
        let config = EnvConfig {
            listen: ListenConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: "test-database.sqlite".to_string(),
            provider: ProviderConfig {
                base_url: format!("{provider_uri}/data/2.5"),
                geocoding_url: format!("{provider_uri}/geo/1.0"),
                timeout: Some(1),
                api_key_file: String::new(),
                api_key: "testkey".to_string().into(),
            },
        };
        let provider = OpenWeatherClient::new(
            config.provider.api_key.expose_secret().to_string(),
            config.provider.client_config(),
        )
        .expect("failed to create provider client");
        Self {
            db: Database::from(pool),
            provider: Arc::new(provider),
            config,
        }
    }
}

pub type AppState = Arc<SharedState>;
