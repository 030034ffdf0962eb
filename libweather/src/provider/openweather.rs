use super::{City, CurrentConditions, ProviderError, WeatherProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEOCODING_URL: &str = "http://api.openweathermap.org/geo/1.0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_BODY_EXCERPT: usize = 200;

/// Endpoint and timeout settings for [OpenWeatherClient]
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base url of the current weather api, without a trailing slash
    pub base_url: String,
    /// Base url of the geocoding api, without a trailing slash
    pub geocoding_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A [WeatherProvider] backed by the OpenWeatherMap current weather and
/// direct geocoding apis
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: Client,
    api_key: String,
    config: ClientConfig,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("api_key", &"<redacted>")
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: i64,
    pressure: i64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    wind: OwWind,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    country: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    state: Option<String>,
}

impl TryFrom<OwCurrentResponse> for CurrentConditions {
    type Error = ProviderError;

    fn try_from(value: OwCurrentResponse) -> Result<Self, Self::Error> {
        let weather = value
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("missing field `weather[0]`".to_string()))?;
        Ok(CurrentConditions {
            temperature: value.main.temp,
            feels_like: value.main.feels_like,
            humidity: value.main.humidity,
            pressure: value.main.pressure,
            wind_speed: value.wind.speed,
            description: weather.description,
            icon: weather.icon,
        })
    }
}

impl From<OwGeoEntry> for City {
    fn from(value: OwGeoEntry) -> Self {
        City {
            name: value.name,
            country: value.country,
            latitude: value.lat,
            longitude: value.lon,
            state: value.state.unwrap_or_default(),
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_BODY_EXCERPT {
        body.chars().take(MAX_BODY_EXCERPT).collect::<String>() + "..."
    } else {
        body.to_string()
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: String, config: ClientConfig) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let res = self
            .http
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                let e = ProviderError::from(e);
                warn!(url, "Request to weather provider failed: {e}");
                e
            })?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            warn!(url, %status, "Weather provider returned an error status");
            return Err(ProviderError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, ProviderError> {
        debug!(latitude, longitude, "Fetching current weather");
        let url = format!("{}/weather", self.config.base_url);
        let parsed: OwCurrentResponse = self
            .get_json(
                &url,
                &[
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("units", "metric".to_string()),
                ],
            )
            .await?;
        parsed.try_into()
    }

    async fn geocode(&self, city: &str, limit: u32) -> Result<Vec<City>, ProviderError> {
        debug!(city, limit, "Looking up city");
        let url = format!("{}/direct", self.config.geocoding_url);
        let entries: Vec<OwGeoEntry> = self
            .get_json(&url, &[("q", city.to_string()), ("limit", limit.to_string())])
            .await?;
        Ok(entries.into_iter().map(City::from).collect())
    }
}
