//! Access to the external weather and geocoding provider.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod openweather;

pub use openweather::{ClientConfig, OpenWeatherClient};

/// The current conditions at a coordinate, as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// temperature in degrees Celsius
    pub temperature: f64,
    /// perceived temperature in degrees Celsius
    pub feels_like: f64,
    /// relative humidity in percent
    pub humidity: i64,
    /// atmospheric pressure in hPa
    pub pressure: i64,
    /// wind speed in m/s
    pub wind_speed: f64,
    pub description: String,
    /// the provider's short icon code, e.g. `01d`
    pub icon: String,
}

/// A single match from a city name lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Empty if the provider didn't report a state or region
    pub state: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("provider responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        // request urls carry the api key in their query string
        Self::Transport(value.without_url())
    }
}

/// A service that can report current weather conditions and look up cities by name
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetch the current conditions at the given coordinates
    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<CurrentConditions, ProviderError>;

    /// Look up at most `limit` cities matching the free-text query `city`
    async fn geocode(&self, city: &str, limit: u32) -> Result<Vec<City>, ProviderError>;
}
