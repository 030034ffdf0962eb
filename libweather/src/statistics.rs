//! Aggregate weather statistics per location
use crate::{Database, error::Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics of all weather samples recorded for a single location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStatistics {
    /// The name of the location
    pub name: String,
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub avg_humidity: f64,
    pub total_records: i64,
}

/// The subset of a weather record that contributes to [LocationStatistics]
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Sample {
    #[sqlx(rename = "locid")]
    pub location: i64,
    #[sqlx(rename = "locname")]
    pub location_name: String,
    pub temperature: f64,
    pub humidity: i64,
}

struct Accumulator {
    name: String,
    count: i64,
    temperature_sum: f64,
    humidity_sum: f64,
    max_temperature: f64,
    min_temperature: f64,
}

impl Accumulator {
    fn new(name: String) -> Self {
        Self {
            name,
            count: 0,
            temperature_sum: 0.0,
            humidity_sum: 0.0,
            max_temperature: f64::NEG_INFINITY,
            min_temperature: f64::INFINITY,
        }
    }

    fn add(&mut self, sample: &Sample) {
        self.count += 1;
        self.temperature_sum += sample.temperature;
        self.humidity_sum += sample.humidity as f64;
        self.max_temperature = self.max_temperature.max(sample.temperature);
        self.min_temperature = self.min_temperature.min(sample.temperature);
    }

    fn finish(self) -> LocationStatistics {
        let n = self.count as f64;
        LocationStatistics {
            name: self.name,
            avg_temperature: self.temperature_sum / n,
            max_temperature: self.max_temperature,
            min_temperature: self.min_temperature,
            avg_humidity: self.humidity_sum / n,
            total_records: self.count,
        }
    }
}

/// Fold a collection of samples into one [LocationStatistics] per location.
/// Locations without any samples can't appear in the output. The result is
/// ordered by location id.
pub fn summarize<I>(samples: I) -> Vec<LocationStatistics>
where
    I: IntoIterator<Item = Sample>,
{
    let mut groups: BTreeMap<i64, Accumulator> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.location)
            .or_insert_with(|| Accumulator::new(sample.location_name.clone()))
            .add(&sample);
    }
    groups.into_values().map(Accumulator::finish).collect()
}

impl LocationStatistics {
    /// Compute statistics for every location that has at least one weather record
    pub async fn load_all(db: &Database) -> Result<Vec<LocationStatistics>> {
        let samples: Vec<Sample> = sqlx::query_as(
            r#"SELECT W.locid, L.locname, W.temperature, W.humidity
            FROM wd_weather_data W INNER JOIN wd_locations L ON L.locid=W.locid"#,
        )
        .fetch_all(db.pool())
        .await?;
        Ok(summarize(samples))
    }
}
