//! Objects to manage the historical weather samples recorded for each location
use crate::{
    Database,
    core::query::{DynFilterPart, LimitSpec, ToSql, filter::FilterPart},
    error::{Error, Result, check_length},
    location::Location,
    provider::CurrentConditions,
};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqliteQueryResult};
use time::OffsetDateTime;
use tracing::debug;

const MAX_DESCRIPTION_LENGTH: usize = 200;
const MAX_ICON_LENGTH: usize = 10;

/// A type for specifying fields that can be used for filtering a database query
/// for weather records
#[derive(Clone)]
pub enum Filter {
    /// Match the ID of the record to the given value
    Id(i64),

    /// Match the ID of the record's location to the given value
    Location(i64),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" W.wdid = ").push_bind(*id),
            Self::Location(id) => _ = builder.push(" W.locid = ").push_bind(*id),
        }
    }
}

/// A single historical weather sample for a location
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct WeatherData {
    #[sqlx(rename = "wdid")]
    pub id: i64,

    /// The ID of the location this sample was recorded for
    #[sqlx(rename = "locid")]
    pub location: i64,

    /// The name of the location this sample was recorded for
    #[sqlx(default)]
    #[serde(default)]
    pub location_name: String,

    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: i64,
    pub wind_speed: f64,
    pub description: String,
    pub icon: String,

    /// Assigned when the sample is inserted
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

impl WeatherData {
    fn build_query(
        filter: Option<DynFilterPart>,
        limit: Option<LimitSpec>,
    ) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            r#"SELECT W.wdid, W.locid, L.locname AS location_name, W.temperature,
            W.feels_like, W.humidity, W.pressure, W.wind_speed, W.description, W.icon,
            W.recorded_at
            FROM wd_weather_data W INNER JOIN wd_locations L ON L.locid=W.locid"#,
        );
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb.push(" ORDER BY W.recorded_at DESC, W.wdid DESC");
        if let Some(l) = limit {
            qb.push(" ");
            qb.push(l.to_sql());
        }
        qb
    }

    /// Creates a new, not yet inserted, sample of the given conditions at `location`
    pub fn new(location: &Location, conditions: CurrentConditions) -> Self {
        Self {
            id: -1,
            location: location.id,
            location_name: location.name.clone(),
            temperature: conditions.temperature,
            feels_like: conditions.feels_like,
            humidity: conditions.humidity,
            pressure: conditions.pressure,
            wind_speed: conditions.wind_speed,
            description: conditions.description,
            icon: conditions.icon,
            recorded_at: OffsetDateTime::now_utc(),
        }
    }

    pub async fn load(id: i64, db: &Database) -> Result<Self> {
        Self::build_query(Some(Filter::Id(id).into()), None)
            .build_query_as()
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Loads all matching samples from the database, most recent first
    pub async fn load_all(
        filter: Option<DynFilterPart>,
        limit: Option<LimitSpec>,
        db: &Database,
    ) -> Result<Vec<WeatherData>> {
        Self::build_query(filter, limit)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Check the field constraints of this sample
    pub fn validate(&self) -> Result<()> {
        check_length("description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        check_length("icon", &self.icon, MAX_ICON_LENGTH)
    }

    /// Add this sample to the database. The recording time is always the time
    /// of insertion. The referenced location must exist.
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != -1 {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        self.validate()?;

        let now = OffsetDateTime::now_utc();
        let res = sqlx::query(
            r#"INSERT INTO wd_weather_data
          (locid, temperature, feels_like, humidity, pressure, wind_speed, description, icon, recorded_at)
          VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(self.location)
        .bind(self.temperature)
        .bind(self.feels_like)
        .bind(self.humidity)
        .bind(self.pressure)
        .bind(self.wind_speed)
        .bind(&self.description)
        .bind(&self.icon)
        .bind(now)
        .execute(db.pool())
        .await?;
        self.id = res.last_insert_rowid();
        self.recorded_at = now;
        debug!(id = self.id, location = self.location, "Recorded weather sample");
        Ok(res)
    }
}
