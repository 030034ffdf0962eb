//! Objects to manage the locations that are tracked for weather data
use crate::{
    Database,
    core::{
        loadable::Loadable,
        query::{
            DynFilterPart,
            filter::{FilterPart, LIKE_ESCAPE, like_pattern},
        },
    },
    error::{Error, Result, check_text},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqliteQueryResult};
use time::OffsetDateTime;
use tracing::debug;

const MAX_NAME_LENGTH: usize = 100;
const MAX_COUNTRY_LENGTH: usize = 100;

/// A type for specifying fields that can be used for filtering a database query
/// for locations
#[derive(Clone)]
pub enum Filter {
    /// Match the ID of the location to the given value
    Id(i64),

    /// Match locations that are (or are not) actively tracked
    Active(bool),

    /// Match locations whose name contains the given text, ignoring ASCII case
    NameContains(String),

    /// Match locations whose country contains the given text, ignoring ASCII case
    CountryContains(String),
}

impl FilterPart for Filter {
    fn add_to_query(&self, builder: &mut sqlx::QueryBuilder<sqlx::Sqlite>) {
        match self {
            Self::Id(id) => _ = builder.push(" L.locid = ").push_bind(*id),
            Self::Active(active) => _ = builder.push(" L.is_active = ").push_bind(*active),
            Self::NameContains(frag) => {
                builder
                    .push(" L.locname LIKE ")
                    .push_bind(like_pattern(frag))
                    .push(LIKE_ESCAPE);
            }
            Self::CountryContains(frag) => {
                builder
                    .push(" L.country LIKE ")
                    .push_bind(like_pattern(frag))
                    .push(LIKE_ESCAPE);
            }
        }
    }
}

/// A geographic point that the user wants to track weather data for
#[derive(Debug, sqlx::FromRow, Deserialize, Serialize, PartialEq, Clone)]
pub struct Location {
    /// A unique ID that identifies this location in the database
    #[sqlx(rename = "locid")]
    pub id: i64,

    /// The name of the city or place
    #[sqlx(rename = "locname")]
    pub name: String,

    pub country: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Set once when the location is inserted
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Set whenever the location is inserted or updated
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,

    /// Whether the location is actively tracked
    pub is_active: bool,

    /// The number of weather records stored for this location. This is
    /// computed when the location is loaded and is always zero for a location
    /// that hasn't been inserted yet.
    #[sqlx(default)]
    #[serde(default)]
    pub weather_records_count: i64,
}

#[async_trait]
impl Loadable for Location {
    type Id = i64;

    fn invalid_id() -> Self::Id {
        -1
    }

    fn id(&self) -> Self::Id {
        self.id
    }

    fn set_id(&mut self, id: Self::Id) {
        self.id = id
    }

    async fn load(id: Self::Id, db: &Database) -> Result<Self> {
        Self::build_query(Some(Filter::Id(id).into()))
            .build_query_as()
            .fetch_one(db.pool())
            .await
            .map_err(|e| e.into())
    }

    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult> {
        // weather records are removed by the ON DELETE CASCADE foreign key
        sqlx::query(r#"DELETE FROM wd_locations WHERE locid=?1"#)
            .bind(id)
            .execute(db.pool())
            .await
            .map_err(Error::from)
            .and_then(|r| {
                if r.rows_affected() == 0 {
                    Err(Error::DatabaseError(sqlx::Error::RowNotFound))
                } else {
                    Ok(r)
                }
            })
    }
}

impl Location {
    fn build_query(filter: Option<DynFilterPart>) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new(
            r#"SELECT L.locid, L.locname, L.country, L.latitude, L.longitude,
            L.created_at, L.updated_at, L.is_active,
            (SELECT COUNT(*) FROM wd_weather_data W WHERE W.locid=L.locid) AS weather_records_count
            FROM wd_locations L"#,
        );
        if let Some(f) = filter {
            qb.push(" WHERE ");
            f.add_to_query(&mut qb);
        }
        qb.push(" ORDER BY L.created_at DESC, L.locid DESC");
        qb
    }

    /// Loads all matching locations from the database, newest first
    pub async fn load_all(filter: Option<DynFilterPart>, db: &Database) -> Result<Vec<Location>> {
        Self::build_query(filter)
            .build_query_as()
            .fetch_all(db.pool())
            .await
            .map_err(|e| e.into())
    }

    /// Creates a new location object with the given data. It will initially have
    /// an invalid ID until it is inserted into the database
    pub fn new(name: String, country: String, latitude: f64, longitude: f64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Self::invalid_id(),
            name,
            country,
            latitude,
            longitude,
            created_at: now,
            updated_at: now,
            is_active: true,
            weather_records_count: 0,
        }
    }

    /// Check the field constraints of this location
    pub fn validate(&self) -> Result<()> {
        check_text("name", &self.name, MAX_NAME_LENGTH)?;
        check_text("country", &self.country, MAX_COUNTRY_LENGTH)?;
        if !self.latitude.is_finite() {
            return Err(Error::Validation {
                field: "latitude",
                message: "a valid number is required".to_string(),
            });
        }
        if !self.longitude.is_finite() {
            return Err(Error::Validation {
                field: "longitude",
                message: "a valid number is required".to_string(),
            });
        }
        Ok(())
    }

    /// Add this location to the database. If this call completes successfully,
    /// the id of this object will be updated to the ID of the inserted row and
    /// both timestamps are set to the time of insertion.
    pub async fn insert(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id != Self::invalid_id() {
            return Err(Error::InvalidInsertObjectAlreadyExists(self.id));
        }
        self.validate()?;

        let now = OffsetDateTime::now_utc();
        let res = sqlx::query(
            r#"INSERT INTO wd_locations
          (locname, country, latitude, longitude, created_at, updated_at, is_active)
          VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&self.name)
        .bind(&self.country)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(now)
        .bind(now)
        .bind(self.is_active)
        .execute(db.pool())
        .await?;
        self.id = res.last_insert_rowid();
        self.created_at = now;
        self.updated_at = now;
        self.weather_records_count = 0;
        debug!(id = self.id, name = %self.name, "Inserted location");
        Ok(res)
    }

    /// Update the location in the database such that it matches this object.
    /// The modification timestamp is refreshed on every call.
    pub async fn update(&mut self, db: &Database) -> Result<SqliteQueryResult> {
        if self.id < 0 {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        self.validate()?;

        let now = OffsetDateTime::now_utc();
        let res = sqlx::query(
            "UPDATE wd_locations SET locname=?, country=?, latitude=?, longitude=?, is_active=?, updated_at=? WHERE locid=?",
        )
        .bind(&self.name)
        .bind(&self.country)
        .bind(self.latitude)
        .bind(self.longitude)
        .bind(self.is_active)
        .bind(now)
        .bind(self.id)
        .execute(db.pool())
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::DatabaseError(sqlx::Error::RowNotFound));
        }
        self.updated_at = now;
        Ok(res)
    }
}

/// The writable fields of a location, as submitted by a client. Any field may
/// be missing; which ones are required depends on the kind of write.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
pub struct LocationInput {
    pub name: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: Option<bool>,
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T> {
    value.ok_or(Error::Validation {
        field,
        message: "this field is required".to_string(),
    })
}

impl LocationInput {
    /// Build a new, not yet inserted, location. All fields except `is_active`
    /// are required.
    pub fn into_location(self) -> Result<Location> {
        let mut loc = Location::new(
            required("name", self.name)?,
            required("country", self.country)?,
            required("latitude", self.latitude)?,
            required("longitude", self.longitude)?,
        );
        if let Some(active) = self.is_active {
            loc.is_active = active;
        }
        loc.validate()?;
        Ok(loc)
    }

    /// Replace the writable fields of `loc`. All fields except `is_active` are
    /// required; a missing `is_active` leaves the current value unchanged.
    pub fn replace(self, loc: &mut Location) -> Result<()> {
        let name = required("name", self.name)?;
        let country = required("country", self.country)?;
        let latitude = required("latitude", self.latitude)?;
        let longitude = required("longitude", self.longitude)?;
        loc.name = name;
        loc.country = country;
        loc.latitude = latitude;
        loc.longitude = longitude;
        if let Some(active) = self.is_active {
            loc.is_active = active;
        }
        loc.validate()
    }

    /// Modify only the fields of `loc` that were given
    pub fn merge(self, loc: &mut Location) -> Result<()> {
        if let Some(name) = self.name {
            loc.name = name;
        }
        if let Some(country) = self.country {
            loc.country = country;
        }
        if let Some(n) = self.latitude {
            loc.latitude = n;
        }
        if let Some(n) = self.longitude {
            loc.longitude = n;
        }
        if let Some(active) = self.is_active {
            loc.is_active = active;
        }
        loc.validate()
    }
}
