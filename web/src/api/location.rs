use crate::{Error, Result, state::AppState};
use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_extra::extract::WithRejection;
use libweather::{
    Database, empty_string_as_none,
    core::{
        loadable::Loadable,
        query::filter::{and, or},
    },
    location::{Filter, Location, LocationInput},
    provider::{City, CurrentConditions, ProviderError},
    weather::WeatherData,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// maximum number of matches returned by a city search
const SEARCH_LIMIT: u32 = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations/", get(list_locations).post(add_location))
        .route("/locations/search_city/", get(search_city))
        .route(
            "/locations/{id}/",
            get(show_location)
                .put(replace_location)
                .patch(modify_location)
                .delete(delete_location),
        )
        .route("/locations/{id}/current_weather/", get(current_weather))
}

async fn load_location(id: i64, db: &Database) -> Result<Location> {
    Location::load(id, db)
        .await
        .map_err(Error::not_found(format!("no location with id {id}")))
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<bool>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    search: Option<String>,
}

async fn list_locations(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, Error>,
) -> Result<Json<Vec<Location>>> {
    let mut fbuilder = and();
    if let Some(active) = params.is_active {
        fbuilder = fbuilder.push(Filter::Active(active));
    }
    if let Some(search) = params.search {
        fbuilder = fbuilder.push(
            or().push(Filter::NameContains(search.clone()))
                .push(Filter::CountryContains(search))
                .build(),
        );
    }
    let filter = (!fbuilder.is_empty()).then(|| fbuilder.build());
    let locations = Location::load_all(filter, &state.db).await?;
    Ok(Json(locations))
}

async fn show_location(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
) -> Result<Json<Location>> {
    Ok(Json(load_location(id, &state.db).await?))
}

async fn add_location(
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<LocationInput>, Error>,
) -> Result<(StatusCode, Json<Location>)> {
    let mut location = input.into_location()?;
    location.insert(&state.db).await?;
    info!(id = location.id, name = %location.name, "Added location");
    Ok((StatusCode::CREATED, Json(location)))
}

async fn replace_location(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<LocationInput>, Error>,
) -> Result<Json<Location>> {
    let mut location = load_location(id, &state.db).await?;
    input.replace(&mut location)?;
    location.update(&state.db).await?;
    Ok(Json(location))
}

async fn modify_location(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<LocationInput>, Error>,
) -> Result<Json<Location>> {
    let mut location = load_location(id, &state.db).await?;
    input.merge(&mut location)?;
    location.update(&state.db).await?;
    Ok(Json(location))
}

async fn delete_location(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    Location::delete_id(&id, &state.db)
        .await
        .map_err(Error::not_found(format!("no location with id {id}")))?;
    info!(id, "Deleted location");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize, Debug)]
struct CurrentWeather {
    /// the name of the location
    location: String,
    #[serde(flatten)]
    conditions: CurrentConditions,
}

/// Fetch the current conditions at a location from the provider, store them
/// as a new weather record and return them. Nothing is stored unless the
/// whole fetch succeeds.
async fn current_weather(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
) -> Result<Json<CurrentWeather>> {
    const CONTEXT: &str = "Failed to fetch weather data";

    let location = load_location(id, &state.db).await?;
    let conditions = state
        .provider
        .fetch_current(location.latitude, location.longitude)
        .await
        .map_err(Error::provider(CONTEXT))?;

    let mut record = WeatherData::new(&location, conditions.clone());
    // values that don't fit the weather record are a bad payload, not a bad request
    record
        .validate()
        .map_err(|e| Error::provider(CONTEXT)(ProviderError::Malformed(e.to_string())))?;
    record.insert(&state.db).await?;
    info!(
        location = location.id,
        record = record.id,
        "Recorded current weather"
    );

    Ok(Json(CurrentWeather {
        location: location.name,
        conditions,
    }))
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    city: Option<String>,
}

async fn search_city(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<SearchParams>, Error>,
) -> Result<Json<Vec<City>>> {
    let city = params
        .city
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::RequiredParameterMissing("city".to_string()))?;
    let cities = state
        .provider
        .geocode(&city, SEARCH_LIMIT)
        .await
        .map_err(Error::provider("Failed to search city"))?;
    Ok(Json(cities))
}
