use crate::{Error, Result, state::AppState};
use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    routing::get,
};
use axum_extra::extract::WithRejection;
use libweather::{
    empty_string_as_none,
    core::query::LimitSpec,
    statistics::LocationStatistics,
    weather::{Filter, WeatherData},
};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/weather-data/", get(list_weather_data))
        .route("/weather-data/statistics/", get(statistics))
        .route("/weather-data/{id}/", get(show_weather_data))
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    limit: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    offset: Option<u32>,
}

impl ListParams {
    fn limits(&self) -> Option<LimitSpec> {
        self.limit.map(|count| LimitSpec {
            count: i32::try_from(count).unwrap_or(i32::MAX),
            offset: self
                .offset
                .map(|offset| i32::try_from(offset).unwrap_or(i32::MAX)),
        })
    }
}

async fn list_weather_data(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, Error>,
) -> Result<Json<Vec<WeatherData>>> {
    let filter = params.location.map(|id| Filter::Location(id).into());
    let records = WeatherData::load_all(filter, params.limits(), &state.db).await?;
    Ok(Json(records))
}

async fn show_weather_data(
    WithRejection(Path(id), _): WithRejection<Path<i64>, Error>,
    State(state): State<AppState>,
) -> Result<Json<WeatherData>> {
    let record = WeatherData::load(id, &state.db)
        .await
        .map_err(Error::not_found(format!("no weather record with id {id}")))?;
    Ok(Json(record))
}

async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationStatistics>>> {
    Ok(Json(LocationStatistics::load_all(&state.db).await?))
}
