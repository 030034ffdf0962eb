use super::*;
use test_log::test;

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_list_locations(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool, &server.uri());

    let response = get(&mut app, "/locations/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let locations = body.as_array().expect("expected a list");
    // newest first
    let ids: Vec<_> = locations.iter().map(|l| l["id"].as_i64()).collect();
    assert_eq!(ids, vec![Some(3), Some(2), Some(1)]);
    let counts: Vec<_> = locations
        .iter()
        .map(|l| l["weather_records_count"].as_i64())
        .collect();
    assert_eq!(counts, vec![Some(0), Some(1), Some(3)]);
    assert_eq!(locations[2]["name"], "London");
    assert_eq!(locations[2]["country"], "GB");

    let response = get(&mut app, "/locations/?is_active=false").await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["name"], "Reykjavik");

    // empty parameters are ignored
    let response = get(&mut app, "/locations/?is_active=&search=").await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    // matches either the name or the country
    let response = get(&mut app, "/locations/?search=par").await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["name"], "Paris");
    let response = get(&mut app, "/locations/?search=GB&is_active=true").await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["name"], "London");

    // wildcard characters are matched literally
    for search in ["_", "%25", "%5C"] {
        let response = get(&mut app, &format!("/locations/?search={search}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]), "search={search}");
    }

    let response = get(&mut app, "/locations/?is_active=maybe").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_create_location(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool, &server.uri());

    let response = send_json(
        &mut app,
        "POST",
        "/locations/",
        json!({"name": "Oslo", "country": "NO", "latitude": 59.91, "longitude": 10.75}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "Oslo");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["weather_records_count"], 0);
    assert_eq!(created["created_at"], created["updated_at"]);
    let id = created["id"].as_i64().expect("no id");

    let response = get(&mut app, &format!("/locations/{id}/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored["name"], "Oslo");
    assert_eq!(stored["country"], "NO");
    assert_eq!(stored["longitude"], 10.75);

    // missing required field
    let response = send_json(
        &mut app,
        "POST",
        "/locations/",
        json!({"name": "Oslo", "latitude": 59.91, "longitude": 10.75}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some_and(|e| e.contains("country")));

    // blank name
    let response = send_json(
        &mut app,
        "POST",
        "/locations/",
        json!({"name": "  ", "country": "NO", "latitude": 59.91, "longitude": 10.75}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // wrong type
    let response = send_json(
        &mut app,
        "POST",
        "/locations/",
        json!({"name": "Oslo", "country": "NO", "latitude": "north", "longitude": 10.75}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = get(&mut app, "/locations/").await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_show_location(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool, &server.uri());

    let response = get(&mut app, "/locations/1/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "London");
    assert_eq!(body["weather_records_count"], 3);

    let response = get(&mut app, "/locations/99/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());

    // an id that isn't a number can't match anything
    for uri in [
        "/locations/abc/",
        "/locations/abc/current_weather/",
        "/weather-data/abc/",
    ] {
        let response = get(&mut app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {uri}");
        assert!(body_json(response).await["error"].is_string());
    }
    let response = send_json(&mut app, "PATCH", "/locations/abc/", json!({"name": "Nowhere"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = delete(&mut app, "/locations/abc/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"].is_string());
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations"))
))]
async fn test_update_location(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool, &server.uri());

    let before = body_json(get(&mut app, "/locations/2/").await).await;

    // PATCH only touches the given fields
    let response = send_json(&mut app, "PATCH", "/locations/2/", json!({"is_active": false})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let patched = body_json(response).await;
    assert_eq!(patched["is_active"], false);
    assert_eq!(patched["name"], "Paris");
    assert_eq!(patched["latitude"], before["latitude"]);
    assert_eq!(patched["created_at"], before["created_at"]);
    assert_ne!(patched["updated_at"], before["updated_at"]);

    // PUT needs every required field
    let response = send_json(&mut app, "PUT", "/locations/2/", json!({"name": "Lyon"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = send_json(
        &mut app,
        "PUT",
        "/locations/2/",
        json!({"name": "Lyon", "country": "FR", "latitude": 45.76, "longitude": 4.84}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let replaced = body_json(response).await;
    assert_eq!(replaced["name"], "Lyon");
    assert_eq!(replaced["latitude"], 45.76);
    // unchanged when not given
    assert_eq!(replaced["is_active"], false);

    let response = send_json(&mut app, "PATCH", "/locations/2/", json!({"country": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let stored = body_json(get(&mut app, "/locations/2/").await).await;
    assert_eq!(stored["country"], "FR");

    let response = send_json(&mut app, "PATCH", "/locations/99/", json!({"name": "Nowhere"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_delete_location(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool.clone(), &server.uri());

    assert_eq!(weather_row_count(&pool).await, 4);
    let response = delete(&mut app, "/locations/1/").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get(&mut app, "/locations/1/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // the location's weather records are gone too
    assert_eq!(weather_row_count(&pool).await, 1);
    let response = get(&mut app, "/weather-data/1/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(&mut app, "/locations/1/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_current_weather(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "testkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_weather()))
        .expect(1)
        .mount(&server)
        .await;
    let mut app = test_app(pool.clone(), &server.uri());

    let response = get(&mut app, "/locations/1/current_weather/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "location": "London",
            "temperature": 15.2,
            "feels_like": 14.0,
            "humidity": 70,
            "pressure": 1012,
            "wind_speed": 3.1,
            "description": "clear sky",
            "icon": "01d",
        })
    );
    assert_eq!(weather_row_count(&pool).await, 5);

    let latest = body_json(get(&mut app, "/weather-data/?location=1&limit=1").await).await;
    assert_eq!(latest[0]["id"], 5);
    assert_eq!(latest[0]["temperature"], 15.2);
    assert_eq!(latest[0]["location_name"], "London");

    let location = body_json(get(&mut app, "/locations/1/").await).await;
    assert_eq!(location["weather_records_count"], 4);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_current_weather_unknown_location(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_weather()))
        .expect(0)
        .mount(&server)
        .await;
    let mut app = test_app(pool.clone(), &server.uri());

    let response = get(&mut app, "/locations/99/current_weather/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(weather_row_count(&pool).await, 4);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations", "weather"))
))]
async fn test_current_weather_provider_failure(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "48.8566"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Paris"})))
        .mount(&server)
        .await;
    let mut app = test_app(pool.clone(), &server.uri());

    let response = get(&mut app, "/locations/1/current_weather/").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    let message = body["error"].as_str().expect("no error message");
    assert!(message.starts_with("Failed to fetch weather data: "));
    assert!(!message.contains("testkey"));

    // a body without the expected fields
    let response = get(&mut app, "/locations/2/current_weather/").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(weather_row_count(&pool).await, 4);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations"))
))]
async fn test_current_weather_oversized_values(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut body = london_weather();
    body["weather"][0]["icon"] = json!("an-icon-code-that-is-far-too-long");
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    let mut app = test_app(pool.clone(), &server.uri());

    let response = get(&mut app, "/locations/1/current_weather/").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(weather_row_count(&pool).await, 0);
}

#[test(sqlx::test(
    migrations = "../db/migrations/",
    fixtures(path = "../../../../db/fixtures", scripts("locations"))
))]
async fn test_current_weather_timeout(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(london_weather())
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let mut app = test_app(pool.clone(), &server.uri());

    let response = get(&mut app, "/locations/1/current_weather/").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(weather_row_count(&pool).await, 0);
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_search_city(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "London"))
        .and(query_param("limit", "5"))
        .and(query_param("appid", "testkey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "London", "lat": 51.5073, "lon": -0.1276, "country": "GB"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    let mut app = test_app(pool, &server.uri());

    let response = get(&mut app, "/locations/search_city/?city=London").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([{
            "name": "London",
            "country": "GB",
            "latitude": 51.5073,
            "longitude": -0.1276,
            "state": "",
        }])
    );
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_search_city_missing_param(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let mut app = test_app(pool, &server.uri());

    let response = get(&mut app, "/locations/search_city/").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = get(&mut app, "/locations/search_city/?city=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_search_city_provider_failure(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;
    let mut app = test_app(pool, &server.uri());

    let response = get(&mut app, "/locations/search_city/?city=London").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("Failed to search city: "))
    );
}
