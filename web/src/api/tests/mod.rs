use crate::test_app;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use test_log::test;
use tower::Service;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

mod location;

fn api_url(path: &str) -> String {
    format!("{}{path}", crate::API_PREFIX)
}

async fn send(app: &mut Router, req: Request<Body>) -> Response<Body> {
    app.as_service()
        .call(req)
        .await
        .expect("Failed to execute request")
}

async fn get(app: &mut Router, path: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(api_url(path))
        .method("GET")
        .body(Body::empty())
        .expect("Failed to build request");
    send(app, req).await
}

async fn send_json(app: &mut Router, method: &str, path: &str, body: Value) -> Response<Body> {
    let req = Request::builder()
        .uri(api_url(path))
        .method(method)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request");
    send(app, req).await
}

async fn delete(app: &mut Router, path: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(api_url(path))
        .method("DELETE")
        .body(Body::empty())
        .expect("Failed to build request");
    send(app, req).await
}

/// consumes the response and parses its body as json
async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is not json")
}

async fn weather_row_count(pool: &Pool<Sqlite>) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM wd_weather_data")
        .fetch_one(pool)
        .await
        .expect("failed to count weather rows")
}

fn london_weather() -> Value {
    json!({
        "coord": {"lon": -0.12, "lat": 51.5},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {"temp": 15.2, "feels_like": 14.0, "humidity": 70, "pressure": 1012},
        "wind": {"speed": 3.1, "deg": 200},
        "name": "London"
    })
}

#[test(sqlx::test(migrations = "../db/migrations/"))]
async fn test_unknown_route(pool: Pool<Sqlite>) {
    let server = MockServer::start().await;
    let mut app = test_app(pool, &server.uri());
    let response = get(&mut app, "/nothing-here/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
