//! API integration tests
//!
//! Drive the full router in process against the in-memory backend.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local, NaiveDateTime};
use serde_json::{json, Value};
use tower::ServiceExt;

use shareit_server::{
    api::{self, SHARER_USER_ID},
    repository::Repository,
    services::Services,
    AppState,
};

fn app() -> Router {
    let state = AppState {
        services: Arc::new(Services::new(Repository::in_memory())),
    };
    api::create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user {
        builder = builder.header(SHARER_USER_ID, id.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!("{} answered a non-JSON body ({}): {}", uri, e, String::from_utf8_lossy(&bytes))
        })
    };
    (status, value)
}

async fn create_user(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/users",
        None,
        Some(json!({"name": name, "email": format!("{}@example.com", name.to_lowercase())})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

async fn create_item(app: &Router, owner: i64, name: &str, description: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/items",
        Some(owner),
        Some(json!({"name": name, "description": description, "available": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

fn from_now(offset: Duration) -> NaiveDateTime {
    Local::now().naive_local() + offset
}

async fn book(app: &Router, booker: i64, item: i64, start: NaiveDateTime, end: NaiveDateTime) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/bookings",
        Some(booker),
        Some(json!({"itemId": item, "start": start, "end": end})),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/bookings/{id}"].is_object());
}

#[tokio::test]
async fn test_user_lifecycle() {
    let app = app();
    let id = create_user(&app, "Alice").await;

    let (status, body) = send(&app, Method::GET, &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": id, "name": "Alice", "email": "alice@example.com"}));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/users/{}", id),
        None,
        Some(json!({"name": "Alicia"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alicia");
    assert_eq!(body["email"], "alice@example.com");

    let (status, body) = send(&app, Method::GET, "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &format!("/users/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_user_validation_and_duplicates() {
    let app = app();
    create_user(&app, "Alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/users",
        None,
        Some(json!({"name": "Other", "email": "ALICE@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for body in [
        json!({"name": "Bob", "email": "not-an-email"}),
        json!({"name": "  ", "email": "bob@example.com"}),
        json!({"name": "Bob"}),
    ] {
        let (status, body) = send(&app, Method::POST, "/users", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_sharer_header_is_required() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/items", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri("/bookings")
        .header(SHARER_USER_ID, "abc")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_parameters_use_json_errors() {
    let app = app();
    let owner = create_user(&app, "Owner").await;
    let booker = create_user(&app, "Booker").await;
    let drill = create_item(&app, owner, "Drill", "Cordless drill").await;
    let (_, booking) = book(
        &app,
        booker,
        drill,
        from_now(Duration::days(1)),
        from_now(Duration::days(2)),
    )
    .await;
    let id = booking["id"].as_i64().unwrap();

    for (method, uri, user) in [
        (Method::PATCH, format!("/bookings/{}", id), Some(owner)),
        (Method::PATCH, format!("/bookings/{}?approved=maybe", id), Some(owner)),
        (Method::GET, "/items/xyz".to_string(), Some(owner)),
        (Method::GET, "/users/xyz".to_string(), None),
        (Method::GET, "/bookings/xyz".to_string(), Some(booker)),
        (Method::GET, "/items?from=abc".to_string(), Some(owner)),
        (Method::GET, "/items/search?text=drill&size=many".to_string(), None),
        (Method::GET, "/bookings/owner?from=abc".to_string(), Some(owner)),
        (Method::GET, "/requests/all?size=abc".to_string(), Some(owner)),
    ] {
        let (status, body) = send(&app, method, &uri, user, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{} -> {}", uri, body);
    }

    // The booking is untouched by the rejected decisions
    let (status, body) = send(&app, Method::GET, &format!("/bookings/{}", id), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "WAITING");
}

#[tokio::test]
async fn test_item_catalog() {
    let app = app();
    let owner = create_user(&app, "Owner").await;
    let other = create_user(&app, "Other").await;
    let drill = create_item(&app, owner, "Drill", "Cordless drill").await;
    create_item(&app, owner, "Saw", "Hand saw").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/items",
        Some(owner),
        Some(json!({"name": "Hammer", "description": "Claw hammer"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/items/{}", drill),
        Some(other),
        Some(json!({"name": "Stolen"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/items/{}", drill),
        Some(owner),
        Some(json!({"available": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], false);
    assert_eq!(body["name"], "Drill");

    let (status, body) = send(&app, Method::GET, "/items?from=0&size=1", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], drill);
    assert!(items[0]["comments"].as_array().unwrap().is_empty());
    assert!(items[0]["lastBooking"].is_null());

    let (status, _) = send(&app, Method::GET, "/items?size=0", Some(owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, "/items/search?text=SAW", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["ownerId"], owner);

    // Unavailable items are not found by search
    let (_, body) = send(&app, Method::GET, "/items/search?text=drill", None, None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = send(&app, Method::GET, "/items/search?text=", None, None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::DELETE, &format!("/items/{}", drill), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/items/{}", drill), Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_flow() {
    let app = app();
    let owner = create_user(&app, "Owner").await;
    let booker = create_user(&app, "Booker").await;
    let drill = create_item(&app, owner, "Drill", "Cordless drill").await;

    let start = from_now(Duration::days(1));
    let end = from_now(Duration::days(2));

    let (status, _) = book(&app, owner, drill, start, end).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = book(&app, booker, drill, from_now(Duration::days(-1)), end).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = book(&app, booker, drill, end, start).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, booking) = book(&app, booker, drill, start, end).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "WAITING");
    assert_eq!(booking["booker"]["id"], booker);
    assert_eq!(booking["item"], json!({"id": drill, "name": "Drill"}));
    let id = booking["id"].as_i64().unwrap();

    let uri = format!("/bookings/{}?approved=true", id);
    let (status, _) = send(&app, Method::PATCH, &uri, Some(booker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, _) = send(&app, Method::PATCH, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::GET, &format!("/bookings/{}", id), Some(booker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);

    let (status, body) = send(&app, Method::GET, "/bookings?state=future", Some(booker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/bookings/owner?state=PAST", Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::GET, "/bookings?state=SOMETIME", Some(booker), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown state: SOMETIME");

    let (_, item) = send(&app, Method::GET, &format!("/items/{}", drill), Some(owner), None).await;
    assert_eq!(item["nextBooking"], json!({"id": id, "bookerId": booker}));
    let (_, item) = send(&app, Method::GET, &format!("/items/{}", drill), Some(booker), None).await;
    assert!(item["nextBooking"].is_null());
}

#[tokio::test]
async fn test_comment_after_completed_booking() {
    let app = app();
    let owner = create_user(&app, "Owner").await;
    let booker = create_user(&app, "Booker").await;
    let drill = create_item(&app, owner, "Drill", "Cordless drill").await;
    let comment_uri = format!("/items/{}/comment", drill);

    let (status, _) = send(
        &app,
        Method::POST,
        &comment_uri,
        Some(booker),
        Some(json!({"text": "Great"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let start = from_now(Duration::milliseconds(500));
    let end = from_now(Duration::milliseconds(1000));
    let (status, booking) = book(&app, booker, drill, start, end).await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/bookings/{}?approved=true", booking["id"]);
    let (status, _) = send(&app, Method::PATCH, &uri, Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    let (status, comment) = send(
        &app,
        Method::POST,
        &comment_uri,
        Some(booker),
        Some(json!({"text": "Great"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["authorName"], "Booker");
    assert_eq!(comment["itemId"], drill);

    let (_, item) = send(&app, Method::GET, &format!("/items/{}", drill), Some(owner), None).await;
    assert_eq!(item["comments"].as_array().unwrap().len(), 1);
    assert_eq!(item["lastBooking"]["bookerId"], booker);
}

#[tokio::test]
async fn test_item_requests() {
    let app = app();
    let alice = create_user(&app, "Alice").await;
    let bob = create_user(&app, "Bob").await;

    let (status, request) = send(
        &app,
        Method::POST,
        "/requests",
        Some(alice),
        Some(json!({"description": "Need a ladder"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/requests",
        Some(alice),
        Some(json!({"description": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, item) = send(
        &app,
        Method::POST,
        "/items",
        Some(bob),
        Some(json!({
            "name": "Ladder",
            "description": "Three metres",
            "available": true,
            "requestId": request_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["requestId"], request_id);

    let (status, body) = send(&app, Method::GET, "/requests", Some(alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["items"][0]["name"], "Ladder");

    let (_, body) = send(&app, Method::GET, "/requests/all", Some(alice), None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = send(&app, Method::GET, "/requests/all?from=0&size=5", Some(bob), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, &format!("/requests/{}", request_id), Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Need a ladder");

    let (status, _) = send(&app, Method::GET, "/requests/999", Some(bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
