use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use perch_api::{
    app,
    state::{AppState, AuthConfig},
};
use perch_core::MemoryStore;

const MORNING: &str = "from_date=2026-03-02&from_time=09:00&to_date=2026-03-02&to_time=10:00";

fn test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        store.clone(),
        store,
        AuthConfig {
            secret: "test-secret".into(),
            expiration: 3600,
        },
        60,
    );
    app(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router, email: &str, name: &str) -> String {
    let response = send(
        app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "email": email, "name": name })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn availability(app: &Router, token: &str) -> Value {
    let response = send(
        app,
        Method::GET,
        &format!("/v1/desks/availability?{MORNING}"),
        Some(token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn desk<'a>(listing: &'a Value, id: &str) -> &'a Value {
    listing
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"] == id)
        .unwrap()
}

fn hold_body(desk_id: &str) -> Value {
    json!({
        "desk_id": desk_id,
        "from_date": "2026-03-02",
        "from_time": "09:00",
        "to_date": "2026-03-02",
        "to_time": "10:00",
    })
}

#[tokio::test]
async fn full_reservation_flow() {
    let app = test_app();
    let ada = login(&app, "ada@example.com", "Ada").await;
    let bea = login(&app, "bea@example.com", "Bea").await;

    // Seed the floor plan.
    let response = send(&app, Method::POST, "/v1/admin/desks/seed", Some(&ada), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["created"], 12);

    // Everything starts free.
    let listing = availability(&app, &ada).await;
    assert_eq!(listing.as_array().unwrap().len(), 12);
    assert_eq!(desk(&listing, "desk-1")["status"]["kind"], "free");

    // Ada holds desk-1; she sees it as her own, Bea sees it blocked.
    let response = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(&ada),
        Some(hold_body("desk-1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let hold = body_json(response).await;
    assert_eq!(hold["desk_id"], "desk-1");
    assert!(hold["expires_at"].is_string());

    let listing = availability(&app, &ada).await;
    assert_eq!(
        desk(&listing, "desk-1")["status"]["kind"],
        "owned_by_requester"
    );
    let listing = availability(&app, &bea).await;
    assert_eq!(desk(&listing, "desk-1")["status"]["kind"], "held_by_other");

    // Bea tries to book over the hold and gets the holder's name back.
    let response = send(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&bea),
        Some(hold_body("desk-1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let conflict = body_json(response).await;
    assert_eq!(conflict["kind"], "held_by_other");
    assert_eq!(conflict["conflicting_holder"], "Ada");

    // Ada commits; her hold converts into the booking.
    let response = send(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&ada),
        Some(hold_body("desk-1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking = body_json(response).await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let listing = availability(&app, &bea).await;
    let blocked = desk(&listing, "desk-1");
    assert_eq!(blocked["status"]["kind"], "booked_by_other");
    assert_eq!(blocked["status"]["booker"], "Ada");

    // Bea's own listing shows the booking too.
    let response = send(&app, Method::GET, "/v1/bookings?user_id=me", Some(&ada), None).await;
    let mine = body_json(response).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // Cancelling frees the desk for everyone.
    let response = send(
        &app,
        Method::DELETE,
        &format!("/v1/bookings/{booking_id}"),
        Some(&ada),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listing = availability(&app, &bea).await;
    assert_eq!(desk(&listing, "desk-1")["status"]["kind"], "free");
}

#[tokio::test]
async fn release_hold_frees_the_desk() {
    let app = test_app();
    let ada = login(&app, "ada@example.com", "Ada").await;
    let bea = login(&app, "bea@example.com", "Bea").await;

    send(&app, Method::POST, "/v1/admin/desks/seed", Some(&ada), None).await;
    send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(&ada),
        Some(hold_body("desk-2")),
    )
    .await;

    let response = send(&app, Method::DELETE, "/v1/holds/desk-2", Some(&ada), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Releasing again stays a no-op success.
    let response = send(&app, Method::DELETE, "/v1/holds/desk-2", Some(&ada), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listing = availability(&app, &bea).await;
    assert_eq!(desk(&listing, "desk-2")["status"]["kind"], "free");
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = test_app();

    let response = send(
        &app,
        Method::GET,
        &format!("/v1/desks/availability?{MORNING}"),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::GET,
        &format!("/v1/desks/availability?{MORNING}"),
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_ranges_are_bad_requests() {
    let app = test_app();
    let ada = login(&app, "ada@example.com", "Ada").await;

    send(&app, Method::POST, "/v1/admin/desks/seed", Some(&ada), None).await;

    let response = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(&ada),
        Some(json!({
            "desk_id": "desk-1",
            "from_date": "2026-03-02",
            "from_time": "10:00",
            "to_date": "2026-03-02",
            "to_time": "09:00",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["kind"], "validation");
}

#[tokio::test]
async fn holding_an_unknown_desk_is_not_found() {
    let app = test_app();
    let ada = login(&app, "ada@example.com", "Ada").await;

    let response = send(
        &app,
        Method::POST,
        "/v1/holds",
        Some(&ada),
        Some(hold_body("desk-99")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["kind"], "desk_not_found");
}

#[tokio::test]
async fn seeding_is_idempotent_over_http() {
    let app = test_app();
    let ada = login(&app, "ada@example.com", "Ada").await;

    let first = body_json(send(&app, Method::POST, "/v1/admin/desks/seed", Some(&ada), None).await)
        .await;
    assert_eq!(first["created"], 12);

    let second =
        body_json(send(&app, Method::POST, "/v1/admin/desks/seed", Some(&ada), None).await).await;
    assert_eq!(second["created"], 0);
    assert_eq!(second["skipped"], 12);
    assert_eq!(second["total"], 12);
}
