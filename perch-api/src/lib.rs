use axum::{
    http::Method,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod bookings;
pub mod desks;
pub mod error;
pub mod holds;
pub mod middleware;
pub mod state;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // The SSE feeds stay open to EventSource clients, which cannot attach
    // an Authorization header.
    let public = Router::new()
        .merge(auth::routes())
        .route("/v1/desks", get(desks::list_desks))
        .route("/v1/desks/stream", get(desks::desk_stream))
        .route("/v1/bookings/stream", get(bookings::booking_stream));

    let protected = Router::new()
        .route("/v1/desks/availability", get(desks::desk_availability))
        .route("/v1/holds", post(holds::create_hold))
        .route("/v1/holds/{desk_id}", delete(holds::release_hold))
        .route(
            "/v1/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route("/v1/bookings/{id}", delete(bookings::cancel_booking))
        .route("/v1/admin/desks/seed", post(desks::seed_desks))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
