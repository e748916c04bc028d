use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

use perch_domain::{Desk, DeskAvailability, TimeRange};
use perch_store::{seed_floor_plan, SeedReport};

use crate::error::ApiError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    from_date: String,
    from_time: String,
    to_date: String,
    to_time: String,
}

/// GET /v1/desks
/// The raw floor plan, stored state included.
pub async fn list_desks(State(state): State<AppState>) -> Result<Json<Vec<Desk>>, ApiError> {
    let desks = state.desks.list_desks().await?;
    Ok(Json(desks))
}

/// GET /v1/desks/availability
/// Every desk annotated for the requested range, from the caller's point
/// of view: their own hold or booking never shows as blocked.
pub async fn desk_availability(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<DeskAvailability>>, ApiError> {
    let range = TimeRange::from_parts(
        &query.from_date,
        &query.from_time,
        &query.to_date,
        &query.to_time,
    )?;

    let desks = state
        .engine
        .list_desks_with_availability(&range, Some(&claims.sub))
        .await?;
    Ok(Json(desks))
}

/// GET /v1/desks/stream
/// SSE feed of desk changes; clients re-derive availability live from it.
pub async fn desk_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.desks.subscribe_desk_changes();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Event::default()
                .event("desk_changed")
                .json_data(&event)
                .ok()
                .map(Ok::<_, Infallible>),
            // Lagged receivers skip ahead; the next event carries fresh state.
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /v1/admin/desks/seed
/// Create any floor-plan desks that are missing. Safe to call repeatedly.
pub async fn seed_desks(State(state): State<AppState>) -> Result<Json<SeedReport>, ApiError> {
    let report = seed_floor_plan(state.desks.as_ref()).await?;
    Ok(Json(report))
}
