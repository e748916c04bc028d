use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use perch_domain::{Booking, TimeRange};

use crate::error::ApiError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    desk_id: String,
    from_date: String,
    from_time: String,
    to_date: String,
    to_time: String,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    user_id: Option<String>,
}

/// POST /v1/bookings
/// Commit the reservation. Every conflict check reruns server-side right
/// before the write, so a stale availability view fails loudly here with
/// the current holder's name rather than double-booking.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let range = TimeRange::from_parts(&req.from_date, &req.from_time, &req.to_date, &req.to_time)?;

    let booking = state
        .coordinator
        .create_booking(&req.desk_id, &claims.sub, &claims.name, range)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings
/// All bookings, or the caller's own with `?user_id=me`.
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let bookings = match query.user_id.as_deref() {
        None => state.bookings.list_bookings().await?,
        Some("me") => state.bookings.list_bookings_for_user(&claims.sub).await?,
        Some(user_id) => state.bookings.list_bookings_for_user(user_id).await?,
    };
    Ok(Json(bookings))
}

/// DELETE /v1/bookings/{id}
/// Cancel a booking; unknown ids are a no-op.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.cancel_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/bookings/stream
/// SSE feed of booking changes, optionally filtered to one user.
pub async fn booking_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bookings.subscribe_booking_changes();
    let filter = query.user_id;

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) => {
                    if let Some(user_id) = &filter {
                        if event.user_id() != user_id {
                            return None;
                        }
                    }
                    Event::default()
                        .event("booking_changed")
                        .json_data(&event)
                        .ok()
                        .map(Ok::<_, Infallible>)
                }
                Err(_) => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
