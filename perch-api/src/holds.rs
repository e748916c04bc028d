use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use perch_domain::{Hold, TimeRange};

use crate::error::ApiError;
use crate::middleware::auth::Claims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    desk_id: String,
    from_date: String,
    from_time: String,
    to_date: String,
    to_time: String,
}

/// POST /v1/holds
/// Claim a desk while the user decides. The hold carries its absolute
/// expiry so the client can count it down.
pub async fn create_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<Json<Hold>, ApiError> {
    let range = TimeRange::from_parts(&req.from_date, &req.from_time, &req.to_date, &req.to_time)?;

    let hold = state
        .coordinator
        .create_hold(&req.desk_id, &claims.sub, &claims.name, range)
        .await?;
    Ok(Json(hold))
}

/// DELETE /v1/holds/{desk_id}
/// Drop the caller's hold. Idempotent; called on deselection, navigation
/// away, and before booking confirmation.
pub async fn release_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(desk_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.release_hold(&desk_id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
