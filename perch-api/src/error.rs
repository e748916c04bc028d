use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use perch_domain::ReservationError;

#[derive(Debug)]
pub enum ApiError {
    Reservation(ReservationError),
    AuthenticationError(String),
    Internal(anyhow::Error),
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        Self::Reservation(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Reservation(err) => {
                let status = match &err {
                    ReservationError::DeskNotFound(_) => StatusCode::NOT_FOUND,
                    ReservationError::HeldByOther { .. }
                    | ReservationError::AlreadyBookedElsewhere { .. }
                    | ReservationError::DeskAlreadyBooked { .. } => StatusCode::CONFLICT,
                    ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
                    ReservationError::Store(_) => {
                        tracing::error!("store failure surfaced to client: {err}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let body = Json(json!({
                    "error": err.to_string(),
                    "kind": err.kind(),
                    "conflicting_holder": err.conflicting_holder(),
                }));
                (status, body).into_response()
            }
            ApiError::AuthenticationError(msg) => {
                let body = Json(json!({ "error": msg, "kind": "authentication" }));
                (StatusCode::UNAUTHORIZED, body).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal Server Error: {err}");
                let body = Json(json!({
                    "error": "Internal Server Error",
                    "kind": "internal",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
