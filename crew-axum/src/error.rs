use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crew_core::errors::CrewError;
use tracing::warn;

#[derive(Debug)]
pub struct CrewAxumError(pub anyhow::Error);

impl From<anyhow::Error> for CrewAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<CrewError> for CrewAxumError {
    fn from(e: CrewError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for CrewAxumError {
    fn into_response(self) -> Response {
        // Typed errors keep their kind even when wrapped in anyhow context.
        let fallback;
        let crew = match CrewError::from_anyhow(&self.0) {
            Some(crew) => crew,
            None => {
                fallback = CrewError::general_error("Internal error");
                &fallback
            }
        };
        let status =
            StatusCode::from_u16(crew.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(code = crew.code(), error = ?self.0, "request failed");
        }
        (status, Json(crew.to_json())).into_response()
    }
}
