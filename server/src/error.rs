use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pastelite_common::ErrorBody;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),
    /// Absent, expired, and exhausted pastes all map here.
    #[error("Paste not found")]
    NotFound,
    #[error("A paste with this id already exists")]
    Conflict,
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => Self::Conflict,
            e => Self::Store(e),
        }
    }
}

impl Error {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::InvalidArgument(message) => ErrorBody::new(message),
            Self::NotFound => ErrorBody::new("Paste not found"),
            e => {
                error!("Internal failure: {}", e);
                ErrorBody::new("Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}
