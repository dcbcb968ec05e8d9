use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongo_panache::PanacheError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("book not found")]
    NotFound,

    #[error("malformed book id `{0}`")]
    MalformedId(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] PanacheError),

    #[error("failed to encode event: {0}")]
    Event(#[from] axum::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MalformedId(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            Self::Store(err) if err.is_store_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::Event(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(err = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::MalformedId("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PanacheError::malformed_query("author =", "no value")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PanacheError::NonUniqueResult).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
