//! Server error types and handling

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use timeship_api_contract::ErrorEnvelope;
use timeship_storage::StorageError;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    fn status_and_title(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Storage(err) => match err {
                StorageError::InvalidPath(_)
                | StorageError::InvalidSnapshot(_)
                | StorageError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
                StorageError::StorageNotFound(_) => (StatusCode::NOT_FOUND, "Storage Not Found"),
                StorageError::NotFound(_) | StorageError::PathEscape(_) => {
                    (StatusCode::NOT_FOUND, "Not Found")
                }
                StorageError::NotSupported(_) => (StatusCode::NOT_IMPLEMENTED, "Not Implemented"),
                StorageError::PermissionDenied(_) | StorageError::Io { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                }
            },
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad Request"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServerError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "Not Implemented"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
        }
    }

    /// Convert the error to the wire envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let (_, title) = self.status_and_title();
        ErrorEnvelope::new(title, &self.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_title();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let mut response = (status, Json(self.to_envelope())).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_documented_status_codes() {
        let cases = [
            (
                ServerError::from(StorageError::InvalidPath("..".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(StorageError::InvalidSnapshot("bogus".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(StorageError::StorageNotFound("remote".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(StorageError::NotFound("missing.txt".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(StorageError::PathEscape("sneaky".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(StorageError::NotSupported("write".into())),
                StatusCode::NOT_IMPLEMENTED,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_and_title().0, expected, "{:?}", error);
        }
    }

    #[test]
    fn envelope_message_is_title_then_detail() {
        let error = ServerError::from(StorageError::NotFound("missing.txt".into()));
        let envelope = error.to_envelope();
        assert_eq!(envelope.message, "Not Found: 'missing.txt' does not exist");
        assert!(!envelope.status);
    }
}
