//! Maps [`EngineError`]'s taxonomy onto HTTP status codes — all handler
//! failures map through the taxonomy, stack traces never appear in
//! responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use weave_error::{EngineError, ErrorKind};

/// Newtype so this crate can implement `IntoResponse` for an error type
/// it doesn't own.
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        // A single node's failure is reported in a 200 execution response,
        // not as an HTTP error; this arm only matters if one escapes the
        // façade uncaught, which is itself an engine bug.
        ErrorKind::NodeExecution
        | ErrorKind::WorkflowExecution
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, kind = ?self.0.kind, "request failed");
        }
        (status, Json(self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn method_not_allowed_maps_to_405() {
        assert_eq!(
            status_for(ErrorKind::MethodNotAllowed),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn internal_maps_to_500() {
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
