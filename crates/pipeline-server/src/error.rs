use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline_core::error::PipelineError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(PipelineError::Validation(msg.into()).into())
    }
}

fn status_for(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::NotInitialized | PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
        PipelineError::ProductNotFound(_)
        | PipelineError::DraftNotFound(_)
        | PipelineError::UserNotFound(_)
        | PipelineError::BottleNotFound(_)
        | PipelineError::RecordNotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::AlreadyClaimed { .. } => StatusCode::CONFLICT,
        PipelineError::InvalidState { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::AiFormat { .. } | PipelineError::AiRequest { .. } => StatusCode::BAD_GATEWAY,
        PipelineError::PartialFailure { .. }
        | PipelineError::Storage { .. }
        | PipelineError::Io(_)
        | PipelineError::Yaml(_)
        | PipelineError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match self.0.downcast_ref::<PipelineError>() {
            Some(e) => (status_for(e), e.kind()),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status.is_server_error() {
            tracing::error!(kind, "request failed: {:#}", self.0);
        }

        let mut body = serde_json::json!({ "error": self.0.to_string(), "kind": kind });
        if let Some(PipelineError::PartialFailure { product_id, .. }) =
            self.0.downcast_ref::<PipelineError>()
        {
            body["product_id"] = serde_json::json!(product_id);
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
