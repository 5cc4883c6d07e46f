use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pipeline_core::user::UserId;
use pipeline_core::workspace::Workspace;
use std::sync::Arc;

/// Header carrying the id of the already-authenticated acting user.
pub const USER_HEADER: &str = "x-user-id";

/// Shared application state passed to all route handlers.
///
/// The workspace is opened once: the database file is locked for the
/// lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub ws: Arc<Workspace>,
}

impl AppState {
    pub fn new(ws: Workspace) -> Self {
        Self { ws: Arc::new(ws) }
    }
}

/// The acting user's id, read from [`USER_HEADER`]. The user record itself
/// is loaded inside the handler's blocking task.
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub UserId);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_HEADER) else {
            return Err(AppError::bad_request(format!("missing {USER_HEADER} header")));
        };
        raw.to_str()
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(ActorId)
            .ok_or_else(|| AppError::bad_request(format!("invalid {USER_HEADER} header")))
    }
}
