//! Users and the bottle library.

use axum::extract::State;
use axum::Json;
use pipeline_core::bottle::Bottle;
use pipeline_core::error::PipelineError;
use pipeline_core::types::Role;
use pipeline_core::user::User;

use super::{blocking, InlineFile};
use crate::error::AppError;
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct CreateUserBody {
    pub name: String,
    pub role: String,
}

/// GET /api/users
pub async fn list_users(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || User::list(&ws.store)).await
}

/// POST /api/users: `role` accepts the English name or the Chinese label.
pub async fn create_user(
    State(app): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let role: Role = body.role.trim().parse()?;
        User::create(&ws.store, &body.name, role)
    })
    .await
}

#[derive(serde::Deserialize)]
pub struct CreateBottleBody {
    pub name: String,
    /// Either an existing URL or an inline image to upload.
    pub image_url: Option<String>,
    pub image: Option<InlineFile>,
}

/// GET /api/bottles
pub async fn list_bottles(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || Bottle::list(&ws.store)).await
}

/// POST /api/bottles
pub async fn create_bottle(
    State(app): State<AppState>,
    Json(body): Json<CreateBottleBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        if body.name.trim().is_empty() {
            return Err(PipelineError::Validation("bottle name is required".to_string()));
        }
        let url = match (&body.image, &body.image_url) {
            (Some(file), _) => file.decode()?.send(&ws.objects)?,
            (None, Some(url)) => url.clone(),
            (None, None) => String::new(),
        };
        Bottle::create(&ws.store, &body.name, &url)
    })
    .await
}
