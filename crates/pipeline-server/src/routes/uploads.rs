use axum::extract::State;
use axum::Json;

use super::{blocking, InlineFile};
use crate::error::AppError;
use crate::state::{ActorId, AppState};

/// POST /api/uploads: store a base64 file and return its public URL.
pub async fn upload(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(file): Json<InlineFile>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let upload = file.decode()?;
        let url = upload.send(&ws.objects)?;
        tracing::debug!(user = actor, url = %url, bytes = upload.bytes.len(), "file uploaded");
        Ok(serde_json::json!({ "url": url }))
    })
    .await
}
