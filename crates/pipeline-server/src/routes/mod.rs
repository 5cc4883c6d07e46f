pub mod ai;
pub mod drafts;
pub mod health;
pub mod library;
pub mod products;
pub mod queues;
pub mod uploads;
pub mod workflow;

use crate::error::AppError;
use axum::Json;
use base64::Engine;
use pipeline_core::error::PipelineError;
use pipeline_core::objects::Upload;
use serde::{Deserialize, Serialize};

/// Run a core operation on the blocking pool and render its result as JSON.
pub(crate) async fn blocking<T, F>(op: F) -> Result<Json<serde_json::Value>, AppError>
where
    F: FnOnce() -> pipeline_core::Result<T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let value = tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::to_value(value)?))
}

/// A file sent inline as base64.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineFile {
    pub content_type: String,
    pub data: String,
}

impl InlineFile {
    pub fn decode(&self) -> pipeline_core::Result<Upload> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| PipelineError::Validation(format!("file is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(PipelineError::Validation("file is empty".to_string()));
        }
        Ok(Upload::new(bytes, self.content_type.clone()))
    }
}
