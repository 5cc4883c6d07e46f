//! AI assistance. Neither route writes anything: generation returns an
//! unsaved draft input for the developer to edit and save.

use axum::extract::State;
use axum::Json;
use pipeline_core::ai::{self, CompetitorSource, ImageInput, PlanRequest};
use pipeline_core::error::PipelineError;
use pipeline_core::types::Role;
use pipeline_core::user::User;
use pipeline_core::workspace::AiPurpose;
use serde::Deserialize;

use super::{blocking, InlineFile};
use crate::error::AppError;
use crate::state::{ActorId, AppState};

/// POST /api/ai/generate
pub async fn generate(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(request): Json<PlanRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        actor.require(&[Role::Developer, Role::Admin], "generate product plans")?;
        let provider = ws.provider(AiPurpose::Generate)?;
        ai::generate_draft(&provider, &request)
    })
    .await
}

#[derive(Deserialize)]
pub struct ExtractBody {
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<InlineFile>,
    pub hint: Option<String>,
}

impl ExtractBody {
    fn source(self) -> pipeline_core::Result<CompetitorSource> {
        match (self.url, self.images.is_empty()) {
            (Some(url), true) => Ok(CompetitorSource::Url(url)),
            (None, false) => {
                let images = self
                    .images
                    .iter()
                    .map(|f| {
                        f.decode().map(|u| ImageInput {
                            content_type: u.content_type,
                            bytes: u.bytes,
                        })
                    })
                    .collect::<pipeline_core::Result<Vec<_>>>()?;
                Ok(CompetitorSource::Images {
                    images,
                    hint: self.hint,
                })
            }
            _ => Err(PipelineError::Validation(
                "send a url or screenshots, not both".to_string(),
            )),
        }
    }
}

/// POST /api/ai/extract: competitor info from a listing URL or screenshots.
pub async fn extract(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(body): Json<ExtractBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        actor.require(&[Role::Developer, Role::Admin], "extract competitors")?;
        let source = body.source()?;
        let provider = ws.provider(AiPurpose::Extract)?;
        ai::extract_competitor(&provider, &source)
    })
    .await
}
