use axum::extract::{Path, Query, State};
use axum::Json;
use pipeline_core::draft::{self, Draft, DraftInput};
use pipeline_core::store::RecordId;
use pipeline_core::types::{DraftStatus, ReviewDecision};
use pipeline_core::user::{User, UserId};
use serde::Deserialize;

use super::blocking;
use crate::error::AppError;
use crate::state::{ActorId, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 待审核 / 已通过 / 已拒绝, or pending / approved / rejected.
    pub status: Option<String>,
    pub created_by: Option<UserId>,
}

/// GET /api/drafts: newest first.
pub async fn list_drafts(
    State(app): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let status = q
            .status
            .as_deref()
            .map(str::parse::<DraftStatus>)
            .transpose()?;
        draft::list_drafts(&ws.store, status, q.created_by)
    })
    .await
}

/// POST /api/drafts: save a (possibly edited) generated plan for review.
pub async fn create_draft(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(input): Json<DraftInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        draft::create_draft(&ws.store, input, &actor)
    })
    .await
}

/// GET /api/drafts/{id}
pub async fn get_draft(
    State(app): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || Draft::load(&ws.store, id)).await
}

#[derive(Deserialize)]
pub struct ReviewBody {
    pub decision: ReviewDecision,
    pub comment: Option<String>,
}

/// POST /api/drafts/{id}/review: approval returns the created product too.
pub async fn review_draft(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        draft::review_draft(&ws.store, id, body.decision, body.comment.as_deref(), &actor)
    })
    .await
}
