//! Per-product stage actions. Every route acts on behalf of the user named
//! by the `x-user-id` header and returns the updated product.

use axum::extract::{Path, State};
use axum::Json;
use pipeline_core::claim::claim;
use pipeline_core::content::{self, ContentWork, Translation};
use pipeline_core::product::ProductBrief;
use pipeline_core::review;
use pipeline_core::store::RecordId;
use pipeline_core::types::{ClaimKind, ReviewDecision};
use pipeline_core::user::User;
use pipeline_core::workflow::{self, DevAssets};
use serde::Deserialize;

use super::blocking;
use super::products::ProductView;
use crate::error::AppError;
use crate::state::{ActorId, AppState};

type JsonResult = Result<Json<serde_json::Value>, AppError>;

// ---------------------------------------------------------------------------
// Development
// ---------------------------------------------------------------------------

/// POST /api/products/{id}/brief
pub async fn update_brief(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(patch): Json<ProductBrief>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        workflow::update_brief(&ws.store, id, &patch, &actor).map(ProductView::from)
    })
    .await
}

/// POST /api/products/{id}/dev-assets
pub async fn attach_dev_assets(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(assets): Json<DevAssets>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        workflow::attach_dev_assets(&ws.store, id, &assets, &actor).map(ProductView::from)
    })
    .await
}

/// POST /api/products/{id}/submit: hand the product to design.
pub async fn submit_development(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        workflow::submit_development(&ws.store, id, &actor).map(ProductView::from)
    })
    .await
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ClaimBody {
    pub kind: ClaimKind,
}

/// POST /api/products/{id}/claim: 409 when someone else got there first.
pub async fn claim_product(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<ClaimBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        claim(&ws.store, id, body.kind, &actor).map(ProductView::from)
    })
    .await
}

// ---------------------------------------------------------------------------
// Design
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct DesignBody {
    pub url: String,
}

/// POST /api/products/{id}/design
pub async fn attach_design(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<DesignBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        workflow::attach_design(&ws.store, id, &body.url, &actor).map(ProductView::from)
    })
    .await
}

/// POST /api/products/{id}/submit-design
pub async fn submit_design(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        workflow::submit_design(&ws.store, id, &actor).map(ProductView::from)
    })
    .await
}

#[derive(Deserialize)]
pub struct ReviewBody {
    pub decision: ReviewDecision,
    pub note: Option<String>,
}

/// POST /api/products/{id}/review-design
pub async fn review_design(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<ReviewBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        review::review_design(&ws.store, id, body.decision, body.note.as_deref(), &actor)
            .map(ProductView::from)
    })
    .await
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// POST /api/products/{id}/content-draft
pub async fn save_content_draft(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(work): Json<ContentWork>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        content::save_content_draft(&ws.store, id, work, &actor).map(ProductView::from)
    })
    .await
}

#[derive(Deserialize)]
pub struct SubmitContentBody {
    /// Replaces the saved work when present.
    #[serde(default)]
    pub work: Option<ContentWork>,
}

/// POST /api/products/{id}/submit-content
pub async fn submit_content(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<SubmitContentBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        content::submit_content(&ws.store, id, body.work, &ws.config.content, &actor)
            .map(ProductView::from)
    })
    .await
}

/// POST /api/products/{id}/review-content
pub async fn review_content(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<ReviewBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        review::review_content(&ws.store, id, body.decision, body.note.as_deref(), &actor)
            .map(ProductView::from)
    })
    .await
}

#[derive(Deserialize)]
pub struct TranslationBody {
    pub translations: Vec<Translation>,
}

/// POST /api/products/{id}/translation
pub async fn complete_translation(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
    Json(body): Json<TranslationBody>,
) -> JsonResult {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        content::complete_translation(&ws.store, id, body.translations, &actor)
            .map(ProductView::from)
    })
    .await
}
