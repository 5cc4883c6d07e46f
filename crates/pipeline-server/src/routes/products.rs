use axum::extract::{Path, Query, State};
use axum::Json;
use pipeline_core::create::{self, Attachments};
use pipeline_core::error::PipelineError;
use pipeline_core::product::{Product, ProductBrief};
use pipeline_core::queue::{current_owner, Owner};
use pipeline_core::store::{Filter, RecordId};
use pipeline_core::user::{User, UserId};
use serde::{Deserialize, Serialize};

use super::{blocking, InlineFile};
use crate::error::AppError;
use crate::state::{ActorId, AppState};

/// A product together with who currently holds it.
#[derive(Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub owner: Owner,
    pub owner_label: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let owner = current_owner(&product);
        Self {
            owner_label: owner.to_string(),
            owner,
            product,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub stage: Option<u8>,
    pub developer_id: Option<UserId>,
}

/// GET /api/products: optionally filtered by `stage` and `developer_id`.
pub async fn list_products(
    State(app): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let mut filter = Filter::all();
        if let Some(stage) = q.stage {
            filter = filter.eq("stage", stage);
        }
        if let Some(dev) = q.developer_id {
            filter = filter.eq("developer_id", dev);
        }
        let products = Product::list(&ws.store, &filter)?;
        Ok(products.into_iter().map(ProductView::from).collect::<Vec<_>>())
    })
    .await
}

/// GET /api/products/{id}
pub async fn get_product(
    State(app): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || Product::load(&ws.store, id).map(ProductView::from)).await
}

#[derive(Deserialize)]
pub struct CreateProductBody {
    #[serde(flatten)]
    pub brief: ProductBrief,
    pub bottle_id: Option<RecordId>,
    #[serde(default)]
    pub competitor_images: Vec<Option<InlineFile>>,
    pub ref_design: Option<InlineFile>,
}

impl CreateProductBody {
    fn attachments(&self) -> pipeline_core::Result<Attachments> {
        if self.competitor_images.len() > 3 {
            return Err(PipelineError::Validation(format!(
                "at most 3 competitor images, got {}",
                self.competitor_images.len()
            )));
        }
        let mut attachments = Attachments {
            bottle_id: self.bottle_id,
            ..Attachments::default()
        };
        for (slot, file) in attachments
            .competitor_images
            .iter_mut()
            .zip(&self.competitor_images)
        {
            *slot = file.as_ref().map(InlineFile::decode).transpose()?;
        }
        attachments.ref_design = self.ref_design.as_ref().map(InlineFile::decode).transpose()?;
        Ok(attachments)
    }
}

/// POST /api/products: manual creation at stage 1.
pub async fn create_product(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(body): Json<CreateProductBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        let attachments = body.attachments()?;
        create::create_product(&ws.store, &ws.objects, body.brief, attachments, &actor)
            .map(ProductView::from)
    })
    .await
}

/// DELETE /api/products/{id}
pub async fn delete_product(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<RecordId>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        create::delete_product(&ws.store, &ws.objects, id, &actor)?;
        Ok(serde_json::json!({ "id": id, "deleted": true }))
    })
    .await
}

#[derive(Deserialize)]
pub struct ImportBody {
    pub rows: Vec<ProductBrief>,
}

/// POST /api/products/import: rows missing required fields are skipped.
pub async fn import_products(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Json(body): Json<ImportBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let actor = User::load(&ws.store, actor)?;
        create::import_products(&ws.store, body.rows, &actor)
    })
    .await
}
