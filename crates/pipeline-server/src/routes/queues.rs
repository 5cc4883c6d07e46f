use axum::extract::{Path, State};
use axum::Json;
use pipeline_core::queue::{list_queue, Queue};
use pipeline_core::user::User;

use super::blocking;
use super::products::ProductView;
use crate::error::AppError;
use crate::state::{ActorId, AppState};

/// GET /api/queues/{queue}: `designer_work` and `content_work` list the
/// acting user's own products.
pub async fn get_queue(
    State(app): State<AppState>,
    ActorId(actor): ActorId,
    Path(queue): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ws = app.ws.clone();
    blocking(move || {
        let queue: Queue = queue.parse()?;
        let actor = User::load(&ws.store, actor)?;
        let products = list_queue(&ws.store, queue, &actor)?;
        Ok(products.into_iter().map(ProductView::from).collect::<Vec<_>>())
    })
    .await
}
