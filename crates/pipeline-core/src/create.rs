//! Manual product creation, batch import and deletion.

use crate::bottle::Bottle;
use crate::error::Result;
use crate::objects::{ObjectStore, Upload};
use crate::product::{Product, ProductBrief};
use crate::store::{RecordId, RecordStore};
use crate::types::Role;
use crate::user::User;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Files collected by the creation form, uploaded before the record is
/// inserted.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    pub competitor_images: [Option<Upload>; 3],
    pub ref_design: Option<Upload>,
    /// A bottle picked from the library.
    pub bottle_id: Option<RecordId>,
}

pub fn create_product(
    store: &dyn RecordStore,
    objects: &dyn ObjectStore,
    mut brief: ProductBrief,
    attachments: Attachments,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Developer, Role::Admin], "create products")?;
    brief.check_required()?;
    let bottle = attachments
        .bottle_id
        .map(|id| Bottle::load(store, id))
        .transpose()?;

    let [c1, c2, c3] = &attachments.competitor_images;
    for (slot, upload) in [
        (&mut brief.competitor_1_img, c1),
        (&mut brief.competitor_2_img, c2),
        (&mut brief.competitor_3_img, c3),
        (&mut brief.ref_design_img, &attachments.ref_design),
    ] {
        if let Some(upload) = upload {
            *slot = Some(upload.send(objects)?);
        }
    }

    let mut product = Product::new(brief, Some(actor.id), Utc::now());
    if let Some(bottle) = bottle {
        product.bottle_id = Some(bottle.id);
        product.bottle_img = Some(bottle.image_url);
    }
    product.insert(store)
}

// ---------------------------------------------------------------------------
// Batch import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based row number in the input.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: Vec<RecordId>,
    pub skipped: Vec<SkippedRow>,
}

/// Create one product per row. Rows missing required fields are skipped and
/// reported; storage failures abort the batch.
pub fn import_products(
    store: &dyn RecordStore,
    rows: Vec<ProductBrief>,
    actor: &User,
) -> Result<ImportSummary> {
    actor.require(&[Role::Developer, Role::Admin], "import products")?;
    let mut summary = ImportSummary::default();
    for (i, brief) in rows.into_iter().enumerate() {
        if let Err(e) = brief.check_required() {
            summary.skipped.push(SkippedRow {
                row: i + 1,
                reason: e.to_string(),
            });
            continue;
        }
        let product = Product::new(brief, Some(actor.id), Utc::now()).insert(store)?;
        summary.created.push(product.id);
    }
    tracing::info!(
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        "import finished"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Delete a product and then, best-effort, the files uploaded for it. The
/// files stay when the record cannot be removed.
pub fn delete_product(
    store: &dyn RecordStore,
    objects: &dyn ObjectStore,
    product_id: RecordId,
    actor: &User,
) -> Result<()> {
    actor.require(&[Role::Admin, Role::Developer], "delete products")?;
    let product = Product::load(store, product_id)?;
    Product::delete(store, product_id)?;
    tracing::info!(product = product_id, actor = actor.id, "product deleted");

    for url in product.uploaded_assets() {
        match objects.delete(&url) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(product = product_id, url = %url, "asset not in object store")
            }
            Err(e) => {
                tracing::warn!(product = product_id, url = %url, "failed to delete asset: {e}")
            }
        }
    }
    Ok(())
}
