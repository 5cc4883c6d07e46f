//! Ownership assignment.
//!
//! A claim is a guarded write: it only lands if the product is still in the
//! state the claimant saw and the owner field is still empty. A failed write
//! is `AlreadyClaimed` when someone now owns the work and `InvalidState` when
//! the product only moved on.

use crate::error::{PipelineError, Result};
use crate::product::Product;
use crate::state::ProductState;
use crate::store::{RecordId, RecordStore};
use crate::types::{ClaimKind, Role};
use crate::user::{User, UserId};
use chrono::Utc;

fn already_claimed(product: RecordId, kind: ClaimKind) -> PipelineError {
    PipelineError::AlreadyClaimed {
        product,
        kind: kind.as_str().to_string(),
    }
}

fn owner(product: &Product, kind: ClaimKind) -> Option<UserId> {
    match kind {
        ClaimKind::Design => product.package_designer_id,
        ClaimKind::Content => product.content_creator_id,
    }
}

/// Take ownership of a product's design (stage 1, or stage 2 while awaiting
/// a designer) or content work (stage 4).
pub fn claim(
    store: &dyn RecordStore,
    product_id: RecordId,
    kind: ClaimKind,
    actor: &User,
) -> Result<Product> {
    match kind {
        ClaimKind::Design => {
            actor.require(&[Role::Designer, Role::Admin], "claim design work")?
        }
        ClaimKind::Content => {
            actor.require(&[Role::Content, Role::Admin], "claim content work")?
        }
    }

    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    let now = Utc::now();

    match kind {
        ClaimKind::Design => {
            if owner(&product, kind).is_some() {
                return Err(already_claimed(product_id, kind));
            }
            product.expect_state(
                &[ProductState::Development, ProductState::AwaitingDesigner],
                "claim design for",
            )?;
            product.package_designer_id = Some(actor.id);
            product.state = ProductState::Designing;
            product.timeline.design_start_time = Some(now);
        }
        ClaimKind::Content => {
            if owner(&product, kind).is_some() {
                return Err(already_claimed(product_id, kind));
            }
            product.expect_state(&[ProductState::ContentPlanning], "claim content for")?;
            product.content_creator_id = Some(actor.id);
            product.timeline.content_start_time = Some(now);
        }
    }

    let guard = from.guard().is_null(kind.owner_field());
    if !product.commit(store, &guard)? {
        let current = Product::load(store, product_id)?;
        tracing::warn!(
            product = product_id,
            user = actor.id,
            kind = kind.as_str(),
            now = %current.state,
            "claim lost to a concurrent action"
        );
        if owner(&current, kind).is_some() {
            return Err(already_claimed(product_id, kind));
        }
        return Err(PipelineError::invalid_state(
            "product",
            "claim",
            format!(
                "product {product_id} moved from {from} to {} while the claim was in flight",
                current.state
            ),
        ));
    }

    tracing::info!(
        product = product_id,
        user = actor.id,
        kind = kind.as_str(),
        from = %from,
        to = %product.state,
        "product claimed"
    );
    Ok(product)
}
