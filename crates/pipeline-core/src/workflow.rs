//! Development (stage 1) and package design (stage 2) operations.

use crate::bottle::Bottle;
use crate::error::{PipelineError, Result};
use crate::product::{is_blank, non_blank, Product, ProductBrief};
use crate::state::ProductState;
use crate::store::{RecordId, RecordStore};
use crate::types::Role;
use crate::user::User;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of reference packaging images per product.
pub const MAX_REF_PACKAGING: usize = 3;

// ---------------------------------------------------------------------------
// Development
// ---------------------------------------------------------------------------

/// Edit content fields while the product is still in development.
pub fn update_brief(
    store: &dyn RecordStore,
    product_id: RecordId,
    patch: &ProductBrief,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Developer, Role::Admin], "edit product briefs")?;
    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(&[ProductState::Development], "edit brief of")?;

    product.brief.apply_patch(patch)?;
    product.brief.check_required()?;

    product.save(store, from, "update_brief", actor)?;
    Ok(product)
}

/// Bottle and reference packaging images a developer attaches before
/// handing the product to design.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevAssets {
    /// A bottle from the library. Takes precedence over `bottle_img`.
    pub bottle_id: Option<RecordId>,
    /// An uploaded bottle image not in the library.
    pub bottle_img: Option<String>,
    /// Replaces the reference packaging images when non-empty.
    pub ref_packaging_urls: Vec<String>,
}

pub fn attach_dev_assets(
    store: &dyn RecordStore,
    product_id: RecordId,
    assets: &DevAssets,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Developer, Role::Admin], "attach development assets")?;

    let refs: Vec<String> = assets
        .ref_packaging_urls
        .iter()
        .filter_map(|u| non_blank(Some(u)))
        .collect();
    if refs.len() > MAX_REF_PACKAGING {
        return Err(PipelineError::Validation(format!(
            "at most {MAX_REF_PACKAGING} reference packaging images, got {}",
            refs.len()
        )));
    }

    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(&[ProductState::Development], "attach assets to")?;

    if let Some(bottle_id) = assets.bottle_id {
        let bottle = Bottle::load(store, bottle_id)?;
        product.bottle_id = Some(bottle.id);
        product.bottle_img = Some(bottle.image_url);
    } else if let Some(img) = non_blank(assets.bottle_img.as_deref()) {
        product.bottle_id = None;
        product.bottle_img = Some(img);
    }

    if !refs.is_empty() {
        let mut refs = refs.into_iter();
        product.ref_packaging_url_1 = refs.next();
        product.ref_packaging_url_2 = refs.next();
        product.ref_packaging_url_3 = refs.next();
    }

    product.save(store, from, "attach_dev_assets", actor)?;
    Ok(product)
}

/// Hand a developed product to the design queue. Requires a bottle image and
/// at least one reference packaging image.
pub fn submit_development(
    store: &dyn RecordStore,
    product_id: RecordId,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Developer, Role::Admin], "submit development")?;
    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(&[ProductState::Development], "submit development of")?;

    let mut missing = Vec::new();
    if is_blank(&product.bottle_img) {
        missing.push("bottle_img");
    }
    if is_blank(&product.ref_packaging_url_1) {
        missing.push("ref_packaging_url_1");
    }
    if !missing.is_empty() {
        return Err(PipelineError::Validation(format!(
            "cannot submit to design without {}",
            missing.join(" and ")
        )));
    }

    product.state = ProductState::AwaitingDesigner;
    product.timeline.develop_submit_time = Some(Utc::now());
    product.save(store, from, "submit_development", actor)?;
    Ok(product)
}

// ---------------------------------------------------------------------------
// Package design
// ---------------------------------------------------------------------------

const DESIGN_STATES: &[ProductState] = &[ProductState::Designing, ProductState::DesignRejected];

/// Record the uploaded package design. The stage does not change.
pub fn attach_design(
    store: &dyn RecordStore,
    product_id: RecordId,
    url: &str,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Designer, Role::Admin], "upload designs")?;
    let Some(url) = non_blank(Some(url)) else {
        return Err(PipelineError::Validation("design URL is required".to_string()));
    };

    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(DESIGN_STATES, "attach design to")?;
    product.expect_owner(product.package_designer_id, actor, "attach design")?;

    product.package_design_url = Some(url);
    product.timeline.package_design_time = Some(Utc::now());
    product.save(store, from, "attach_design", actor)?;
    Ok(product)
}

/// Send the current design to review (stage 2 to 3).
pub fn submit_design(
    store: &dyn RecordStore,
    product_id: RecordId,
    actor: &User,
) -> Result<Product> {
    actor.require(&[Role::Designer, Role::Admin], "submit designs")?;
    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(DESIGN_STATES, "submit design of")?;
    product.expect_owner(product.package_designer_id, actor, "submit design")?;

    if is_blank(&product.package_design_url) {
        return Err(PipelineError::Validation(
            "package_design_url is required before submitting for review".to_string(),
        ));
    }

    product.has_design = true;
    product.state = ProductState::DesignReview;
    product.save(store, from, "submit_design", actor)?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::claim;
    use crate::store::RedbStore;
    use crate::types::{ClaimKind, PackageReviewStatus, Stage};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: RedbStore,
        dev: User,
        designer: User,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("test.db")).unwrap();
        let dev = User::create(&store, "Dev", Role::Developer).unwrap();
        let designer = User::create(&store, "Mei", Role::Designer).unwrap();
        Fixture {
            _dir: dir,
            store,
            dev,
            designer,
        }
    }

    fn new_product(f: &Fixture) -> Product {
        let brief = ProductBrief {
            category: Some("Shampoo".to_string()),
            selling_point: Some("deep clean".to_string()),
            ..ProductBrief::default()
        };
        Product::new(brief, Some(f.dev.id), Utc::now())
            .insert(&f.store)
            .unwrap()
    }

    #[test]
    fn submit_development_requires_assets() {
        let f = fixture();
        let p = new_product(&f);
        let err = submit_development(&f.store, p.id, &f.dev).unwrap_err();
        assert!(err.to_string().contains("bottle_img and ref_packaging_url_1"));

        let bottle = Bottle::create(&f.store, "Amber", "https://cdn.test/amber.png").unwrap();
        let assets = DevAssets {
            bottle_id: Some(bottle.id),
            ref_packaging_urls: vec!["https://cdn.test/ref1.png".to_string()],
            ..DevAssets::default()
        };
        let p = attach_dev_assets(&f.store, p.id, &assets, &f.dev).unwrap();
        assert_eq!(p.bottle_img.as_deref(), Some("https://cdn.test/amber.png"));
        assert_eq!(p.state, ProductState::Development);

        let p = submit_development(&f.store, p.id, &f.dev).unwrap();
        assert_eq!(p.state, ProductState::AwaitingDesigner);
        assert_eq!(p.state.status(), "待接单");
        assert!(p.timeline.develop_submit_time.is_some());
    }

    #[test]
    fn designer_can_claim_from_design_queue() {
        let f = fixture();
        let p = new_product(&f);
        let assets = DevAssets {
            bottle_img: Some("https://cdn.test/bottle.png".to_string()),
            ref_packaging_urls: vec!["https://cdn.test/ref1.png".to_string()],
            ..DevAssets::default()
        };
        attach_dev_assets(&f.store, p.id, &assets, &f.dev).unwrap();
        submit_development(&f.store, p.id, &f.dev).unwrap();

        let p = claim(&f.store, p.id, ClaimKind::Design, &f.designer).unwrap();
        assert_eq!(p.state, ProductState::Designing);
    }

    #[test]
    fn too_many_reference_images_rejected() {
        let f = fixture();
        let p = new_product(&f);
        let assets = DevAssets {
            ref_packaging_urls: (0..4).map(|i| format!("https://cdn.test/{i}.png")).collect(),
            ..DevAssets::default()
        };
        let err = attach_dev_assets(&f.store, p.id, &assets, &f.dev).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn submit_design_without_url_is_validation_error() {
        let f = fixture();
        let p = new_product(&f);
        claim(&f.store, p.id, ClaimKind::Design, &f.designer).unwrap();
        let err = submit_design(&f.store, p.id, &f.designer).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn submit_design_moves_to_review_and_marks_design() {
        let f = fixture();
        let p = new_product(&f);
        claim(&f.store, p.id, ClaimKind::Design, &f.designer).unwrap();
        let p = attach_design(&f.store, p.id, "https://cdn.test/d.png", &f.designer).unwrap();
        assert_eq!(p.state.stage(), Stage::Design);
        assert!(p.timeline.package_design_time.is_some());

        let p = submit_design(&f.store, p.id, &f.designer).unwrap();
        assert_eq!(p.state.stage(), Stage::DesignReview);
        assert_eq!(
            p.state.package_review_status(),
            Some(PackageReviewStatus::Pending)
        );
        assert!(p.has_design);
    }

    #[test]
    fn only_owning_designer_submits() {
        let f = fixture();
        let other = User::create(&f.store, "Other", Role::Designer).unwrap();
        let p = new_product(&f);
        claim(&f.store, p.id, ClaimKind::Design, &f.designer).unwrap();
        let err = attach_design(&f.store, p.id, "https://cdn.test/d.png", &other).unwrap_err();
        assert!(matches!(err, PipelineError::PermissionDenied { .. }));
    }

    #[test]
    fn brief_is_frozen_after_development() {
        let f = fixture();
        let p = new_product(&f);
        let patch = ProductBrief {
            pricing: Some("$9".to_string()),
            ..ProductBrief::default()
        };
        let updated = update_brief(&f.store, p.id, &patch, &f.dev).unwrap();
        assert_eq!(updated.brief.pricing.as_deref(), Some("$9"));

        claim(&f.store, p.id, ClaimKind::Design, &f.designer).unwrap();
        let err = update_brief(&f.store, p.id, &patch, &f.dev).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { .. }));
    }
}
