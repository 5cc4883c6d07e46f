//! Content planning (stage 4), submission (4 to 5) and translation (5 to 6).

use crate::config::ContentConfig;
use crate::error::{PipelineError, Result};
use crate::product::{is_blank, Product};
use crate::state::ProductState;
use crate::store::{RecordId, RecordStore};
use crate::types::{ImageSlot, Role};
use crate::user::User;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content work
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotImage {
    #[serde(rename = "type")]
    pub slot: ImageSlot,
    pub url: String,
}

/// One uploaded set: an image for every slot, in slot order.
pub type ImageSet = Vec<SlotImage>;

/// The image chosen for one slot, taken from one of the uploaded sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    #[serde(rename = "type")]
    pub slot: ImageSlot,
    /// 1-based index into `image_sets_uploaded`.
    pub from_set: usize,
    pub url: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(rename = "type")]
    pub slot: ImageSlot,
    pub url: String,
    pub cn_text: String,
    pub id_text: String,
}

/// What the content owner found on one competing listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorMetrics {
    pub selling_point: String,
    pub price: String,
    pub rating: String,
    pub sales_volume: String,
}

/// Competitor analysis written during content planning. `pricing` is the
/// price the content owner settles on and is mirrored onto the brief.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorAnalysis {
    pub competitors: Vec<CompetitorMetrics>,
    pub differentiation: Option<String>,
    pub pricing: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentWork {
    pub competitors_data: Option<CompetitorAnalysis>,
    pub manual_title: Option<String>,
    pub manual_bullet_points: Vec<String>,
    pub manual_description: Option<String>,
    pub manual_keywords: Option<String>,
    pub image_sets_uploaded: Vec<ImageSet>,
    pub selected_images_by_content: Vec<SelectedImage>,
    pub image_notes: Option<String>,
}

impl ContentWork {
    /// Every problem that blocks submission, in field order.
    pub fn problems(&self, cfg: &ContentConfig) -> Vec<String> {
        let mut problems = Vec::new();
        let slots = &cfg.slots;

        if is_blank(&self.manual_title) {
            problems.push("manual_title is required".to_string());
        }
        if self.manual_bullet_points.len() != cfg.bullet_points
            || self.manual_bullet_points.iter().any(|b| b.trim().is_empty())
        {
            problems.push(format!(
                "{} non-empty bullet points are required",
                cfg.bullet_points
            ));
        }
        if is_blank(&self.manual_description) {
            problems.push("manual_description is required".to_string());
        }
        if is_blank(&self.manual_keywords) {
            problems.push("manual_keywords is required".to_string());
        }

        if self.image_sets_uploaded.len() != cfg.image_sets {
            problems.push(format!(
                "{} image sets are required, got {}",
                cfg.image_sets,
                self.image_sets_uploaded.len()
            ));
        }
        for (i, set) in self.image_sets_uploaded.iter().enumerate() {
            let complete = set.len() == slots.len()
                && set
                    .iter()
                    .zip(slots)
                    .all(|(img, slot)| img.slot == *slot && !img.url.trim().is_empty());
            if !complete {
                problems.push(format!(
                    "image set {} must fill all {} slots in order",
                    i + 1,
                    slots.len()
                ));
            }
        }

        if self.selected_images_by_content.len() != slots.len() {
            problems.push(format!(
                "exactly {} selected images are required, got {}",
                slots.len(),
                self.selected_images_by_content.len()
            ));
        } else {
            let pairs = self.selected_images_by_content.iter().zip(slots);
            for (pos, (selected, slot)) in pairs.enumerate() {
                let source = selected
                    .from_set
                    .checked_sub(1)
                    .and_then(|i| self.image_sets_uploaded.get(i))
                    .and_then(|set| set.get(pos));
                let valid = selected.slot == *slot
                    && source.is_some_and(|img| {
                        img.url == selected.url && !img.url.trim().is_empty()
                    });
                if !valid {
                    problems.push(format!(
                        "selected image for {} must be the {} image of an uploaded set",
                        slot.label(),
                        slot.as_str()
                    ));
                }
            }
        }

        problems
    }

    pub fn check_complete(&self, cfg: &ContentConfig) -> Result<()> {
        let problems = self.problems(cfg);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(problems.join("; ")))
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

const CONTENT_STATES: &[ProductState] =
    &[ProductState::ContentPlanning, ProductState::ContentRevision];

fn load_owned(
    store: &dyn RecordStore,
    product_id: RecordId,
    allowed: &[ProductState],
    actor: &User,
    action: &str,
) -> Result<Product> {
    actor.require(&[Role::Content, Role::Admin], action)?;
    let product = Product::load(store, product_id)?;
    product.expect_state(allowed, action)?;
    product.expect_owner(product.content_creator_id, actor, action)?;
    Ok(product)
}

/// Replace the saved work. A settled price from the competitor analysis
/// becomes the product's pricing.
fn apply_work(product: &mut Product, work: ContentWork) {
    let pricing = work
        .competitors_data
        .as_ref()
        .and_then(|cd| cd.pricing.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty());
    if let Some(pricing) = pricing {
        product.brief.pricing = Some(pricing.to_string());
    }
    product.content = work;
}

/// Save work in progress without gating.
pub fn save_content_draft(
    store: &dyn RecordStore,
    product_id: RecordId,
    work: ContentWork,
    actor: &User,
) -> Result<Product> {
    let mut product = load_owned(store, product_id, CONTENT_STATES, actor, "save content")?;
    let from = product.state;
    apply_work(&mut product, work);
    product.save(store, from, "save_content_draft", actor)?;
    Ok(product)
}

/// Submit content for review (stage 4 to 5). `work`, when given, replaces
/// the saved work before the completeness check.
pub fn submit_content(
    store: &dyn RecordStore,
    product_id: RecordId,
    work: Option<ContentWork>,
    cfg: &ContentConfig,
    actor: &User,
) -> Result<Product> {
    let mut product = load_owned(store, product_id, CONTENT_STATES, actor, "submit content")?;
    let from = product.state;
    if let Some(work) = work {
        apply_work(&mut product, work);
    }
    product.content.check_complete(cfg)?;

    product.state = ProductState::ContentReview;
    product.timeline.content_first_submit_time = Some(Utc::now());
    product.save(store, from, "submit_content", actor)?;
    Ok(product)
}

/// Record the translated captions for the selected images (stage 5 to 6).
/// Content review must already have approved the work.
pub fn complete_translation(
    store: &dyn RecordStore,
    product_id: RecordId,
    translations: Vec<Translation>,
    actor: &User,
) -> Result<Product> {
    let mut product = load_owned(
        store,
        product_id,
        &[ProductState::Translation],
        actor,
        "complete translation",
    )?;
    let from = product.state;

    let selected = &product.content.selected_images_by_content;
    if translations.len() != selected.len() {
        return Err(PipelineError::Validation(format!(
            "{} translations are required, got {}",
            selected.len(),
            translations.len()
        )));
    }
    for (t, s) in translations.iter().zip(selected) {
        if t.slot != s.slot {
            return Err(PipelineError::Validation(format!(
                "translation for {} is out of order",
                s.slot.label()
            )));
        }
        if t.url != s.url {
            return Err(PipelineError::Validation(format!(
                "translation for {} must caption the selected image {}",
                s.slot.label(),
                s.url
            )));
        }
        if t.cn_text.trim().is_empty() || t.id_text.trim().is_empty() {
            return Err(PipelineError::Validation(format!(
                "translation for {} needs both Chinese and Indonesian text",
                s.slot.label()
            )));
        }
    }

    product.selected_images_with_translation = translations;
    product.translation_complete = true;
    product.timeline.content_second_submit_time = Some(Utc::now());
    product.state = ProductState::Finalized;
    product.save(store, from, "complete_translation", actor)?;
    Ok(product)
}
