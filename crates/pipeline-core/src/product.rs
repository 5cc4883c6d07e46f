use crate::content::{ContentWork, Translation};
use crate::error::{PipelineError, Result};
use crate::review::ReviewEntry;
use crate::state::ProductState;
use crate::store::{from_record, to_record, Filter, RecordId, RecordStore, Table};
use crate::types::Role;
use crate::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProductBrief
// ---------------------------------------------------------------------------

/// Free-form content fields, edited by whoever owns the active stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductBrief {
    pub develop_month: Option<String>,
    pub category: Option<String>,
    pub market: Option<String>,
    pub platform: Option<String>,
    pub selling_point: Option<String>,
    pub positioning: Option<String>,
    pub track: Option<String>,
    pub main_concept: Option<String>,
    pub ingredient: Option<String>,
    pub primary_benefit: Option<String>,
    pub ingredients: Option<String>,
    pub main_efficacy: Option<String>,
    pub volume: Option<String>,
    pub scent: Option<String>,
    pub texture_color: Option<String>,
    pub pricing: Option<String>,
    pub product_title: Option<String>,
    pub seo_keywords: Option<String>,
    pub packaging_requirements: Option<String>,
    pub competitor_1_url: Option<String>,
    pub competitor_2_url: Option<String>,
    pub competitor_3_url: Option<String>,
    pub competitor_1_img: Option<String>,
    pub competitor_2_img: Option<String>,
    pub competitor_3_img: Option<String>,
    pub ref_design_img: Option<String>,
}

impl ProductBrief {
    /// Overwrite every field that is set in `patch`, keep the rest.
    pub fn apply_patch(&mut self, patch: &ProductBrief) -> Result<()> {
        let mut current = to_record(self)?;
        for (key, value) in to_record(patch)? {
            if !value.is_null() {
                current.insert(key, value);
            }
        }
        *self = from_record(current)?;
        Ok(())
    }

    /// Category and selling point must be present before a product exists.
    pub fn check_required(&self) -> Result<()> {
        let mut missing = Vec::new();
        if is_blank(&self.category) {
            missing.push("category");
        }
        if is_blank(&self.selling_point) {
            missing.push("selling_point");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Times stamped by transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    pub develop_start_time: Option<DateTime<Utc>>,
    pub develop_submit_time: Option<DateTime<Utc>>,
    pub design_start_time: Option<DateTime<Utc>>,
    pub package_design_time: Option<DateTime<Utc>>,
    pub package_review_time: Option<DateTime<Utc>>,
    pub content_start_time: Option<DateTime<Utc>>,
    pub content_first_submit_time: Option<DateTime<Utc>>,
    pub content_review_time: Option<DateTime<Utc>>,
    pub content_second_submit_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: RecordId,
    #[serde(flatten)]
    pub state: ProductState,
    #[serde(flatten)]
    pub brief: ProductBrief,

    #[serde(default)]
    pub developer_id: Option<UserId>,
    #[serde(default)]
    pub package_designer_id: Option<UserId>,
    #[serde(default)]
    pub content_creator_id: Option<UserId>,

    #[serde(default)]
    pub bottle_id: Option<RecordId>,
    #[serde(default)]
    pub bottle_img: Option<String>,
    #[serde(default)]
    pub ref_packaging_url_1: Option<String>,
    #[serde(default)]
    pub ref_packaging_url_2: Option<String>,
    #[serde(default)]
    pub ref_packaging_url_3: Option<String>,

    #[serde(default)]
    pub package_design_url: Option<String>,
    #[serde(default)]
    pub has_design: bool,
    #[serde(default)]
    pub package_review_note: Option<String>,
    #[serde(default)]
    pub review_history: Vec<ReviewEntry>,

    #[serde(flatten)]
    pub content: ContentWork,
    #[serde(default)]
    pub content_review_note: Option<String>,
    #[serde(default)]
    pub content_review_history: Vec<ReviewEntry>,
    #[serde(default)]
    pub selected_images_with_translation: Vec<Translation>,
    #[serde(default)]
    pub translation_complete: bool,

    #[serde(default)]
    pub is_ai_generated: bool,
    #[serde(default)]
    pub created_from_draft_id: Option<RecordId>,

    #[serde(flatten)]
    pub timeline: Timeline,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A fresh stage-1 product. Review and design fields start empty.
    pub fn new(brief: ProductBrief, developer_id: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            state: ProductState::Development,
            brief,
            developer_id,
            package_designer_id: None,
            content_creator_id: None,
            bottle_id: None,
            bottle_img: None,
            ref_packaging_url_1: None,
            ref_packaging_url_2: None,
            ref_packaging_url_3: None,
            package_design_url: None,
            has_design: false,
            package_review_note: None,
            review_history: Vec::new(),
            content: ContentWork::default(),
            content_review_note: None,
            content_review_history: Vec::new(),
            selected_images_with_translation: Vec::new(),
            translation_complete: false,
            is_ai_generated: false,
            created_from_draft_id: None,
            timeline: Timeline {
                develop_start_time: Some(now),
                ..Timeline::default()
            },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn load(store: &dyn RecordStore, id: RecordId) -> Result<Self> {
        match store.get_by_id(Table::Products, id)? {
            Some(record) => from_record(record),
            None => Err(PipelineError::ProductNotFound(id)),
        }
    }

    pub fn list(store: &dyn RecordStore, filter: &Filter) -> Result<Vec<Self>> {
        store
            .get(Table::Products, filter)?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Insert as a new record; the store assigns the id.
    pub fn insert(&self, store: &dyn RecordStore) -> Result<Self> {
        let mut record = to_record(self)?;
        record.remove("id");
        let product: Product = from_record(store.insert(Table::Products, record)?)?;
        tracing::info!(
            product = product.id,
            ai = product.is_ai_generated,
            "product created at {}",
            product.state
        );
        Ok(product)
    }

    pub fn delete(store: &dyn RecordStore, id: RecordId) -> Result<()> {
        if store.delete(Table::Products, id)? {
            Ok(())
        } else {
            Err(PipelineError::ProductNotFound(id))
        }
    }

    // -----------------------------------------------------------------------
    // Guarded writes
    // -----------------------------------------------------------------------

    /// Write the whole record if the stored copy still matches `guard`.
    /// Returns false when it did not.
    pub(crate) fn commit(&mut self, store: &dyn RecordStore, guard: &Filter) -> Result<bool> {
        self.updated_at = Utc::now();
        let patch = to_record(self)?;
        match store.update_if(Table::Products, self.id, guard, patch)? {
            Some(record) => {
                *self = from_record(record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist a change made while the product was in state `from`. Fails
    /// with `InvalidState` if another action moved the product first.
    pub(crate) fn save(
        &mut self,
        store: &dyn RecordStore,
        from: ProductState,
        action: &str,
        actor: &User,
    ) -> Result<()> {
        if !self.commit(store, &from.guard())? {
            return Err(PipelineError::invalid_state(
                "product",
                action,
                format!("product {} changed while the action was in flight", self.id),
            ));
        }
        tracing::info!(
            product = self.id,
            actor = actor.id,
            action,
            from = %from,
            to = %self.state,
            "product saved"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Precondition helpers
    // -----------------------------------------------------------------------

    pub(crate) fn expect_state(&self, allowed: &[ProductState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PipelineError::invalid_state(
                "product",
                action,
                format!("product {} is at {}", self.id, self.state),
            ))
        }
    }

    /// Admins may act on anything; everyone else only on work they own.
    pub(crate) fn expect_owner(
        &self,
        owner: Option<UserId>,
        actor: &User,
        action: &str,
    ) -> Result<()> {
        if actor.role == Role::Admin || owner == Some(actor.id) {
            Ok(())
        } else {
            Err(PipelineError::PermissionDenied {
                role: actor.role.to_string(),
                action: format!("{action} on product {} owned by someone else", self.id),
            })
        }
    }

    pub fn ref_packaging_urls(&self) -> Vec<&str> {
        [
            &self.ref_packaging_url_1,
            &self.ref_packaging_url_2,
            &self.ref_packaging_url_3,
        ]
        .into_iter()
        .filter_map(|u| u.as_deref())
        .collect()
    }

    /// URLs of files uploaded for this product alone. The bottle library
    /// image is shared and excluded.
    pub fn uploaded_assets(&self) -> Vec<String> {
        let brief = &self.brief;
        let mut urls: Vec<String> = [
            &brief.competitor_1_img,
            &brief.competitor_2_img,
            &brief.competitor_3_img,
            &brief.ref_design_img,
            &self.ref_packaging_url_1,
            &self.ref_packaging_url_2,
            &self.ref_packaging_url_3,
            &self.package_design_url,
        ]
        .into_iter()
        .filter_map(|u| u.clone())
        .collect();
        if self.bottle_id.is_none() {
            urls.extend(self.bottle_img.clone());
        }
        for set in &self.content.image_sets_uploaded {
            urls.extend(set.iter().map(|img| img.url.clone()));
        }
        urls.retain(|u| !u.trim().is_empty());
        urls.sort();
        urls.dedup();
        urls
    }
}
