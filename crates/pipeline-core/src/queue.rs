//! Per-role work lists and the "who owns this now" projection.

use crate::error::{PipelineError, Result};
use crate::product::Product;
use crate::state::ProductState;
use crate::store::{Filter, RecordStore};
use crate::types::Stage;
use crate::user::{User, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Owner {
    Developer { user: Option<UserId> },
    AwaitingDesigner,
    Designer { user: UserId },
    AwaitingContent,
    ContentCreator { user: UserId },
    /// Stage 6 and beyond: the business and visual team.
    Business,
}

/// Who holds the product right now, following stage order.
pub fn current_owner(product: &Product) -> Owner {
    match product.state.stage() {
        Stage::Development => Owner::Developer {
            user: product.developer_id,
        },
        Stage::Design | Stage::DesignReview => match product.package_designer_id {
            Some(user) => Owner::Designer { user },
            None => Owner::AwaitingDesigner,
        },
        Stage::Content | Stage::ContentReview => match product.content_creator_id {
            Some(user) => Owner::ContentCreator { user },
            None => Owner::AwaitingContent,
        },
        Stage::Finalization => Owner::Business,
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Developer { user: Some(id) } => write!(f, "developer #{id}"),
            Owner::Developer { user: None } => f.write_str("developer"),
            Owner::AwaitingDesigner => f.write_str("awaiting designer"),
            Owner::Designer { user } => write!(f, "designer #{user}"),
            Owner::AwaitingContent => f.write_str("awaiting content"),
            Owner::ContentCreator { user } => write!(f, "content #{user}"),
            Owner::Business => f.write_str("business/visual team"),
        }
    }
}

// ---------------------------------------------------------------------------
// Queues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    /// Unclaimed products designers can pick up.
    Design,
    /// The acting designer's products in design or design review.
    DesignerWork,
    /// Design-approved products without a content creator.
    Content,
    /// The acting content creator's products in content or content review.
    ContentWork,
    /// Products waiting at either review gate.
    Review,
}

impl Queue {
    pub fn all() -> &'static [Queue] {
        &[
            Queue::Design,
            Queue::DesignerWork,
            Queue::Content,
            Queue::ContentWork,
            Queue::Review,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Queue::Design => "design",
            Queue::DesignerWork => "designer_work",
            Queue::Content => "content",
            Queue::ContentWork => "content_work",
            Queue::Review => "review",
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Queue {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        Queue::all()
            .iter()
            .copied()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| PipelineError::Validation(format!("unknown queue '{s}'")))
    }
}

/// Products matching any of `filters`, in id order.
fn any_of(store: &dyn RecordStore, filters: Vec<Filter>) -> Result<Vec<Product>> {
    let mut products = Vec::new();
    for filter in &filters {
        products.extend(Product::list(store, filter)?);
    }
    products.sort_by_key(|p| p.id);
    products.dedup_by_key(|p| p.id);
    Ok(products)
}

pub fn design_queue(store: &dyn RecordStore) -> Result<Vec<Product>> {
    any_of(
        store,
        [ProductState::Development, ProductState::AwaitingDesigner]
            .into_iter()
            .map(|s| s.guard().is_null("package_designer_id"))
            .collect(),
    )
}

pub fn designer_work(store: &dyn RecordStore, designer: UserId) -> Result<Vec<Product>> {
    any_of(
        store,
        [Stage::Design, Stage::DesignReview]
            .into_iter()
            .map(|s| {
                Filter::all()
                    .eq("stage", s.number())
                    .eq("package_designer_id", designer)
            })
            .collect(),
    )
}

pub fn content_queue(store: &dyn RecordStore) -> Result<Vec<Product>> {
    Product::list(
        store,
        &ProductState::ContentPlanning
            .guard()
            .is_null("content_creator_id"),
    )
}

pub fn content_work(store: &dyn RecordStore, creator: UserId) -> Result<Vec<Product>> {
    any_of(
        store,
        [Stage::Content, Stage::ContentReview]
            .into_iter()
            .map(|s| {
                Filter::all()
                    .eq("stage", s.number())
                    .eq("content_creator_id", creator)
            })
            .collect(),
    )
}

pub fn review_queue(store: &dyn RecordStore) -> Result<Vec<Product>> {
    any_of(
        store,
        vec![
            ProductState::DesignReview.guard(),
            ProductState::ContentReview.guard(),
        ],
    )
}

/// List a queue on behalf of `actor`. Personal queues use the actor's id.
pub fn list_queue(store: &dyn RecordStore, queue: Queue, actor: &User) -> Result<Vec<Product>> {
    match queue {
        Queue::Design => design_queue(store),
        Queue::DesignerWork => designer_work(store, actor.id),
        Queue::Content => content_queue(store),
        Queue::ContentWork => content_work(store, actor.id),
        Queue::Review => review_queue(store),
    }
}
