//! Review gates for designs (stage 3) and content (stage 5).
//!
//! Rejections need a note, append to the gate's history ledger and send the
//! work back to its owner one step. Approvals move forward and never touch the
//! ledger.

use crate::error::{PipelineError, Result};
use crate::product::{non_blank, Product};
use crate::state::ProductState;
use crate::store::{RecordId, RecordStore};
use crate::types::{ReviewDecision, Role};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One rejection. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub time: DateTime<Utc>,
    pub note: String,
    pub reviewer: String,
}

enum Verdict {
    Approve(Option<String>),
    Reject(String),
}

fn verdict(decision: ReviewDecision, note: Option<&str>, what: &str) -> Result<Verdict> {
    let note = non_blank(note);
    match (decision, note) {
        (ReviewDecision::Approve, note) => Ok(Verdict::Approve(note)),
        (ReviewDecision::Reject, Some(note)) => Ok(Verdict::Reject(note)),
        (ReviewDecision::Reject, None) => Err(PipelineError::Validation(format!(
            "a note is required to reject {what}"
        ))),
    }
}

/// Approve or reject a design waiting at stage 3.
pub fn review_design(
    store: &dyn RecordStore,
    product_id: RecordId,
    decision: ReviewDecision,
    note: Option<&str>,
    reviewer: &User,
) -> Result<Product> {
    let verdict = verdict(decision, note, "a design")?;
    reviewer.require(&[Role::Admin], "review designs")?;

    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(&[ProductState::DesignReview], "review design of")?;

    let now = Utc::now();
    product.timeline.package_review_time = Some(now);
    match verdict {
        Verdict::Approve(note) => {
            if note.is_some() {
                product.package_review_note = note;
            }
            product.state = ProductState::ContentPlanning;
        }
        Verdict::Reject(note) => {
            product.review_history.push(ReviewEntry {
                time: now,
                note: note.clone(),
                reviewer: reviewer.name.clone(),
            });
            product.package_review_note = Some(note);
            product.state = ProductState::DesignRejected;
        }
    }

    product.save(store, from, "review_design", reviewer)?;
    Ok(product)
}

/// Approve or reject content waiting at stage 5. Approval keeps the product
/// at stage 5 until translation is done; rejection returns it to stage 4 with
/// its content creator.
pub fn review_content(
    store: &dyn RecordStore,
    product_id: RecordId,
    decision: ReviewDecision,
    note: Option<&str>,
    reviewer: &User,
) -> Result<Product> {
    let verdict = verdict(decision, note, "content")?;
    reviewer.require(&[Role::Admin], "review content")?;

    let mut product = Product::load(store, product_id)?;
    let from = product.state;
    product.expect_state(&[ProductState::ContentReview], "review content of")?;

    let now = Utc::now();
    product.timeline.content_review_time = Some(now);
    match verdict {
        Verdict::Approve(note) => {
            if note.is_some() {
                product.content_review_note = note;
            }
            product.state = ProductState::Translation;
        }
        Verdict::Reject(note) => {
            product.content_review_history.push(ReviewEntry {
                time: now,
                note: note.clone(),
                reviewer: reviewer.name.clone(),
            });
            product.content_review_note = Some(note);
            product.state = ProductState::ContentRevision;
        }
    }

    product.save(store, from, "review_content", reviewer)?;
    Ok(product)
}
