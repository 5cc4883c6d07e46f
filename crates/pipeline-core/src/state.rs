//! Canonical product state.
//!
//! A product's position is one [`ProductState`] value. The persisted
//! `stage`, `status`, `package_review_status` and `content_review_status`
//! fields are projections of it: they are written together on every save
//! and `status` is never read back, so the four can not drift apart.

use crate::error::PipelineError;
use crate::store::Filter;
use crate::types::{ContentReviewStatus, PackageReviewStatus, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StateFields", into = "StateFields")]
pub enum ProductState {
    /// Stage 1: the developer is assembling the brief.
    Development,
    /// Stage 2: submitted, no designer yet.
    AwaitingDesigner,
    /// Stage 2: a designer owns the package design.
    Designing,
    /// Stage 2: the last design was rejected and is back with its designer.
    DesignRejected,
    /// Stage 3.
    DesignReview,
    /// Stage 4: design approved, content work open for claim or in progress.
    ContentPlanning,
    /// Stage 4: content was rejected at review and is back with its creator.
    ContentRevision,
    /// Stage 5: content submitted, waiting for review.
    ContentReview,
    /// Stage 5: content approved, translation outstanding.
    Translation,
    /// Stage 6.
    Finalized,
}

impl ProductState {
    pub fn stage(self) -> Stage {
        match self {
            ProductState::Development => Stage::Development,
            ProductState::AwaitingDesigner
            | ProductState::Designing
            | ProductState::DesignRejected => Stage::Design,
            ProductState::DesignReview => Stage::DesignReview,
            ProductState::ContentPlanning | ProductState::ContentRevision => Stage::Content,
            ProductState::ContentReview | ProductState::Translation => Stage::ContentReview,
            ProductState::Finalized => Stage::Finalization,
        }
    }

    /// Human-readable status label shown alongside the stage.
    pub fn status(self) -> &'static str {
        match self {
            ProductState::Development => "进行中",
            ProductState::AwaitingDesigner => "待接单",
            ProductState::Designing | ProductState::DesignRejected => "包装设计中",
            ProductState::DesignReview => "待审核",
            ProductState::ContentPlanning => "待内容策划",
            ProductState::ContentRevision => "内容退回修改",
            ProductState::ContentReview => "内容审核中",
            ProductState::Translation => "待翻译",
            ProductState::Finalized => "图片优化中",
        }
    }

    pub fn package_review_status(self) -> Option<PackageReviewStatus> {
        match self {
            ProductState::Development | ProductState::AwaitingDesigner => None,
            ProductState::Designing => Some(PackageReviewStatus::Designing),
            ProductState::DesignRejected => Some(PackageReviewStatus::Rejected),
            ProductState::DesignReview => Some(PackageReviewStatus::Pending),
            ProductState::ContentPlanning
            | ProductState::ContentRevision
            | ProductState::ContentReview
            | ProductState::Translation
            | ProductState::Finalized => Some(PackageReviewStatus::Approved),
        }
    }

    pub fn content_review_status(self) -> Option<ContentReviewStatus> {
        match self {
            ProductState::ContentRevision => Some(ContentReviewStatus::Rejected),
            ProductState::ContentReview => Some(ContentReviewStatus::Pending),
            ProductState::Translation | ProductState::Finalized => {
                Some(ContentReviewStatus::Approved)
            }
            _ => None,
        }
    }

    pub fn fields(self) -> StateFields {
        StateFields::from(self)
    }

    /// Guard matching a stored product that is still in this state. Only the
    /// fields that define the state at this stage are compared.
    pub fn guard(self) -> Filter {
        let filter = Filter::all().eq("stage", self.stage().number());
        match self.stage() {
            Stage::Design | Stage::DesignReview => filter.eq_or_null(
                "package_review_status",
                self.package_review_status().map(PackageReviewStatus::as_str),
            ),
            Stage::Content | Stage::ContentReview => filter.eq_or_null(
                "content_review_status",
                self.content_review_status().map(ContentReviewStatus::as_str),
            ),
            Stage::Development | Stage::Finalization => filter,
        }
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.stage().number(), self.status())
    }
}

// ---------------------------------------------------------------------------
// StateFields
// ---------------------------------------------------------------------------

/// The persisted projection of a [`ProductState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateFields {
    pub stage: Stage,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub package_review_status: Option<PackageReviewStatus>,
    #[serde(default)]
    pub content_review_status: Option<ContentReviewStatus>,
}

impl From<ProductState> for StateFields {
    fn from(state: ProductState) -> Self {
        Self {
            stage: state.stage(),
            status: Some(state.status().to_string()),
            package_review_status: state.package_review_status(),
            content_review_status: state.content_review_status(),
        }
    }
}

impl TryFrom<StateFields> for ProductState {
    type Error = PipelineError;

    fn try_from(fields: StateFields) -> Result<Self, Self::Error> {
        use ContentReviewStatus as C;
        use PackageReviewStatus as P;

        let state = match (
            fields.stage,
            fields.package_review_status,
            fields.content_review_status,
        ) {
            // Imported rows have carried stray review values at stage 1.
            (Stage::Development, _, _) => ProductState::Development,
            (Stage::Design, None, _) => ProductState::AwaitingDesigner,
            (Stage::Design, Some(P::Designing), _) => ProductState::Designing,
            (Stage::Design, Some(P::Rejected), _) => ProductState::DesignRejected,
            (Stage::DesignReview, Some(P::Pending), _) => ProductState::DesignReview,
            (Stage::Content, _, None) => ProductState::ContentPlanning,
            (Stage::Content, _, Some(C::Rejected)) => ProductState::ContentRevision,
            (Stage::ContentReview, _, Some(C::Pending)) => ProductState::ContentReview,
            (Stage::ContentReview, _, Some(C::Approved)) => ProductState::Translation,
            (Stage::Finalization, _, _) => ProductState::Finalized,
            (stage, package, content) => {
                return Err(PipelineError::invalid_state(
                    "product",
                    "load",
                    format!(
                        "stage {} does not agree with package review {:?} and content review {:?}",
                        stage.number(),
                        package.map(P::as_str),
                        content.map(C::as_str),
                    ),
                ))
            }
        };
        Ok(state)
    }
}
