use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Numeric lifecycle position of a product. The numbers are persisted and
/// double as the precedence key for "who owns this now" comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Stage {
    Development = 1,
    Design = 2,
    DesignReview = 3,
    Content = 4,
    ContentReview = 5,
    Finalization = 6,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Development,
            Stage::Design,
            Stage::DesignReview,
            Stage::Content,
            Stage::ContentReview,
            Stage::Finalization,
        ]
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Development => "development",
            Stage::Design => "design",
            Stage::DesignReview => "design_review",
            Stage::Content => "content",
            Stage::ContentReview => "content_review",
            Stage::Finalization => "finalization",
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.number()
    }
}

impl TryFrom<u8> for Stage {
    type Error = PipelineError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Stage::all()
            .iter()
            .copied()
            .find(|s| s.number() == n)
            .ok_or_else(|| PipelineError::Validation(format!("unknown stage number {n}")))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Developer,
    Designer,
    Content,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::Admin, Role::Developer, Role::Designer, Role::Content]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
            Role::Designer => "designer",
            Role::Content => "content",
        }
    }

    /// Display label used by the operations team.
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "管理员",
            Role::Developer => "开发人员",
            Role::Designer => "设计师",
            Role::Content => "内容人员",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s || r.label() == s)
            .ok_or_else(|| PipelineError::Validation(format!("unknown role '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Review statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageReviewStatus {
    Designing,
    Pending,
    Approved,
    Rejected,
}

impl PackageReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageReviewStatus::Designing => "designing",
            PackageReviewStatus::Pending => "pending",
            PackageReviewStatus::Approved => "approved",
            PackageReviewStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ContentReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentReviewStatus::Pending => "pending",
            ContentReviewStatus::Approved => "approved",
            ContentReviewStatus::Rejected => "rejected",
        }
    }
}

// ---------------------------------------------------------------------------
// DraftStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftStatus {
    #[serde(rename = "待审核")]
    Pending,
    #[serde(rename = "已通过")]
    Approved,
    #[serde(rename = "已拒绝")]
    Rejected,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftStatus::Pending => "待审核",
            DraftStatus::Approved => "已通过",
            DraftStatus::Rejected => "已拒绝",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, DraftStatus::Pending)
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "待审核" | "pending" => Ok(DraftStatus::Pending),
            "已通过" | "approved" => Ok(DraftStatus::Approved),
            "已拒绝" | "rejected" => Ok(DraftStatus::Rejected),
            _ => Err(PipelineError::Validation(format!(
                "unknown draft status '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ReviewDecision / ClaimKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl std::str::FromStr for ReviewDecision {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(ReviewDecision::Approve),
            "reject" => Ok(ReviewDecision::Reject),
            _ => Err(PipelineError::Validation(format!(
                "decision must be 'approve' or 'reject', got '{s}'"
            ))),
        }
    }
}

/// Which pending task a claim takes ownership of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Design,
    Content,
}

impl ClaimKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimKind::Design => "design",
            ClaimKind::Content => "content",
        }
    }

    /// The product field the claim writes the owner into.
    pub fn owner_field(self) -> &'static str {
        match self {
            ClaimKind::Design => "package_designer_id",
            ClaimKind::Content => "content_creator_id",
        }
    }
}

impl std::str::FromStr for ClaimKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "design" => Ok(ClaimKind::Design),
            "content" => Ok(ClaimKind::Content),
            _ => Err(PipelineError::Validation(format!(
                "claim kind must be 'design' or 'content', got '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageSlot
// ---------------------------------------------------------------------------

/// One of the nine listing image positions, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Main,
    Audience,
    Comparison,
    Timeline,
    #[serde(rename = "comparison_2")]
    Comparison2,
    Ingredients,
    SellingPoints,
    Certificate,
    Usage,
}

impl ImageSlot {
    pub fn all() -> &'static [ImageSlot] {
        &[
            ImageSlot::Main,
            ImageSlot::Audience,
            ImageSlot::Comparison,
            ImageSlot::Timeline,
            ImageSlot::Comparison2,
            ImageSlot::Ingredients,
            ImageSlot::SellingPoints,
            ImageSlot::Certificate,
            ImageSlot::Usage,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSlot::Main => "main",
            ImageSlot::Audience => "audience",
            ImageSlot::Comparison => "comparison",
            ImageSlot::Timeline => "timeline",
            ImageSlot::Comparison2 => "comparison_2",
            ImageSlot::Ingredients => "ingredients",
            ImageSlot::SellingPoints => "selling_points",
            ImageSlot::Certificate => "certificate",
            ImageSlot::Usage => "usage",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Main => "主图",
            ImageSlot::Audience => "适用对象",
            ImageSlot::Comparison => "对比图",
            ImageSlot::Timeline => "周期图",
            ImageSlot::Comparison2 => "对比图2",
            ImageSlot::Ingredients => "成分图",
            ImageSlot::SellingPoints => "卖点归纳图",
            ImageSlot::Certificate => "无刺激图/证书",
            ImageSlot::Usage => "使用方法",
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageSlot {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageSlot::all()
            .iter()
            .copied()
            .find(|slot| slot.as_str() == s || slot.label() == s)
            .ok_or_else(|| PipelineError::Validation(format!("unknown image slot '{s}'")))
    }
}
