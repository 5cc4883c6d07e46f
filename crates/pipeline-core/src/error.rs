use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not initialized: run 'pipeline init'")]
    NotInitialized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot {action} {entity}: {reason}")]
    InvalidState {
        entity: String,
        action: String,
        reason: String,
    },

    #[error("product {product} is already claimed ({kind})")]
    AlreadyClaimed { product: u64, kind: String },

    #[error("permission denied: {role} may not {action}")]
    PermissionDenied { role: String, action: String },

    #[error("storage error on {table} during {op}: {detail}")]
    Storage {
        table: String,
        op: String,
        detail: String,
    },

    #[error("malformed AI response: {reason}")]
    AiFormat { reason: String, raw: String },

    #[error("AI provider '{provider}' request failed: {detail}")]
    AiRequest { provider: String, detail: String },

    #[error(
        "draft {draft_id} approval partially failed: product {product_id} exists but the draft was not closed: {detail}"
    )]
    PartialFailure {
        draft_id: u64,
        product_id: u64,
        detail: String,
    },

    #[error("product not found: {0}")]
    ProductNotFound(u64),

    #[error("draft not found: {0}")]
    DraftNotFound(u64),

    #[error("user not found: {0}")]
    UserNotFound(u64),

    #[error("bottle not found: {0}")]
    BottleNotFound(u64),

    #[error("record not found: {table}/{id}")]
    RecordNotFound { table: String, id: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotInitialized => "not_initialized",
            PipelineError::Validation(_) => "validation",
            PipelineError::InvalidState { .. } => "invalid_state",
            PipelineError::AlreadyClaimed { .. } => "already_claimed",
            PipelineError::PermissionDenied { .. } => "permission_denied",
            PipelineError::Storage { .. } => "storage",
            PipelineError::AiFormat { .. } => "ai_format",
            PipelineError::AiRequest { .. } => "ai_request",
            PipelineError::PartialFailure { .. } => "partial_failure",
            PipelineError::ProductNotFound(_)
            | PipelineError::DraftNotFound(_)
            | PipelineError::UserNotFound(_)
            | PipelineError::BottleNotFound(_)
            | PipelineError::RecordNotFound { .. } => "not_found",
            PipelineError::Io(_) => "io",
            PipelineError::Yaml(_) => "yaml",
            PipelineError::Json(_) => "json",
        }
    }

    pub(crate) fn invalid_state(
        entity: &str,
        action: &str,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::InvalidState {
            entity: entity.to_string(),
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(table: &str, op: &str, detail: impl ToString) -> Self {
        PipelineError::Storage {
            table: table.to_string(),
            op: op.to_string(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
