//! AI draft lifecycle: 待审核 until an admin approves or rejects it, terminal
//! afterwards. Approval spawns exactly one stage-1 product.

use crate::error::{PipelineError, Result};
use crate::product::{is_blank, non_blank, Product, ProductBrief};
use crate::store::{from_record, to_record, Filter, RecordId, RecordStore, Table};
use crate::types::{DraftStatus, ReviewDecision, Role};
use crate::user::{User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The content a draft proposes, as produced by plan generation and edited
/// by the developer before saving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftInput {
    pub develop_month: Option<String>,
    pub category: Option<String>,
    pub market: Option<String>,
    pub platform: Option<String>,
    pub positioning: Option<String>,
    pub selling_point: Option<String>,
    pub ingredients: Option<String>,
    pub efficacy: Option<String>,
    pub volume: Option<String>,
    pub scent: Option<String>,
    pub texture_color: Option<String>,
    pub pricing: Option<String>,
    pub title: Option<String>,
    pub keywords: Option<String>,
    pub packaging_requirements: Option<String>,
    pub extract_provider: Option<String>,
    pub generate_provider: Option<String>,
    pub competitors_data: Option<Value>,
    pub ai_explanations: Option<Value>,
    pub estimated_cost: f64,
}

impl DraftInput {
    /// Category, market and platform, plus a positioning or a title.
    pub fn check_required(&self) -> Result<()> {
        let mut missing: Vec<&str> = [
            ("category", &self.category),
            ("market", &self.market),
            ("platform", &self.platform),
        ]
        .into_iter()
        .filter(|(_, v)| is_blank(v))
        .map(|(name, _)| name)
        .collect();
        if is_blank(&self.positioning) && is_blank(&self.title) {
            missing.push("positioning or title");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(format!(
                "draft is missing: {}",
                missing.join(", ")
            )))
        }
    }

    /// The product brief an approved draft turns into.
    pub fn to_brief(&self) -> ProductBrief {
        ProductBrief {
            develop_month: self.develop_month.clone(),
            category: self.category.clone(),
            market: self.market.clone(),
            platform: self.platform.clone(),
            positioning: self.positioning.clone(),
            selling_point: self.selling_point.clone(),
            ingredients: self.ingredients.clone(),
            main_efficacy: self.efficacy.clone(),
            volume: self.volume.clone(),
            scent: self.scent.clone(),
            texture_color: self.texture_color.clone(),
            pricing: self.pricing.clone(),
            product_title: self.title.clone(),
            seo_keywords: self.keywords.clone(),
            packaging_requirements: self.packaging_requirements.clone(),
            ..ProductBrief::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub id: RecordId,
    #[serde(flatten)]
    pub input: DraftInput,
    pub status: DraftStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_comment: Option<String>,
}

impl Draft {
    pub fn load(store: &dyn RecordStore, id: RecordId) -> Result<Self> {
        match store.get_by_id(Table::AiDrafts, id)? {
            Some(record) => from_record(record),
            None => Err(PipelineError::DraftNotFound(id)),
        }
    }
}

/// Save a generated plan as a pending draft.
pub fn create_draft(store: &dyn RecordStore, input: DraftInput, creator: &User) -> Result<Draft> {
    creator.require(&[Role::Developer, Role::Admin], "create drafts")?;
    input.check_required()?;

    let mut record = to_record(&Draft {
        id: 0,
        input,
        status: DraftStatus::Pending,
        created_by: creator.id,
        created_at: Utc::now(),
        reviewed_by: None,
        reviewed_at: None,
        review_comment: None,
    })?;
    record.remove("id");
    let draft: Draft = from_record(store.insert(Table::AiDrafts, record)?)?;
    tracing::info!(draft = draft.id, user = creator.id, "draft created");
    Ok(draft)
}

/// Drafts, newest first.
pub fn list_drafts(
    store: &dyn RecordStore,
    status: Option<DraftStatus>,
    created_by: Option<UserId>,
) -> Result<Vec<Draft>> {
    let mut filter = Filter::all();
    if let Some(status) = status {
        filter = filter.eq("status", status.as_str());
    }
    if let Some(user) = created_by {
        filter = filter.eq("created_by", user);
    }
    let mut drafts: Vec<Draft> = store
        .get(Table::AiDrafts, &filter)?
        .into_iter()
        .map(from_record)
        .collect::<Result<_>>()?;
    drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(drafts)
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftReview {
    pub draft: Draft,
    /// The product an approval created or reused.
    pub product: Option<Product>,
}

#[derive(Serialize)]
struct ReviewPatch<'a> {
    status: DraftStatus,
    reviewed_by: UserId,
    reviewed_at: DateTime<Utc>,
    review_comment: &'a str,
}

/// Phase one of approval. The look-up and the insert happen in one store
/// write, so concurrent approvals and retries after a partial failure all
/// land on the same product.
fn product_for(store: &dyn RecordStore, draft: &Draft, now: DateTime<Utc>) -> Result<Product> {
    let mut product = Product::new(draft.input.to_brief(), Some(draft.created_by), now);
    product.is_ai_generated = true;
    product.created_from_draft_id = Some(draft.id);
    let mut record = to_record(&product)?;
    record.remove("id");

    let linked = Filter::all().eq("created_from_draft_id", draft.id);
    let (stored, inserted) = store.insert_unless(Table::Products, &linked, record)?;
    let product: Product = from_record(stored)?;
    if inserted {
        tracing::info!(draft = draft.id, product = product.id, "product created from draft");
    } else {
        tracing::info!(
            draft = draft.id,
            product = product.id,
            "reusing product from earlier approval"
        );
    }
    Ok(product)
}

/// Approve or reject a pending draft. A comment is required either way.
///
/// Approval is two writes: the product, then the draft. If the second write
/// fails the product is left in place and `PartialFailure` names it. A
/// concurrent approval that closed the draft first owns the same product, so
/// the slower reviewer only sees `InvalidState`.
pub fn review_draft(
    store: &dyn RecordStore,
    draft_id: RecordId,
    decision: ReviewDecision,
    comment: Option<&str>,
    reviewer: &User,
) -> Result<DraftReview> {
    let Some(comment) = non_blank(comment) else {
        return Err(PipelineError::Validation(
            "a review comment is required to approve or reject a draft".to_string(),
        ));
    };
    reviewer.require(&[Role::Admin], "review drafts")?;

    let draft = Draft::load(store, draft_id)?;
    if draft.status.is_terminal() {
        return Err(already_reviewed(draft_id, draft.status));
    }

    let now = Utc::now();
    let (status, product) = match decision {
        ReviewDecision::Approve => {
            let product = product_for(store, &draft, now)?;
            (DraftStatus::Approved, Some(product))
        }
        ReviewDecision::Reject => (DraftStatus::Rejected, None),
    };

    let patch = to_record(&ReviewPatch {
        status,
        reviewed_by: reviewer.id,
        reviewed_at: now,
        review_comment: &comment,
    })?;
    let guard = Filter::all().eq("status", DraftStatus::Pending.as_str());
    let closed = store.update_if(Table::AiDrafts, draft_id, &guard, patch);

    match (closed, product) {
        (Ok(Some(record)), product) => {
            let draft: Draft = from_record(record)?;
            tracing::info!(
                draft = draft_id,
                reviewer = reviewer.id,
                status = %draft.status,
                product = ?product.as_ref().map(|p| p.id),
                "draft reviewed"
            );
            Ok(DraftReview { draft, product })
        }
        (Ok(None), None) => {
            let current = Draft::load(store, draft_id)?;
            Err(already_reviewed(draft_id, current.status))
        }
        (Ok(None), Some(product)) => {
            let current = Draft::load(store, draft_id)?;
            if current.status == DraftStatus::Approved {
                return Err(already_reviewed(draft_id, current.status));
            }
            tracing::error!(
                draft = draft_id,
                product = product.id,
                "draft closed concurrently after product creation"
            );
            Err(PipelineError::PartialFailure {
                draft_id,
                product_id: product.id,
                detail: "the draft was reviewed concurrently".to_string(),
            })
        }
        (Err(e), Some(product)) => {
            tracing::error!(
                draft = draft_id,
                product = product.id,
                "draft approval left an orphan product: {e}"
            );
            Err(PipelineError::PartialFailure {
                draft_id,
                product_id: product.id,
                detail: e.to_string(),
            })
        }
        (Err(e), None) => Err(e),
    }
}

fn already_reviewed(draft_id: RecordId, status: DraftStatus) -> PipelineError {
    PipelineError::invalid_state(
        "draft",
        "review",
        format!("draft {draft_id} is already {status}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Record, RedbStore};
    use crate::types::Stage;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: RedbStore,
        admin: User,
        dev: User,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("test.db")).unwrap();
        let admin = User::create(&store, "Admin", Role::Admin).unwrap();
        let dev = User::create(&store, "Dev", Role::Developer).unwrap();
        Fixture {
            _dir: dir,
            store,
            admin,
            dev,
        }
    }

    fn input() -> DraftInput {
        DraftInput {
            category: Some("Shampoo".to_string()),
            market: Some("Indonesia".to_string()),
            platform: Some("Shopee".to_string()),
            positioning: Some("anti-dandruff for humid climates".to_string()),
            selling_point: Some("cooling scalp care".to_string()),
            efficacy: Some("reduces flakes".to_string()),
            title: Some("Cooling Anti-Dandruff Shampoo".to_string()),
            keywords: Some("shampoo, dandruff".to_string()),
            estimated_cost: 0.02,
            ..DraftInput::default()
        }
    }

    /// Delegates to a real store but refuses writes to the drafts table.
    struct FailingDraftWrites<'a>(&'a RedbStore);

    impl RecordStore for FailingDraftWrites<'_> {
        fn get(&self, table: Table, filter: &Filter) -> Result<Vec<Record>> {
            self.0.get(table, filter)
        }
        fn get_by_id(&self, table: Table, id: RecordId) -> Result<Option<Record>> {
            self.0.get_by_id(table, id)
        }
        fn insert(&self, table: Table, record: Record) -> Result<Record> {
            self.0.insert(table, record)
        }
        fn insert_unless(
            &self,
            table: Table,
            existing: &Filter,
            record: Record,
        ) -> Result<(Record, bool)> {
            self.0.insert_unless(table, existing, record)
        }
        fn update_if(
            &self,
            table: Table,
            id: RecordId,
            guard: &Filter,
            patch: Record,
        ) -> Result<Option<Record>> {
            if table == Table::AiDrafts {
                return Err(PipelineError::storage("ai_drafts", "update", "connection reset"));
            }
            self.0.update_if(table, id, guard, patch)
        }
        fn delete(&self, table: Table, id: RecordId) -> Result<bool> {
            self.0.delete(table, id)
        }
    }

    /// Delegates to a real store, pausing on draft reads so concurrent
    /// reviewers both see the draft as pending.
    struct SlowDraftReads<'a>(&'a RedbStore);

    impl RecordStore for SlowDraftReads<'_> {
        fn get(&self, table: Table, filter: &Filter) -> Result<Vec<Record>> {
            self.0.get(table, filter)
        }
        fn get_by_id(&self, table: Table, id: RecordId) -> Result<Option<Record>> {
            let record = self.0.get_by_id(table, id);
            if table == Table::AiDrafts {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            record
        }
        fn insert(&self, table: Table, record: Record) -> Result<Record> {
            self.0.insert(table, record)
        }
        fn insert_unless(
            &self,
            table: Table,
            existing: &Filter,
            record: Record,
        ) -> Result<(Record, bool)> {
            self.0.insert_unless(table, existing, record)
        }
        fn update_if(
            &self,
            table: Table,
            id: RecordId,
            guard: &Filter,
            patch: Record,
        ) -> Result<Option<Record>> {
            self.0.update_if(table, id, guard, patch)
        }
        fn delete(&self, table: Table, id: RecordId) -> Result<bool> {
            self.0.delete(table, id)
        }
    }

    #[test]
    fn create_requires_market_platform_and_positioning_or_title() {
        let f = fixture();
        let mut bad = input();
        bad.market = None;
        bad.positioning = None;
        bad.title = Some("  ".to_string());
        let err = create_draft(&f.store, bad, &f.dev).unwrap_err();
        assert!(err.to_string().contains("market, positioning or title"));

        let mut title_only = input();
        title_only.positioning = None;
        let d = create_draft(&f.store, title_only, &f.dev).unwrap();
        assert_eq!(d.status, DraftStatus::Pending);
        assert_eq!(d.created_by, f.dev.id);
    }

    #[test]
    fn list_filters_and_orders_newest_first() {
        let f = fixture();
        let a = create_draft(&f.store, input(), &f.dev).unwrap();
        let b = create_draft(&f.store, input(), &f.admin).unwrap();
        review_draft(&f.store, a.id, ReviewDecision::Reject, Some("weak"), &f.admin)
            .unwrap();

        let all = list_drafts(&f.store, None, None).unwrap();
        assert_eq!(all.iter().map(|d| d.id).collect::<Vec<_>>(), vec![b.id, a.id]);
        let pending = list_drafts(&f.store, Some(DraftStatus::Pending), None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
        let mine = list_drafts(&f.store, None, Some(f.dev.id)).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a.id);
    }

    #[test]
    fn comment_is_required_for_approve_and_reject() {
        let f = fixture();
        let d = create_draft(&f.store, input(), &f.dev).unwrap();
        for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
            let err = review_draft(&f.store, d.id, decision, Some(" "), &f.admin).unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)));
        }
        assert!(Product::list(&f.store, &Filter::all()).unwrap().is_empty());
    }

    #[test]
    fn approve_spawns_exactly_one_product() {
        let f = fixture();
        let d = create_draft(&f.store, input(), &f.dev).unwrap();
        let review =
            review_draft(&f.store, d.id, ReviewDecision::Approve, Some("go"), &f.admin).unwrap();

        assert_eq!(review.draft.status, DraftStatus::Approved);
        assert_eq!(review.draft.reviewed_by, Some(f.admin.id));
        assert_eq!(review.draft.review_comment.as_deref(), Some("go"));
        assert!(review.draft.reviewed_at.is_some());

        let product = review.product.unwrap();
        assert_eq!(product.state.stage(), Stage::Development);
        assert_eq!(product.state.status(), "进行中");
        assert!(product.is_ai_generated);
        assert_eq!(product.created_from_draft_id, Some(d.id));
        assert_eq!(product.developer_id, Some(f.dev.id));
        assert_eq!(product.brief.main_efficacy.as_deref(), Some("reduces flakes"));
        assert_eq!(
            product.brief.product_title.as_deref(),
            Some("Cooling Anti-Dandruff Shampoo")
        );
        assert_eq!(product.brief.seo_keywords.as_deref(), Some("shampoo, dandruff"));

        let linked =
            Product::list(&f.store, &Filter::all().eq("created_from_draft_id", d.id)).unwrap();
        assert_eq!(linked.len(), 1);
    }

    #[test]
    fn terminal_drafts_cannot_be_reviewed_again() {
        let f = fixture();
        let approved = create_draft(&f.store, input(), &f.dev).unwrap();
        let rejected = create_draft(&f.store, input(), &f.dev).unwrap();
        review_draft(&f.store, approved.id, ReviewDecision::Approve, Some("ok"), &f.admin)
            .unwrap();
        let r = review_draft(&f.store, rejected.id, ReviewDecision::Reject, Some("no"), &f.admin)
            .unwrap();
        assert!(r.product.is_none());

        for id in [approved.id, rejected.id] {
            for decision in [ReviewDecision::Approve, ReviewDecision::Reject] {
                let err =
                    review_draft(&f.store, id, decision, Some("again"), &f.admin).unwrap_err();
                assert!(matches!(err, PipelineError::InvalidState { .. }));
            }
        }
        assert_eq!(Product::list(&f.store, &Filter::all()).unwrap().len(), 1);
    }

    #[test]
    fn failed_draft_update_is_partial_failure_and_retry_reuses_product() {
        let f = fixture();
        let d = create_draft(&f.store, input(), &f.dev).unwrap();

        let failing = FailingDraftWrites(&f.store);
        let err = review_draft(&failing, d.id, ReviewDecision::Approve, Some("go"), &f.admin)
            .unwrap_err();
        let PipelineError::PartialFailure {
            draft_id,
            product_id,
            ..
        } = &err
        else {
            panic!("expected partial failure, got {err:?}");
        };
        assert_eq!(*draft_id, d.id);
        let product_id = *product_id;
        assert_eq!(Draft::load(&f.store, d.id).unwrap().status, DraftStatus::Pending);

        let review =
            review_draft(&f.store, d.id, ReviewDecision::Approve, Some("go"), &f.admin).unwrap();
        assert_eq!(review.product.unwrap().id, product_id);
        assert_eq!(Product::list(&f.store, &Filter::all()).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_approvals_spawn_one_product() {
        let f = fixture();
        let d = create_draft(&f.store, input(), &f.dev).unwrap();
        let other_admin = User::create(&f.store, "Second Admin", Role::Admin).unwrap();
        let slow = SlowDraftReads(&f.store);

        let results: Vec<Result<DraftReview>> = std::thread::scope(|s| {
            let handles: Vec<_> = [&f.admin, &other_admin]
                .into_iter()
                .map(|admin| {
                    let slow = &slow;
                    s.spawn(move || {
                        review_draft(slow, d.id, ReviewDecision::Approve, Some("go"), admin)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let approved: Vec<&DraftReview> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(approved.len(), 1, "{results:?}");
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, PipelineError::InvalidState { .. }), "{loser:?}");

        let linked =
            Product::list(&f.store, &Filter::all().eq("created_from_draft_id", d.id)).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(approved[0].product.as_ref().unwrap().id, linked[0].id);
        assert_eq!(Draft::load(&f.store, d.id).unwrap().status, DraftStatus::Approved);
    }

    #[test]
    fn only_admins_review_drafts() {
        let f = fixture();
        let d = create_draft(&f.store, input(), &f.dev).unwrap();
        let err = review_draft(&f.store, d.id, ReviewDecision::Approve, Some("mine"), &f.dev)
            .unwrap_err();
        assert!(matches!(err, PipelineError::PermissionDenied { .. }));
    }
}
