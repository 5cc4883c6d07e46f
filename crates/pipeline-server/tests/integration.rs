use axum::http::StatusCode;
use http_body_util::BodyExt;
use pipeline_core::config::ContentConfig;
use pipeline_core::workspace::Workspace;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialise a workspace in `dir` and build a router over it.
fn app(dir: &TempDir) -> axum::Router {
    let ws = Workspace::init(dir.path(), "test-project").unwrap();
    pipeline_server::build_router(ws)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<u64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header("x-user-id", user.to_string());
    }
    let body = match body {
        Some(body) => {
            req = req.header("content-type", "application/json");
            axum::body::Body::from(serde_json::to_vec(&body).unwrap())
        }
        None => axum::body::Body::empty(),
    };
    let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &axum::Router, uri: &str, user: Option<u64>) -> (StatusCode, Value) {
    send(app, "GET", uri, user, None).await
}

async fn post(app: &axum::Router, uri: &str, user: u64, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(user), Some(body)).await
}

async fn create_user(app: &axum::Router, name: &str, role: &str) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({ "name": name, "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["id"].as_u64().unwrap()
}

struct Team {
    admin: u64,
    dev: u64,
    designer: u64,
    writer: u64,
}

async fn team(app: &axum::Router) -> Team {
    Team {
        admin: create_user(app, "Admin", "admin").await,
        dev: create_user(app, "Dev", "开发人员").await,
        designer: create_user(app, "Mei", "designer").await,
        writer: create_user(app, "Writer", "content").await,
    }
}

async fn create_product(app: &axum::Router, dev: u64) -> u64 {
    let (status, body) = post(
        app,
        "/api/products",
        dev,
        json!({ "category": "Shampoo", "selling_point": "deep clean", "market": "ID" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["id"].as_u64().unwrap()
}

fn complete_work() -> Value {
    let cfg = ContentConfig::default();
    let sets: Vec<Vec<Value>> = (1..=cfg.image_sets)
        .map(|set| {
            cfg.slots
                .iter()
                .map(|slot| {
                    json!({ "type": slot, "url": format!("https://cdn.test/s{set}/{slot}.png") })
                })
                .collect()
        })
        .collect();
    let selected: Vec<Value> = cfg
        .slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            json!({
                "type": slot,
                "from_set": 1,
                "url": sets[0][i]["url"],
                "order": i + 1,
            })
        })
        .collect();
    let bullet_points: Vec<String> = (1..=cfg.bullet_points)
        .map(|i| format!("point {i}"))
        .collect();
    json!({
        "competitors_data": {
            "competitors": [
                {
                    "selling_point": "mint",
                    "price": "IDR 45,000",
                    "rating": "4.8",
                    "sales_volume": "10k+"
                }
            ],
            "differentiation": "longer-lasting cooling",
            "pricing": "IDR 49,000"
        },
        "manual_title": "Deep clean shampoo",
        "manual_bullet_points": bullet_points,
        "manual_description": "A shampoo",
        "manual_keywords": "shampoo",
        "image_sets_uploaded": sets,
        "selected_images_by_content": selected,
    })
}

// ---------------------------------------------------------------------------
// Health / users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_project() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = get(&app, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["project"], "test-project");
}

#[tokio::test]
async fn unknown_role_is_400() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        None,
        Some(json!({ "name": "X", "role": "finance" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn missing_user_header_is_400() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        None,
        Some(json!({ "category": "Shampoo", "selling_point": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_requires_category_and_selling_point() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(&app, "/api/products", t.dev, json!({ "category": "Shampoo" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("selling_point"));

    let (status, _) = get(&app, "/api/products", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn designer_cannot_create_products() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(
        &app,
        "/api/products",
        t.designer,
        json!({ "category": "Shampoo", "selling_point": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission_denied");
}

#[tokio::test]
async fn create_with_inline_competitor_image() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(
        &app,
        "/api/products",
        t.dev,
        json!({
            "category": "Shampoo",
            "selling_point": "deep clean",
            "competitor_images": [{ "content_type": "image/png", "data": "AQID" }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["competitor_1_img"].as_str().unwrap();
    assert!(url.ends_with(".png"));
    assert!(body["competitor_2_img"].is_null());
    assert_eq!(body["stage"], 1);
    assert_eq!(body["owner"]["kind"], "developer");
}

#[tokio::test]
async fn unknown_product_is_404() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = get(&app, "/api/products/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn import_reports_skipped_rows() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(
        &app,
        "/api/products/import",
        t.dev,
        json!({ "rows": [
            { "category": "Shampoo", "selling_point": "a" },
            { "category": "Serum" },
            { "category": "Mask", "selling_point": "c" },
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["skipped"][0]["row"], 2);

    let (_, list) = get(&app, "/api/products?stage=1", None).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_removes_product() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let id = create_product(&app, t.dev).await;
    let (status, body) =
        send(&app, "DELETE", &format!("/api/products/{id}"), Some(t.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    let (status, _) = get(&app, &format!("/api/products/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_without_assets_is_400() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let id = create_product(&app, t.dev).await;
    let (status, body) = post(&app, &format!("/api/products/{id}/submit"), t.dev, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("bottle_img"));
}

#[tokio::test]
async fn second_claim_is_409() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let other = create_user(&app, "Lin", "designer").await;
    let id = create_product(&app, t.dev).await;
    let uri = format!("/api/products/{id}/claim");

    let (status, body) = post(&app, &uri, t.designer, json!({ "kind": "design" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stage"], 2);
    assert_eq!(body["package_designer_id"], t.designer);

    let (status, body) = post(&app, &uri, other, json!({ "kind": "design" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_claimed");
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let id = create_product(&app, t.dev).await;
    let p = |action: &str| format!("/api/products/{id}/{action}");

    // Stage 1 -> 2
    let (status, body) = post(
        &app,
        &p("dev-assets"),
        t.dev,
        json!({
            "bottle_img": "https://cdn.test/bottle.png",
            "ref_packaging_urls": ["https://cdn.test/ref1.png"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = post(&app, &p("submit"), t.dev, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stage"], 2);
    assert_eq!(body["owner"]["kind"], "awaiting_designer");

    let (_, queue) = get(&app, "/api/queues/design", Some(t.designer)).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    // Stage 2 -> 3, rejected once
    let (status, _) = post(&app, &p("claim"), t.designer, json!({ "kind": "design" })).await;
    assert_eq!(status, StatusCode::OK);
    let design = json!({ "url": "https://cdn.test/d1.png" });
    let (status, _) = post(&app, &p("design"), t.designer, design).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = post(&app, &p("submit-design"), t.designer, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], 3);
    assert_eq!(body["has_design"], true);

    let approve = json!({ "decision": "approve" });
    let (status, _) = post(&app, &p("review-design"), t.designer, approve.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let bare_reject = json!({ "decision": "reject" });
    let (status, _) = post(&app, &p("review-design"), t.admin, bare_reject).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = post(
        &app,
        &p("review-design"),
        t.admin,
        json!({ "decision": "reject", "note": "logo too small" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], 2);
    assert_eq!(body["package_review_status"], "rejected");
    assert_eq!(body["review_history"].as_array().unwrap().len(), 1);
    assert_eq!(body["review_history"][0]["note"], "logo too small");

    post(&app, &p("design"), t.designer, json!({ "url": "https://cdn.test/d2.png" })).await;
    post(&app, &p("submit-design"), t.designer, json!({})).await;
    let (status, body) = post(&app, &p("review-design"), t.admin, approve.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], 4);
    assert_eq!(body["review_history"].as_array().unwrap().len(), 1);

    // Stage 4 -> 5 -> 6
    let (status, _) = post(&app, &p("claim"), t.writer, json!({ "kind": "content" })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = get(&app, "/api/queues/content-work", Some(t.writer)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, body) = post(&app, &p("submit-content"), t.writer, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let work = complete_work();
    let (status, body) = post(&app, &p("submit-content"), t.writer, json!({ "work": work })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stage"], 5);
    assert_eq!(body["content_review_status"], "pending");
    assert_eq!(body["pricing"], "IDR 49,000");
    assert_eq!(body["competitors_data"]["differentiation"], "longer-lasting cooling");

    let (status, body) = post(&app, &p("review-content"), t.admin, approve).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content_review_status"], "approved");

    let translations: Vec<Value> = work["selected_images_by_content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            json!({ "type": s["type"], "url": s["url"], "cn_text": "中文", "id_text": "teks" })
        })
        .collect();
    let (status, body) = post(
        &app,
        &p("translation"),
        t.writer,
        json!({ "translations": translations }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["stage"], 6);
    assert_eq!(body["translation_complete"], true);
    assert_eq!(body["owner"]["kind"], "business");
}

#[tokio::test]
async fn action_in_wrong_stage_is_422() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let id = create_product(&app, t.dev).await;
    let (status, body) = post(
        &app,
        &format!("/api/products/{id}/review-design"),
        t.admin,
        json!({ "decision": "approve" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_state");
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

fn draft_input() -> Value {
    json!({
        "category": "Serum",
        "market": "ID",
        "platform": "Shopee",
        "positioning": "brightening",
        "selling_point": "vitamin C",
        "title": "Glow Serum",
        "generate_provider": "claude",
    })
}

#[tokio::test]
async fn draft_missing_fields_is_400() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(&app, "/api/drafts", t.dev, json!({ "category": "Serum" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("market"));
}

#[tokio::test]
async fn approving_a_draft_creates_a_product() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, draft) = post(&app, "/api/drafts", t.dev, draft_input()).await;
    assert_eq!(status, StatusCode::OK, "{draft}");
    assert_eq!(draft["status"], "待审核");
    let id = draft["id"].as_u64().unwrap();
    let review = format!("/api/drafts/{id}/review");

    let (status, _) = post(&app, &review, t.admin, json!({ "decision": "approve" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(
        &app,
        &review,
        t.admin,
        json!({ "decision": "approve", "comment": "go" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["draft"]["status"], "已通过");
    assert_eq!(body["draft"]["reviewed_by"], t.admin);
    assert_eq!(body["product"]["stage"], 1);
    assert_eq!(body["product"]["is_ai_generated"], true);
    assert_eq!(body["product"]["created_from_draft_id"], id);
    assert_eq!(body["product"]["product_title"], "Glow Serum");

    let (status, body) = post(
        &app,
        &review,
        t.admin,
        json!({ "decision": "reject", "comment": "again" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_state");

    let (_, approved) = get(&app, "/api/drafts?status=approved", None).await;
    assert_eq!(approved.as_array().unwrap().len(), 1);
    let (_, pending) = get(&app, "/api/drafts?status=pending", None).await;
    assert!(pending.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Uploads / AI
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_returns_url() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(
        &app,
        "/api/uploads",
        t.dev,
        json!({ "content_type": "image/jpeg", "data": "/9j/4AAQ" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["url"].as_str().unwrap().ends_with(".jpg"));

    let (status, _) = post(
        &app,
        "/api/uploads",
        t.dev,
        json!({ "content_type": "image/png", "data": "not base64!" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extract_needs_exactly_one_source() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, body) = post(&app, "/api/ai/extract", t.dev, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("url or screenshots"));
}

#[tokio::test]
async fn generate_validates_before_calling_provider() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let t = team(&app).await;
    let (status, _) = post(&app, "/api/ai/generate", t.designer, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let partial = json!({ "category": "Serum" });
    let (status, body) = post(&app, "/api/ai/generate", t.dev, partial).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}
