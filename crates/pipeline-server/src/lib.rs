pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use pipeline_core::workspace::Workspace;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(ws: Workspace) -> Router {
    let uploads = ServeDir::new(ws.objects.dir());
    let app_state = state::AppState::new(ws);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health::health))
        // Users and bottles
        .route(
            "/api/users",
            get(routes::library::list_users).post(routes::library::create_user),
        )
        .route(
            "/api/bottles",
            get(routes::library::list_bottles).post(routes::library::create_bottle),
        )
        // Products
        .route(
            "/api/products",
            get(routes::products::list_products).post(routes::products::create_product),
        )
        .route(
            "/api/products/import",
            post(routes::products::import_products),
        )
        .route(
            "/api/products/{id}",
            get(routes::products::get_product).delete(routes::products::delete_product),
        )
        .route(
            "/api/products/{id}/brief",
            post(routes::workflow::update_brief),
        )
        .route(
            "/api/products/{id}/dev-assets",
            post(routes::workflow::attach_dev_assets),
        )
        .route(
            "/api/products/{id}/submit",
            post(routes::workflow::submit_development),
        )
        .route(
            "/api/products/{id}/claim",
            post(routes::workflow::claim_product),
        )
        .route(
            "/api/products/{id}/design",
            post(routes::workflow::attach_design),
        )
        .route(
            "/api/products/{id}/submit-design",
            post(routes::workflow::submit_design),
        )
        .route(
            "/api/products/{id}/review-design",
            post(routes::workflow::review_design),
        )
        .route(
            "/api/products/{id}/content-draft",
            post(routes::workflow::save_content_draft),
        )
        .route(
            "/api/products/{id}/submit-content",
            post(routes::workflow::submit_content),
        )
        .route(
            "/api/products/{id}/review-content",
            post(routes::workflow::review_content),
        )
        .route(
            "/api/products/{id}/translation",
            post(routes::workflow::complete_translation),
        )
        // Queues
        .route("/api/queues/{queue}", get(routes::queues::get_queue))
        // Drafts
        .route(
            "/api/drafts",
            get(routes::drafts::list_drafts).post(routes::drafts::create_draft),
        )
        .route("/api/drafts/{id}", get(routes::drafts::get_draft))
        .route(
            "/api/drafts/{id}/review",
            post(routes::drafts::review_draft),
        )
        // Uploads and AI
        .route("/api/uploads", post(routes::uploads::upload))
        .route("/api/ai/generate", post(routes::ai::generate))
        .route("/api/ai/extract", post(routes::ai::extract))
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Open the workspace at `root` and serve the API until Ctrl-C.
///
/// Uploaded files are served under `/uploads`; set `objects.public_base_url`
/// to `http://<host>:<port>/uploads` to hand out URLs that resolve here.
pub async fn serve(root: PathBuf, port: u16) -> anyhow::Result<()> {
    let ws = tokio::task::spawn_blocking(move || Workspace::open(&root)).await??;
    let project = ws.config.project.name.clone();
    let app = build_router(ws);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!(project = %project, "pipeline API listening on http://localhost:{actual_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
