//! `api` crate — thin HTTP surface over the orchestration core.
//!
//! Request binding and routing themselves are explicitly out of scope
//! (spec §1); this layer exists only so the rest of the system has a
//! contract surface to sit behind. Every handler defers immediately to
//! `db`/`engine`/`rulesvc`.
//!
//! Routes:
//!   GET    /healthz
//!   GET    /api/v1/schedulers
//!   GET    /api/v1/workflows?tenant_id=
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows/:id?tenant_id=
//!   DELETE /api/v1/workflows/:id?tenant_id=
//!   POST   /api/v1/workflows/:id/execute
//!   POST   /api/v1/rules/:id/run
//!   POST   /webhook/:workflow_id

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use db::DbPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub executor: Arc<engine::WorkflowExecutor>,
    pub rules: Arc<rulesvc::RuleScheduler>,
    pub schedulers: Arc<cron_core::SchedulerRegistry>,
}

pub async fn serve(bind: &str, state: AppState) -> Result<(), std::io::Error> {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api_router = Router::new()
        .route("/schedulers", get(handlers::schedulers::status))
        .route("/workflows", get(handlers::workflows::list).post(handlers::workflows::create))
        .route("/workflows/:id", get(handlers::workflows::get).delete(handlers::workflows::delete))
        .route("/workflows/:id/execute", post(handlers::executions::execute))
        .route("/rules/:id/run", post(handlers::executions::run_rule));

    let app = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api/v1", api_router)
        .route("/webhook/:workflow_id", post(handlers::webhooks::handle_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
