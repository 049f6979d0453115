use crate::api::handlers;
use crate::db::InvoiceRepository;
use crate::service::IngestService;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

/// 共享状态: 录入服务 + 持久化协作方
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub repository: Arc<dyn InvoiceRepository>,
}

impl AppState {
    pub fn new(ingest: Arc<IngestService>, repository: Arc<dyn InvoiceRepository>) -> Self {
        Self { ingest, repository }
    }
}

/// 构建路由
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/invoices", post(handlers::create_invoice))
        .route("/api/invoices/:id", get(handlers::get_invoice))
        .route("/api/files/:reference", get(handlers::get_file))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .with_state(state)
}
