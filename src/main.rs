use invoice_ingest::api::{self, AppState};
use invoice_ingest::{
    create_pool, AppConfig, IngestService, InvoiceRepository, MemoryInvoiceRepository,
    PgInvoiceRepository,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!(
        "Starting server with config: server={:?}, storage={:?}, database configured={}",
        config.server,
        config.storage,
        config.database.url.is_some()
    );

    let ingest = Arc::new(IngestService::from_config(&config)?);
    info!("Invoice uploads stored under {}", ingest.storage().base_dir().display());

    // 持久化: 配置了数据库则用 PostgreSQL, 否则退回内存
    let repository: Arc<dyn InvoiceRepository> = match &config.database.url {
        Some(url) => {
            let pool = create_pool(url, config.database.max_connections).await?;
            info!("Database pool created");
            Arc::new(PgInvoiceRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, invoices are kept in memory only");
            Arc::new(MemoryInvoiceRepository::new())
        }
    };

    let app = api::create_router(
        AppState::new(ingest, repository),
        config.server.max_upload_bytes,
    );

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/invoices              - ingest invoice (JSON or multipart)");
    info!("  GET  /api/invoices/:id          - fetch stored invoice");
    info!("  GET  /api/files/:reference      - download uploaded file");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
