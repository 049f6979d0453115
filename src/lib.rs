pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;

pub use config::AppConfig;
pub use db::{create_pool, InvoiceRepository, MemoryInvoiceRepository, PgInvoiceRepository};
pub use error::{IngestError, RepositoryError, StorageError};
pub use service::IngestService;
pub use storage::InvoiceFileStorage;
