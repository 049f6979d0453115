use chrono::Utc;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::PgPool;
use uuid::Uuid;

use super::queries;
use crate::error::RepositoryError;
use crate::models::{NormalizedInvoice, StoredInvoice};
use crate::service::normalize_vendor_name;

/// 发票持久化协作方
pub trait InvoiceRepository: Send + Sync {
    fn insert<'a>(
        &'a self,
        invoice: &'a NormalizedInvoice,
    ) -> BoxFuture<'a, Result<StoredInvoice, RepositoryError>>;

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<StoredInvoice>, RepositoryError>>;
}

/// 为新发票分配 ID, 计算规范化供应商名
fn prepare(invoice: &NormalizedInvoice) -> StoredInvoice {
    StoredInvoice {
        id: Uuid::new_v4(),
        invoice: invoice.clone(),
        vendor_name_normalized: invoice.vendor_name.as_deref().and_then(normalize_vendor_name),
        created_at: Utc::now(),
    }
}

/// PostgreSQL 仓储
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl InvoiceRepository for PgInvoiceRepository {
    fn insert<'a>(
        &'a self,
        invoice: &'a NormalizedInvoice,
    ) -> BoxFuture<'a, Result<StoredInvoice, RepositoryError>> {
        async move {
            let stored = prepare(invoice);
            queries::insert_invoice(&self.pool, &stored).await?;
            Ok(stored)
        }
        .boxed()
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<StoredInvoice>, RepositoryError>> {
        queries::get_invoice(&self.pool, id).boxed()
    }
}

/// 内存仓储 (未配置数据库时使用)
#[derive(Default)]
pub struct MemoryInvoiceRepository {
    invoices: DashMap<Uuid, StoredInvoice>,
}

impl MemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

impl InvoiceRepository for MemoryInvoiceRepository {
    fn insert<'a>(
        &'a self,
        invoice: &'a NormalizedInvoice,
    ) -> BoxFuture<'a, Result<StoredInvoice, RepositoryError>> {
        let stored = prepare(invoice);
        self.invoices.insert(stored.id, stored.clone());
        futures::future::ready(Ok(stored)).boxed()
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, Result<Option<StoredInvoice>, RepositoryError>> {
        let found = self.invoices.get(&id).map(|entry| entry.value().clone());
        futures::future::ready(Ok(found)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    #[tokio::test]
    async fn memory_repository_round_trip() {
        let repo = MemoryInvoiceRepository::new();
        let invoice = NormalizedInvoice {
            vendor_name: Some("AWS".to_string()),
            invoice_date: None,
            total_amount: Some(BigDecimal::from_str("12.34").unwrap()),
            currency: Some("USD".to_string()),
            source_file_reference: None,
        };

        let stored = repo.insert(&invoice).await.unwrap();
        assert_eq!(stored.invoice, invoice);
        assert_eq!(stored.vendor_name_normalized.as_deref(), Some("amazon web services"));
        assert_eq!(repo.len(), 1);

        let fetched = repo.get(stored.id).await.unwrap();
        assert_eq!(fetched, Some(stored));
        assert_eq!(repo.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn inserts_get_distinct_ids() {
        let repo = MemoryInvoiceRepository::new();
        let invoice = NormalizedInvoice::default();

        let a = repo.insert(&invoice).await.unwrap();
        let b = repo.insert(&invoice).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.vendor_name_normalized, None);
    }
}
