use crate::error::RepositoryError;
use crate::models::{NormalizedInvoice, StoredInvoice};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

/// 单条语句超时
const STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// invoices 表行
#[derive(Debug, Clone, FromRow)]
struct InvoiceRow {
    id: Uuid,
    vendor_name: Option<String>,
    vendor_name_normalized: Option<String>,
    invoice_date: Option<NaiveDate>,
    total_amount: Option<BigDecimal>,
    currency: Option<String>,
    source_file_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for StoredInvoice {
    fn from(row: InvoiceRow) -> Self {
        StoredInvoice {
            id: row.id,
            invoice: NormalizedInvoice {
                vendor_name: row.vendor_name,
                invoice_date: row.invoice_date,
                total_amount: row.total_amount,
                currency: row.currency,
                source_file_reference: row.source_file_reference,
            },
            vendor_name_normalized: row.vendor_name_normalized,
            created_at: row.created_at,
        }
    }
}

/// 插入一条发票记录 (表结构由外部迁移维护)
pub async fn insert_invoice(
    pool: &PgPool,
    stored: &StoredInvoice,
) -> Result<(), RepositoryError> {
    let start_time = std::time::Instant::now();

    let query = sqlx::query(
        r#"
        INSERT INTO invoices (
            id, vendor_name, vendor_name_normalized,
            invoice_date, total_amount, currency, source_file_reference, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#
    )
    .bind(stored.id)
    .bind(&stored.invoice.vendor_name)
    .bind(&stored.vendor_name_normalized)
    .bind(stored.invoice.invoice_date)
    .bind(stored.invoice.total_amount.clone())
    .bind(&stored.invoice.currency)
    .bind(&stored.invoice.source_file_reference)
    .bind(stored.created_at);

    match tokio::time::timeout(STATEMENT_TIMEOUT, query.execute(pool)).await {
        Ok(Ok(result)) => {
            tracing::info!(
                "✓ Invoice {} inserted, {} row(s), took {:?}",
                stored.id,
                result.rows_affected(),
                start_time.elapsed()
            );
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("✗ Invoice {} insert failed after {:?}: {:?}", stored.id, start_time.elapsed(), e);
            Err(e.into())
        }
        Err(_) => {
            tracing::error!("✗ Invoice {} insert timed out (>{:?})", stored.id, STATEMENT_TIMEOUT);
            Err(RepositoryError::Timeout)
        }
    }
}

/// 按 ID 查询发票
pub async fn get_invoice(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<StoredInvoice>, RepositoryError> {
    let query = sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, vendor_name, vendor_name_normalized,
               invoice_date, total_amount, currency, source_file_reference, created_at
        FROM invoices
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool);

    match tokio::time::timeout(STATEMENT_TIMEOUT, query).await {
        Ok(row) => Ok(row?.map(StoredInvoice::from)),
        Err(_) => Err(RepositoryError::Timeout),
    }
}
