use crate::config::AppConfig;
use crate::error::{ConfigError, Result};
use crate::models::{ExtractionResult, ExtractionStatus, IngestOutcome, Submission};
use crate::storage::InvoiceFileStorage;

use super::extractor::InvoiceExtractor;
use super::reconcile::reconcile;

/// 发票录入服务: 存储文件 → 抽取字段 → 与 metadata 合并
pub struct IngestService {
    storage: InvoiceFileStorage,
    extractor: InvoiceExtractor,
}

impl IngestService {
    pub fn new(storage: InvoiceFileStorage, extractor: InvoiceExtractor) -> Self {
        Self { storage, extractor }
    }

    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(
            InvoiceFileStorage::new(&config.storage.invoice_dir),
            InvoiceExtractor::from_config(&config.extraction)?,
        ))
    }

    pub fn storage(&self) -> &InvoiceFileStorage {
        &self.storage
    }

    /// 处理一次录入
    ///
    /// 只有文件存储失败会让请求失败; 抽取失败只会得到未知字段。
    pub async fn ingest(&self, submission: Submission) -> Result<IngestOutcome> {
        let Submission { metadata, file } = submission;

        let (reference, extracted, extraction) = match file {
            None => (None, ExtractionResult::empty(), ExtractionStatus::NoFile),
            Some(file) => {
                let reference = self.storage.save(&file).await?;
                let (extracted, status) = self.extractor.extract(&file);
                if let ExtractionStatus::Skipped { reason } = &status {
                    tracing::warn!("Extraction skipped for {}: {}", reference, reason);
                }
                (Some(reference), extracted, status)
            }
        };

        let (invoice, sources) = reconcile(metadata, extracted, reference);
        tracing::info!(
            "Invoice reconciled: vendor={:?} ({:?}), date={:?} ({:?}), total={:?} ({:?})",
            invoice.vendor_name,
            sources.vendor_name,
            invoice.invoice_date,
            sources.invoice_date,
            invoice.total_amount.as_ref().map(|t| t.to_string()),
            sources.total_amount
        );

        Ok(IngestOutcome {
            invoice,
            sources,
            extraction,
        })
    }
}
