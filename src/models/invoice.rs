use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 从文件中抽取到的候选字段 (仅在单次请求内存在)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub vendor_name: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
}

impl ExtractionResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 已抽取到的字段数
    pub fn fields_found(&self) -> usize {
        [
            self.vendor_name.is_some(),
            self.invoice_date.is_some(),
            self.total_amount.is_some(),
        ]
        .iter()
        .filter(|found| **found)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields_found() == 0
    }
}

/// 流水线最终输出; `None` 即未知
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInvoice {
    pub vendor_name: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
    /// 只来自 metadata, 文件抽取不推导币种
    pub currency: Option<String>,
    pub source_file_reference: Option<String>,
}

/// 已持久化的发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInvoice {
    pub id: Uuid,
    #[serde(flatten)]
    pub invoice: NormalizedInvoice,
    pub vendor_name_normalized: Option<String>,
    pub created_at: DateTime<Utc>,
}
