use serde::Serialize;

use super::NormalizedInvoice;

/// 字段取值来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Metadata,
    Extracted,
    #[default]
    Unknown,
}

/// 三个字段各自的来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldSources {
    pub vendor_name: FieldSource,
    pub invoice_date: FieldSource,
    pub total_amount: FieldSource,
}

/// 抽取策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Json,
    Text,
}

/// 抽取结果状态; `Skipped` 只是记录, 不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionStatus {
    NoFile,
    Extracted {
        strategy: StrategyKind,
        fields_found: usize,
    },
    Skipped {
        reason: String,
    },
}

/// 单次录入的完整结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub invoice: NormalizedInvoice,
    pub sources: FieldSources,
    pub extraction: ExtractionStatus,
}
