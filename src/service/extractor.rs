//! 发票文件字段抽取
//!
//! 抽取按策略进行: 先尝试结构化 JSON, 再退回纯文本规则。抽取从不让请求失败,
//! 无法解释的内容只会得到空结果 (记为 `ExtractionStatus::Skipped`)。

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::text_rules::{parse_amount, parse_decimal, DatePatterns, TextStrategy};
use crate::config::ExtractionConfig;
use crate::error::ConfigError;
use crate::models::{ExtractionResult, ExtractionStatus, StrategyKind, UploadedFile};

const VENDOR_KEYS: &[&str] = &["vendor_name", "vendor", "supplier"];
const DATE_KEYS: &[&str] = &["invoice_date", "date"];
const TOTAL_KEYS: &[&str] = &["total_amount", "amount", "total"];

/// 根据声明的媒体类型 / 扩展名得到的内容提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaHint {
    Json,
    Text,
    Binary,
    Unknown,
}

impl MediaHint {
    /// `application/octet-stream` 或缺失时以扩展名为准
    pub fn detect(content_type: Option<&str>, extension: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let from_type = match essence.as_str() {
            "" | "application/octet-stream" => None,
            "application/json" | "text/json" => Some(Self::Json),
            t if t.ends_with("+json") => Some(Self::Json),
            t if t.starts_with("text/") => Some(Self::Text),
            t if t.starts_with("image/") || t.starts_with("audio/") || t.starts_with("video/") => {
                Some(Self::Binary)
            }
            "application/pdf" | "application/zip" | "application/gzip" => Some(Self::Binary),
            _ => None,
        };

        from_type.unwrap_or_else(|| match extension {
            Some("json") => Self::Json,
            Some("txt" | "text" | "log" | "csv" | "md") => Self::Text,
            Some(
                "pdf" | "png" | "jpg" | "jpeg" | "gif" | "tif" | "tiff" | "webp" | "zip" | "gz"
                | "docx" | "xlsx",
            ) => Self::Binary,
            _ => Self::Unknown,
        })
    }
}

/// 抽取策略: 给定文件内容, 返回能推导出的字段
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// 该策略是否处理此类内容
    fn accepts(&self, hint: MediaHint) -> bool {
        hint != MediaHint::Binary
    }

    /// 内容不能被该策略解释时返回 `None`
    fn extract(&self, content: &[u8]) -> Option<ExtractionResult>;
}

/// 结构化 JSON 策略: 顶层对象中直接读取字段 (支持常见别名)
#[derive(Debug, Clone)]
pub struct JsonStrategy {
    dates: DatePatterns,
}

impl JsonStrategy {
    pub fn new(dates: DatePatterns) -> Self {
        Self { dates }
    }

    fn date(&self, value: &Value) -> Option<NaiveDate> {
        let raw = value.as_str()?.trim();
        raw.get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .or_else(|| self.dates.find(raw))
    }
}

impl ExtractionStrategy for JsonStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Json
    }

    fn extract(&self, content: &[u8]) -> Option<ExtractionResult> {
        let content = content.strip_prefix(b"\xef\xbb\xbf").unwrap_or(content);
        let Value::Object(map) = serde_json::from_slice::<Value>(content).ok()? else {
            return None;
        };

        Some(ExtractionResult {
            vendor_name: coalesce(&map, VENDOR_KEYS)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            invoice_date: coalesce(&map, DATE_KEYS).and_then(|v| self.date(v)),
            total_amount: coalesce(&map, TOTAL_KEYS).and_then(json_amount),
        })
    }
}

/// 按顺序取第一个存在且非 null 的键
fn coalesce<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

fn json_amount(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// 发票抽取引擎: 依次尝试各策略, 第一个能解释内容的策略生效
pub struct InvoiceExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl InvoiceExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// 默认策略链: JSON → 纯文本
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let text = TextStrategy::from_config(config)?;
        let json = JsonStrategy::new(text.date_patterns().clone());
        Ok(Self::new(vec![Box::new(json), Box::new(text)]))
    }

    pub fn extract(&self, file: &UploadedFile) -> (ExtractionResult, ExtractionStatus) {
        let extension = file.extension();
        let hint = MediaHint::detect(file.content_type.as_deref(), extension.as_deref());
        self.extract_content(&file.data, hint)
    }

    pub fn extract_content(
        &self,
        content: &[u8],
        hint: MediaHint,
    ) -> (ExtractionResult, ExtractionStatus) {
        let mut accepted = false;

        for strategy in self.strategies.iter().filter(|s| s.accepts(hint)) {
            accepted = true;
            let Some(result) = strategy.extract(content) else {
                continue;
            };

            let kind = strategy.kind();
            let fields_found = result.fields_found();
            tracing::debug!(
                "Extraction strategy {:?} found {} field(s) ({} bytes, hint {:?})",
                kind,
                fields_found,
                content.len(),
                hint
            );

            let status = if fields_found == 0 {
                ExtractionStatus::Skipped {
                    reason: format!("no invoice fields found in {} content", kind_label(kind)),
                }
            } else {
                ExtractionStatus::Extracted {
                    strategy: kind,
                    fields_found,
                }
            };
            return (result, status);
        }

        let reason = if accepted {
            "content could not be interpreted".to_string()
        } else {
            format!("no extraction strategy for {:?} content", hint)
        };
        tracing::debug!("Extraction skipped: {}", reason);
        (ExtractionResult::empty(), ExtractionStatus::Skipped { reason })
    }
}

fn kind_label(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Json => "json",
        StrategyKind::Text => "text",
    }
}
