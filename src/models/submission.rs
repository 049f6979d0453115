use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 调用方显式提供的发票字段, 每个字段都可能为空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceMetadata {
    pub vendor_name: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub total_amount: Option<BigDecimal>,
    /// 大写的 ISO 4217 代码
    pub currency: Option<String>,
}

/// 上传的原始文件 (未读取、未修改)
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: Option<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type,
            data,
        }
    }

    /// 原始文件名的扩展名 (小写, 不含点)
    ///
    /// 只接受 ASCII 字母数字且不超过 16 个字符, 否则视为没有扩展名。
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let (stem, ext) = base.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.len() > 16 {
            return None;
        }
        if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// 一次请求的录入内容: metadata 总是存在, 文件可选
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub metadata: InvoiceMetadata,
    pub file: Option<UploadedFile>,
}

impl Submission {
    pub fn metadata_only(metadata: InvoiceMetadata) -> Self {
        Self { metadata, file: None }
    }

    pub fn with_file(metadata: InvoiceMetadata, file: UploadedFile) -> Self {
        Self {
            metadata,
            file: Some(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> UploadedFile {
        UploadedFile::new(Some(name.to_string()), None, Vec::new())
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(named("Invoice.JSON").extension().as_deref(), Some("json"));
        assert_eq!(named("scan.2024.txt").extension().as_deref(), Some("txt"));
    }

    #[test]
    fn extension_rejects_odd_names() {
        assert_eq!(named("README").extension(), None);
        assert_eq!(named(".bashrc").extension(), None);
        assert_eq!(named("evil.j$on").extension(), None);
        assert_eq!(named("dir.d/file").extension(), None);
        assert_eq!(UploadedFile::new(None, None, Vec::new()).extension(), None);
    }
}
